// crates/fv_physics/src/case.rs

//! 算例
//!
//! [`Case`] 持有一个分区上求解所需的全部已校验对象：网格、离散格式、
//! 求解控制、模型注册表、场注册表和时间状态。
//!
//! 构造时完成注册阶段并封存注册表，之后只做查找。
//!
//! ```
//! use fv_config::{FvSchemes, FvSolution};
//! use fv_mesh::StructuredBlock;
//! use fv_physics::case::Case;
//! use fv_physics::control::TimeState;
//!
//! let mesh = StructuredBlock::line(4, 1.0).build().unwrap();
//! let case = Case::new(mesh, FvSchemes::default(), FvSolution::default(), TimeState::default()).unwrap();
//! assert!(case.registry().is_sealed());
//! ```

use crate::context::FvContext;
use crate::control::{SolutionControl, TimeState};
use crate::field::{FieldRegistry, FieldValue, Registrable, VolField};
use crate::models::register_builtin_models;
use crate::registry::{ModelCategory, ModelContext, ModelRegistry};
use fv_config::{DdtScheme, Dictionary, FvSchemes, FvSolution};
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use std::path::Path;
use std::sync::Arc;

/// 算例
#[derive(Debug)]
pub struct Case {
    mesh: FvMesh,
    schemes: FvSchemes,
    solution: FvSolution,
    ddt_scheme: DdtScheme,
    registry: Arc<ModelRegistry>,
    fields: FieldRegistry,
    time: TimeState,
}

impl Case {
    /// 注册内置模型、封存注册表并创建算例
    pub fn new(mesh: FvMesh, schemes: FvSchemes, solution: FvSolution, time: TimeState) -> FvResult<Self> {
        let mut registry = ModelRegistry::new();
        register_builtin_models(&mut registry)?;
        registry.seal();
        Self::with_registry(mesh, schemes, solution, time, Arc::new(registry))
    }

    /// 使用已封存的注册表（例如进程级注册表）
    pub fn with_registry(
        mesh: FvMesh,
        schemes: FvSchemes,
        solution: FvSolution,
        time: TimeState,
        registry: Arc<ModelRegistry>,
    ) -> FvResult<Self> {
        if !registry.is_sealed() {
            return Err(FvError::internal("算例只接受已封存的模型注册表"));
        }
        schemes.validate()?;
        solution.validate()?;
        let ddt_scheme = schemes.ddt_scheme()?;
        tracing::info!(
            cells = mesh.n_cells(),
            faces = mesh.n_faces(),
            patches = mesh.patches().len(),
            ddt = %ddt_scheme,
            "算例初始化"
        );
        Ok(Self {
            mesh,
            schemes,
            solution,
            ddt_scheme,
            registry,
            fields: FieldRegistry::new(),
            time,
        })
    }

    /// 由 `fvSchemes` / `fvSolution` 字典创建
    pub fn from_dicts(
        mesh: FvMesh,
        schemes: &Dictionary,
        solution: &Dictionary,
        time: TimeState,
    ) -> FvResult<Self> {
        Self::new(
            mesh,
            FvSchemes::from_dict(schemes)?,
            FvSolution::from_dict(solution)?,
            time,
        )
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 网格
    #[inline]
    pub fn mesh(&self) -> &FvMesh {
        &self.mesh
    }

    /// 离散格式
    #[inline]
    pub fn schemes(&self) -> &FvSchemes {
        &self.schemes
    }

    /// 求解控制配置
    #[inline]
    pub fn solution(&self) -> &FvSolution {
        &self.solution
    }

    /// 模型注册表
    #[inline]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// 场注册表
    #[inline]
    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    /// 可变场注册表
    #[inline]
    pub fn fields_mut(&mut self) -> &mut FieldRegistry {
        &mut self.fields
    }

    /// 时间状态
    #[inline]
    pub fn time(&self) -> &TimeState {
        &self.time
    }

    /// 修改时间步长
    pub fn set_delta_t(&mut self, delta_t: f64) -> FvResult<()> {
        self.time.set_delta_t(delta_t)
    }

    /// 离散上下文
    pub fn context(&self) -> FvContext<'_> {
        FvContext {
            mesh: &self.mesh,
            schemes: &self.schemes,
            time: &self.time,
            ddt_scheme: self.ddt_scheme,
        }
    }

    /// 离散上下文与可变场注册表同时借出
    pub fn context_and_fields(&mut self) -> (FvContext<'_>, &mut FieldRegistry) {
        (
            FvContext {
                mesh: &self.mesh,
                schemes: &self.schemes,
                time: &self.time,
                ddt_scheme: self.ddt_scheme,
            },
            &mut self.fields,
        )
    }

    /// 新的外迭代控制
    pub fn solution_control(&self) -> SolutionControl {
        SolutionControl::new(&self.solution)
    }

    // ========================================================================
    // 模型与场
    // ========================================================================

    /// 按字典 `type` 键构造模型
    pub fn new_model<C: ModelCategory>(&self, dict: &Dictionary) -> FvResult<Box<C::Model>> {
        self.registry
            .new_model_from_dict::<C>(dict, &ModelContext::new(&self.mesh))
    }

    /// 读取场文件并注册，返回场名
    pub fn read_vol_field<T>(&mut self, path: impl AsRef<Path>) -> FvResult<String>
    where
        T: FieldValue,
        VolField<T>: Registrable,
    {
        let path = path.as_ref();
        let field = VolField::<T>::read(path, &self.mesh, Some(&self.registry))?;
        let name = field.name().to_string();
        log::info!("读取场 {} ({})", name, path.display());
        self.fields.insert(field)?;
        Ok(name)
    }

    /// 把已注册的场写入目录，文件名为场名
    pub fn write_vol_field<T>(&self, name: &str, dir: impl AsRef<Path>) -> FvResult<()>
    where
        T: FieldValue,
        VolField<T>: Registrable,
    {
        let path = dir.as_ref().join(name);
        self.fields.get::<VolField<T>>(name)?.write(&self.mesh, &path)?;
        log::debug!("写出场 {} ({})", name, path.display());
        Ok(())
    }

    /// 推进时间：所有场保存旧时间层，然后时间前进一步
    pub fn advance_time(&mut self) {
        self.fields.store_old_times();
        self.time.advance();
        tracing::info!(
            time = self.time.value,
            delta_t = self.time.delta_t,
            step = self.time.index,
            "时间推进"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViscosityModels;
    use fv_foundation::DimensionSet;
    use fv_mesh::StructuredBlock;
    use serde_json::json;

    fn case() -> Case {
        let mesh = StructuredBlock::line(4, 1.0).build().unwrap();
        Case::new(mesh, FvSchemes::default(), FvSolution::default(), TimeState::new(0.0, 0.5).unwrap()).unwrap()
    }

    #[test]
    fn test_new_seals_registry() {
        let case = case();
        assert!(case.registry().is_sealed());
        let dict = Dictionary::from_value("transport", json!({ "type": "Newtonian", "nu": 0.01 })).unwrap();
        let model = case.new_model::<ViscosityModels>(&dict).unwrap();
        assert_eq!(model.nu().value(0), 0.01);
    }

    #[test]
    fn test_rejects_open_registry() {
        let mesh = StructuredBlock::line(2, 1.0).build().unwrap();
        let result = Case::with_registry(
            mesh,
            FvSchemes::default(),
            FvSolution::default(),
            TimeState::default(),
            Arc::new(ModelRegistry::new()),
        );
        assert!(matches!(result, Err(FvError::Internal { .. })));
    }

    #[test]
    fn test_advance_time_stores_old_fields() {
        let mut case = case();
        let t = VolField::uniform("T", case.mesh(), DimensionSet::TEMPERATURE, 1.0).unwrap();
        case.fields_mut().insert(t).unwrap();
        case.advance_time();
        assert_eq!(case.time().index, 1);
        assert!((case.time().value - 0.5).abs() < 1e-15);

        let (ctx, fields) = case.context_and_fields();
        assert_eq!(ctx.mesh.n_cells(), 4);
        let t = fields.get_mut::<VolField<f64>>("T").unwrap();
        t.internal_mut()[0] = 3.0;
        assert_eq!(t.old_time().unwrap()[0], 1.0);
    }

    #[test]
    fn test_write_then_read_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut case = case();
        let t = VolField::uniform("T", case.mesh(), DimensionSet::TEMPERATURE, 2.5).unwrap();
        case.fields_mut().insert(t).unwrap();
        case.write_vol_field::<f64>("T", dir.path()).unwrap();

        let mut other = self::case();
        let name = other.read_vol_field::<f64>(dir.path().join("T")).unwrap();
        assert_eq!(name, "T");
        let read = other.fields().get::<VolField<f64>>("T").unwrap();
        assert_eq!(read.internal(), &[2.5; 4]);
        assert!(case.read_vol_field::<f64>(dir.path().join("T")).is_err());
    }
}
