// crates/fv_physics/src/models/drag.rs

//! 相间曳力模型
//!
//! 模型给出 `Cd·Re`，动量交换系数
//!
//! ```text
//! K = 0.75·Cd·Re·α_d·ρ_c·ν_c / d²
//! Re = |U_r|·d / ν_c
//! ```
//!
//! - `SchillerNaumann`：`Re < 1000` 时 `Cd·Re = 24(1 + 0.15·Re^0.687)`，否则 `0.44·Re`
//! - `constantCoefficient`：`Cd·Re = Cd·Re`

use super::coeffs_dict;
use crate::fvc;
use crate::field::VolField;
use crate::registry::{ModelCategory, ModelContext, ModelRegistry};
use fv_config::Dictionary;
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use glam::DVec3;
use std::fmt::Debug;

/// 曳力计算输入
#[derive(Debug, Clone, Copy)]
pub struct DragInputs<'a> {
    /// 分散相体积分数
    pub alpha_d: &'a VolField<f64>,
    /// 相对速度 `U_d - U_c`
    pub u_rel: &'a VolField<DVec3>,
    /// 颗粒直径
    pub d: &'a DimensionedScalar,
    /// 连续相密度
    pub rho_c: &'a DimensionedScalar,
    /// 连续相运动粘度
    pub nu_c: &'a DimensionedScalar,
}

impl DragInputs<'_> {
    /// 颗粒雷诺数
    pub fn reynolds(&self, mesh: &FvMesh) -> FvResult<VolField<f64>> {
        FvError::check_size(self.u_rel.name(), mesh.n_cells(), self.u_rel.len())?;
        self.d.dimensions.check_same(&DimensionSet::LENGTH, "颗粒直径")?;
        self.nu_c
            .dimensions
            .check_same(&DimensionSet::KINEMATIC_VISCOSITY, "连续相粘度")?;
        let scale = self.d.value / self.nu_c.value;
        let values = self.u_rel.internal().iter().map(|u| u.length() * scale).collect();
        fvc::extrapolated("Re", mesh, DimensionSet::DIMLESS, values)
    }
}

/// 曳力模型
pub trait DragModel: Send + Sync + Debug {
    /// 类型名
    fn type_name(&self) -> &'static str;

    /// 单值 `Cd·Re`
    fn cd_re_value(&self, re: f64) -> f64;

    /// 重新读取系数，返回是否有变化
    fn read(&mut self, dict: &Dictionary) -> FvResult<bool>;

    /// `Cd·Re` 场，`re` 必须无量纲
    fn cd_re(&self, mesh: &FvMesh, re: &VolField<f64>) -> FvResult<VolField<f64>> {
        re.dimensions().check_dimensionless("Cd·Re")?;
        let values = re.internal().iter().map(|&r| self.cd_re_value(r)).collect();
        fvc::extrapolated("CdRe", mesh, DimensionSet::DIMLESS, values)
    }

    /// 动量交换系数 `K`，量纲 `[ρ]/[T]`
    fn k(&self, mesh: &FvMesh, inputs: &DragInputs<'_>) -> FvResult<VolField<f64>> {
        let re = inputs.reynolds(mesh)?;
        let cd_re = self.cd_re(mesh, &re)?;
        FvError::check_size(inputs.alpha_d.name(), mesh.n_cells(), inputs.alpha_d.len())?;
        let factor = 0.75 * inputs.rho_c.value * inputs.nu_c.value / (inputs.d.value * inputs.d.value);
        let values = cd_re
            .internal()
            .iter()
            .zip(inputs.alpha_d.internal())
            .map(|(&c, &a)| factor * c * a.max(0.0))
            .collect();
        fvc::extrapolated(
            "K",
            mesh,
            inputs.rho_c.dimensions / DimensionSet::TIME,
            values,
        )
    }
}

/// 曳力模型类别
pub struct DragModels;

impl ModelCategory for DragModels {
    const NAME: &'static str = "dragModel";
    type Model = dyn DragModel;
}

pub(crate) fn register(registry: &mut ModelRegistry) -> FvResult<()> {
    registry.register::<DragModels>(SchillerNaumann::TYPE_NAME, SchillerNaumann::construct)?;
    registry.register::<DragModels>(ConstantCoefficient::TYPE_NAME, ConstantCoefficient::construct)?;
    Ok(())
}

/// Schiller-Naumann 球形颗粒曳力
#[derive(Debug, Clone, Copy, Default)]
pub struct SchillerNaumann;

impl SchillerNaumann {
    /// 注册名
    pub const TYPE_NAME: &'static str = "SchillerNaumann";

    /// 构造函数
    pub fn construct(dict: &Dictionary, _ctx: &ModelContext<'_>) -> FvResult<Box<dyn DragModel>> {
        dict.check_keys(&["type"])?;
        Ok(Box::new(Self))
    }
}

impl DragModel for SchillerNaumann {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn cd_re_value(&self, re: f64) -> f64 {
        if re < 1000.0 {
            24.0 * (1.0 + 0.15 * re.powf(0.687))
        } else {
            0.44 * re
        }
    }

    fn read(&mut self, _dict: &Dictionary) -> FvResult<bool> {
        Ok(false)
    }
}

/// 常曳力系数
#[derive(Debug, Clone, Copy)]
pub struct ConstantCoefficient {
    cd: f64,
}

impl ConstantCoefficient {
    /// 注册名
    pub const TYPE_NAME: &'static str = "constantCoefficient";

    fn read_cd(dict: &Dictionary) -> FvResult<f64> {
        let c = coeffs_dict(dict, Self::TYPE_NAME)?;
        c.check_keys(&["type", "Cd"])?;
        let cd: f64 = c.lookup("Cd")?;
        if !(cd >= 0.0 && cd.is_finite()) {
            return Err(FvError::invalid_config(format!("{}.Cd", c.scope()), cd, "必须为非负有限值"));
        }
        Ok(cd)
    }

    /// 构造函数
    pub fn construct(dict: &Dictionary, _ctx: &ModelContext<'_>) -> FvResult<Box<dyn DragModel>> {
        Ok(Box::new(Self { cd: Self::read_cd(dict)? }))
    }

    /// 曳力系数
    pub fn cd(&self) -> f64 {
        self.cd
    }
}

impl DragModel for ConstantCoefficient {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn cd_re_value(&self, re: f64) -> f64 {
        self.cd * re
    }

    fn read(&mut self, dict: &Dictionary) -> FvResult<bool> {
        let cd = Self::read_cd(dict)?;
        let changed = cd != self.cd;
        self.cd = cd;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::register_builtin_models;
    use fv_mesh::StructuredBlock;
    use serde_json::json;

    fn registry() -> ModelRegistry {
        let mut r = ModelRegistry::new();
        register_builtin_models(&mut r).unwrap();
        r.seal();
        r
    }

    #[test]
    fn test_schiller_naumann_branches() {
        let m = SchillerNaumann;
        assert!((m.cd_re_value(0.0) - 24.0).abs() < 1e-14);
        assert!((m.cd_re_value(2000.0) - 880.0).abs() < 1e-10);
        // Re = 1 时 Cd = 27.6
        assert!((m.cd_re_value(1.0) - 27.6).abs() < 1e-12);
    }

    #[test]
    fn test_constant_coefficient_requires_cd() {
        let mesh = StructuredBlock::line(2, 1.0).build().unwrap();
        let dict = Dictionary::from_value("drag", json!({ "type": "constantCoefficient" })).unwrap();
        let err = registry()
            .new_model_from_dict::<DragModels>(&dict, &ModelContext::new(&mesh))
            .err()
            .unwrap();
        assert!(matches!(err, FvError::MissingConfigurationKey { ref key, .. } if key == "Cd"));
    }

    #[test]
    fn test_exchange_coefficient() {
        let mesh = StructuredBlock::line(2, 1.0).build().unwrap();
        let dict = Dictionary::from_value("drag", json!({ "type": "constantCoefficient", "Cd": 0.5 })).unwrap();
        let model = registry()
            .new_model_from_dict::<DragModels>(&dict, &ModelContext::new(&mesh))
            .unwrap();
        let alpha = VolField::uniform("alpha.air", &mesh, DimensionSet::DIMLESS, 0.2).unwrap();
        let u_rel = VolField::uniform("Ur", &mesh, DimensionSet::VELOCITY, DVec3::new(0.0, 0.1, 0.0)).unwrap();
        let d = DimensionedScalar::new("d", DimensionSet::LENGTH, 1e-3);
        let rho = DimensionedScalar::new("rho", DimensionSet::DENSITY, 1000.0);
        let nu = DimensionedScalar::new("nu", DimensionSet::KINEMATIC_VISCOSITY, 1e-6);
        let inputs = DragInputs {
            alpha_d: &alpha,
            u_rel: &u_rel,
            d: &d,
            rho_c: &rho,
            nu_c: &nu,
        };
        let re = inputs.reynolds(&mesh).unwrap();
        assert!((re.value(0) - 100.0).abs() < 1e-9);
        let k = model.k(&mesh, &inputs).unwrap();
        // 0.75·(0.5·100)·0.2·1000·1e-6/1e-6 = 7500
        assert!((k.value(0) - 7500.0).abs() < 1e-6);
        assert_eq!(k.dimensions(), DimensionSet::DENSITY / DimensionSet::TIME);
    }
}
