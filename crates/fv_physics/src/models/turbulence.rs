// crates/fv_physics/src/models/turbulence.rs

//! 湍流模型
//!
//! 有效粘度 `ν_eff = ν + ν_t`，动量方程中的有效应力项
//!
//! ```text
//! divDevReff(U) = -∇·(ν_eff ∇U) - ∇·(ν_eff dev2((∇U)ᵀ))
//! ```
//!
//! 第一项隐式，第二项显式。
//!
//! - `laminar`：`ν_t = 0`
//! - `Smagorinsky`：`ν_t = (C_s·Δ)²·|S|`，`Δ = V^(1/3)`，`|S| = √(2 S:S)`

use super::{coeffs_dict, strain_rate, uniform_calculated};
use crate::context::FvContext;
use crate::field::VolField;
use crate::fvc;
use crate::fvm;
use crate::matrix::FvMatrix;
use crate::registry::{ModelCategory, ModelContext, ModelRegistry};
use fv_config::Dictionary;
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use glam::DVec3;
use std::fmt::Debug;

/// 湍流模型
pub trait TurbulenceModel: Send + Sync + Debug {
    /// 类型名
    fn type_name(&self) -> &'static str;

    /// 湍流粘度
    fn nu_t(&self) -> &VolField<f64>;

    /// 由速度场更新湍流粘度
    fn correct(&mut self, mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<()>;

    /// 重新读取系数，返回是否有变化
    fn read(&mut self, dict: &Dictionary) -> FvResult<bool>;

    /// 有效粘度 `ν + ν_t`
    fn nu_eff(&self, nu: &VolField<f64>) -> FvResult<VolField<f64>> {
        Ok(nu.try_add(self.nu_t())?.named("nuEff"))
    }

    /// 动量方程的有效应力项
    fn div_dev_reff(
        &self,
        ctx: &FvContext<'_>,
        nu: &VolField<f64>,
        u: &VolField<DVec3>,
    ) -> FvResult<FvMatrix<DVec3>> {
        let mesh = ctx.mesh;
        let nu_eff = self.nu_eff(nu)?;
        let mut m = -fvm::laplacian(ctx, &nu_eff, u)?;
        let stress = fvc::grad(mesh, u)?.transpose().dev2().mul_scalar_field(&nu_eff)?;
        m.sub_explicit_source(mesh, &fvc::div_tensor(mesh, &stress)?)?;
        Ok(m)
    }
}

/// 湍流模型类别
pub struct TurbulenceModels;

impl ModelCategory for TurbulenceModels {
    const NAME: &'static str = "turbulenceModel";
    type Model = dyn TurbulenceModel;
}

pub(crate) fn register(registry: &mut ModelRegistry) -> FvResult<()> {
    registry.register::<TurbulenceModels>(Laminar::TYPE_NAME, Laminar::construct)?;
    registry.register::<TurbulenceModels>(Smagorinsky::TYPE_NAME, Smagorinsky::construct)?;
    Ok(())
}

// ============================================================
// laminar
// ============================================================

/// 层流：无湍流粘度
#[derive(Debug, Clone)]
pub struct Laminar {
    nu_t: VolField<f64>,
}

impl Laminar {
    /// 注册名
    pub const TYPE_NAME: &'static str = "laminar";

    /// 构造函数
    pub fn construct(_dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn TurbulenceModel>> {
        Ok(Box::new(Self {
            nu_t: uniform_calculated("nut", ctx.mesh(), DimensionSet::KINEMATIC_VISCOSITY, 0.0)?,
        }))
    }
}

impl TurbulenceModel for Laminar {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn nu_t(&self) -> &VolField<f64> {
        &self.nu_t
    }

    fn correct(&mut self, _mesh: &FvMesh, _u: &VolField<DVec3>) -> FvResult<()> {
        Ok(())
    }

    fn read(&mut self, _dict: &Dictionary) -> FvResult<bool> {
        Ok(false)
    }
}

// ============================================================
// Smagorinsky
// ============================================================

/// Smagorinsky 亚格子模型
#[derive(Debug, Clone)]
pub struct Smagorinsky {
    cs: f64,
    delta: Vec<f64>,
    nu_t: VolField<f64>,
}

impl Smagorinsky {
    /// 注册名
    pub const TYPE_NAME: &'static str = "Smagorinsky";

    /// `C_s` 默认值
    pub const DEFAULT_CS: f64 = 0.17;

    fn read_cs(dict: &Dictionary) -> FvResult<f64> {
        let c = coeffs_dict(dict, Self::TYPE_NAME)?;
        c.check_keys(&["type", "Cs", "delta"])?;
        let cs: f64 = c.lookup_or_default("Cs", Self::DEFAULT_CS)?;
        if !(cs > 0.0 && cs.is_finite()) {
            return Err(FvError::invalid_config(format!("{}.Cs", c.scope()), cs, "必须为正"));
        }
        Ok(cs)
    }

    /// 构造函数
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn TurbulenceModel>> {
        let mesh = ctx.mesh();
        Ok(Box::new(Self {
            cs: Self::read_cs(dict)?,
            delta: mesh.v().iter().map(|v| v.cbrt()).collect(),
            nu_t: uniform_calculated("nut", mesh, DimensionSet::KINEMATIC_VISCOSITY, 0.0)?,
        }))
    }

    /// 滤波尺度
    pub fn delta(&self) -> &[f64] {
        &self.delta
    }
}

impl TurbulenceModel for Smagorinsky {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn nu_t(&self) -> &VolField<f64> {
        &self.nu_t
    }

    fn correct(&mut self, mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<()> {
        FvError::check_size("delta", mesh.n_cells(), self.delta.len())?;
        let sr = strain_rate(mesh, u)?;
        let values = sr
            .internal()
            .iter()
            .zip(&self.delta)
            .map(|(&s, &d)| (self.cs * d).powi(2) * s)
            .collect();
        self.nu_t = fvc::extrapolated("nut", mesh, DimensionSet::KINEMATIC_VISCOSITY, values)?;
        Ok(())
    }

    fn read(&mut self, dict: &Dictionary) -> FvResult<bool> {
        let cs = Self::read_cs(dict)?;
        let changed = cs != self.cs;
        self.cs = cs;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeState;
    use crate::models::register_builtin_models;
    use fv_config::FvSchemes;
    use fv_mesh::StructuredBlock;
    use serde_json::json;

    fn construct(dict: serde_json::Value, mesh: &FvMesh) -> Box<dyn TurbulenceModel> {
        let mut r = ModelRegistry::new();
        register_builtin_models(&mut r).unwrap();
        r.seal();
        let dict = Dictionary::from_value("turbulence", dict).unwrap();
        r.new_model_from_dict::<TurbulenceModels>(&dict, &ModelContext::new(mesh)).unwrap()
    }

    #[test]
    fn test_smagorinsky_viscosity() {
        let mesh = StructuredBlock::uniform([2, 2, 2], [1.0, 1.0, 1.0]).build().unwrap();
        let mut model = construct(json!({ "type": "Smagorinsky", "Cs": 0.2 }), &mesh);
        let values = mesh.c().iter().map(|c| DVec3::new(3.0 * c.y, 0.0, 0.0)).collect();
        let mut u = VolField::from_values("U", &mesh, DimensionSet::VELOCITY, values).unwrap();
        for (p, patch) in mesh.patches().iter().enumerate() {
            let cf: Vec<DVec3> = mesh.cf()[patch.faces()].to_vec();
            for (v, c) in u.boundary_field_mut(p).unwrap().values_mut().iter_mut().zip(&cf) {
                *v = DVec3::new(3.0 * c.y, 0.0, 0.0);
            }
        }
        model.correct(&mesh, &u).unwrap();
        // Δ = 0.5，(0.2·0.5)²·3 = 0.03
        for &nut in model.nu_t().internal() {
            assert!((nut - 0.03).abs() < 1e-12, "{nut}");
        }
        assert!(model.read(&Dictionary::from_value("t", json!({ "Cs": 0.1 })).unwrap()).unwrap());
    }

    #[test]
    fn test_div_dev_reff_uniform_velocity() {
        let mesh = StructuredBlock::plane(3, 3, 1.0, 1.0).distorted(0.1).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let model = construct(json!({ "type": "laminar" }), &mesh);
        let nu = uniform_calculated("nu", &mesh, DimensionSet::KINEMATIC_VISCOSITY, 1e-3).unwrap();
        let u = VolField::uniform("U", &mesh, DimensionSet::VELOCITY, DVec3::new(1.0, 2.0, 0.0)).unwrap();

        let m = model.div_dev_reff(&ctx, &nu, &u).unwrap();
        assert_eq!(
            m.dimensions(),
            DimensionSet::KINEMATIC_VISCOSITY * DimensionSet::VELOCITY * DimensionSet::LENGTH
        );
        let mut ax = vec![0.0; mesh.n_cells()];
        let source = m.total_source();
        let total = m.total_diag();
        for d in 0..2 {
            let x: Vec<f64> = u.internal().iter().map(|v| v[d]).collect();
            m.ldu().amul(&x, &mut ax);
            for c in 0..mesh.n_cells() {
                let r = ax[c] + (total[c] - m.diag()[c]) * x[c] - source[c][d];
                assert!(r.abs() < 1e-12, "{d} {c} {r}");
            }
        }
        assert_eq!(model.nu_eff(&nu).unwrap().value(0), 1e-3);
    }
}
