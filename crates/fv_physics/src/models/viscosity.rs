// crates/fv_physics/src/models/viscosity.rs

//! 运动粘度模型
//!
//! - `Newtonian`：常数 `ν`
//! - `powerLaw`：`ν = k·γ̇^(n-1)`，限制在 `[νMin, νMax]`
//! - `BirdCarreau`：`ν = ν∞ + (ν₀ - ν∞)·(1 + (k·γ̇)²)^((n-1)/2)`
//!
//! `γ̇` 为应变率 [`strain_rate`](super::strain_rate)。

use super::{coeffs_dict, strain_rate, uniform_calculated};
use crate::field::VolField;
use crate::registry::{ModelCategory, ModelContext, ModelRegistry};
use fv_config::Dictionary;
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use fv_foundation::float::VSMALL;
use fv_mesh::FvMesh;
use glam::DVec3;
use std::fmt::Debug;

/// 运动粘度模型
pub trait ViscosityModel: Send + Sync + Debug {
    /// 类型名
    fn type_name(&self) -> &'static str;

    /// 当前粘度场
    fn nu(&self) -> &VolField<f64>;

    /// 由速度场更新粘度
    fn correct(&mut self, mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<()>;

    /// 重新读取系数，返回是否有变化
    fn read(&mut self, dict: &Dictionary) -> FvResult<bool>;
}

/// 粘度模型类别
pub struct ViscosityModels;

impl ModelCategory for ViscosityModels {
    const NAME: &'static str = "viscosityModel";
    type Model = dyn ViscosityModel;
}

pub(crate) fn register(registry: &mut ModelRegistry) -> FvResult<()> {
    registry.register::<ViscosityModels>(Newtonian::TYPE_NAME, Newtonian::construct)?;
    registry.register::<ViscosityModels>(PowerLaw::TYPE_NAME, PowerLaw::construct)?;
    registry.register::<ViscosityModels>(BirdCarreau::TYPE_NAME, BirdCarreau::construct)?;
    Ok(())
}

fn positive(dict: &Dictionary, value: &DimensionedScalar) -> FvResult<()> {
    if value.value < 0.0 || !value.value.is_finite() {
        return Err(FvError::invalid_config(
            format!("{}.{}", dict.scope(), value.name),
            value.value,
            "必须为非负有限值",
        ));
    }
    Ok(())
}

// ============================================================
// Newtonian
// ============================================================

/// 常粘度
#[derive(Debug, Clone)]
pub struct Newtonian {
    nu0: DimensionedScalar,
    nu: VolField<f64>,
}

impl Newtonian {
    /// 注册名
    pub const TYPE_NAME: &'static str = "Newtonian";

    fn read_nu(dict: &Dictionary) -> FvResult<DimensionedScalar> {
        let coeffs = coeffs_dict(dict, Self::TYPE_NAME)?;
        coeffs.check_keys(&["type", "nu"])?;
        let nu = coeffs.lookup_dimensioned("nu", DimensionSet::KINEMATIC_VISCOSITY)?;
        positive(&coeffs, &nu)?;
        Ok(nu)
    }

    /// 构造函数
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn ViscosityModel>> {
        let nu0 = Self::read_nu(dict)?;
        let nu = uniform_calculated("nu", ctx.mesh(), DimensionSet::KINEMATIC_VISCOSITY, nu0.value)?;
        Ok(Box::new(Self { nu0, nu }))
    }
}

impl ViscosityModel for Newtonian {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn nu(&self) -> &VolField<f64> {
        &self.nu
    }

    fn correct(&mut self, _mesh: &FvMesh, _u: &VolField<DVec3>) -> FvResult<()> {
        Ok(())
    }

    fn read(&mut self, dict: &Dictionary) -> FvResult<bool> {
        let nu0 = Self::read_nu(dict)?;
        if nu0.value == self.nu0.value {
            return Ok(false);
        }
        self.nu.internal_mut().fill(nu0.value);
        for pf in 0..self.nu.boundary().len() {
            self.nu.boundary_field_mut(pf)?.values_mut().fill(nu0.value);
        }
        self.nu0 = nu0;
        Ok(true)
    }
}

// ============================================================
// powerLaw
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct PowerLawCoeffs {
    k: f64,
    n: f64,
    nu_min: f64,
    nu_max: f64,
}

/// 幂律流体
#[derive(Debug, Clone)]
pub struct PowerLaw {
    coeffs: PowerLawCoeffs,
    nu: VolField<f64>,
}

impl PowerLaw {
    /// 注册名
    pub const TYPE_NAME: &'static str = "powerLaw";

    fn read_coeffs(dict: &Dictionary) -> FvResult<PowerLawCoeffs> {
        let c = coeffs_dict(dict, Self::TYPE_NAME)?;
        c.check_keys(&["type", "k", "n", "nuMin", "nuMax"])?;
        let n: f64 = c.lookup("n")?;
        // k 的量纲随 n 变化：[ν]·[T]^(n-1)
        let k = c.lookup_dimensioned(
            "k",
            DimensionSet::KINEMATIC_VISCOSITY * DimensionSet::TIME.pow(n - 1.0),
        )?;
        let nu_min = c.lookup_dimensioned("nuMin", DimensionSet::KINEMATIC_VISCOSITY)?;
        let nu_max = c.lookup_dimensioned("nuMax", DimensionSet::KINEMATIC_VISCOSITY)?;
        for v in [&k, &nu_min, &nu_max] {
            positive(&c, v)?;
        }
        if nu_min.value > nu_max.value {
            return Err(FvError::invalid_config(
                format!("{}.nuMin", c.scope()),
                nu_min.value,
                format!("不能大于 nuMax = {}", nu_max.value),
            ));
        }
        Ok(PowerLawCoeffs {
            k: k.value,
            n,
            nu_min: nu_min.value,
            nu_max: nu_max.value,
        })
    }

    /// 构造函数
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn ViscosityModel>> {
        let coeffs = Self::read_coeffs(dict)?;
        // 静止流场的初值
        let nu = uniform_calculated("nu", ctx.mesh(), DimensionSet::KINEMATIC_VISCOSITY, coeffs.nu_max)?;
        Ok(Box::new(Self { coeffs, nu }))
    }

    /// 给定应变率下的粘度
    pub fn nu_at(&self, strain_rate: f64) -> f64 {
        let c = &self.coeffs;
        (c.k * strain_rate.max(VSMALL).powf(c.n - 1.0)).clamp(c.nu_min, c.nu_max)
    }
}

impl ViscosityModel for PowerLaw {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn nu(&self) -> &VolField<f64> {
        &self.nu
    }

    fn correct(&mut self, mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<()> {
        let sr = strain_rate(mesh, u)?;
        let values = sr.internal().iter().map(|&s| self.nu_at(s)).collect();
        self.nu = crate::fvc::extrapolated("nu", mesh, DimensionSet::KINEMATIC_VISCOSITY, values)?;
        Ok(())
    }

    fn read(&mut self, dict: &Dictionary) -> FvResult<bool> {
        let coeffs = Self::read_coeffs(dict)?;
        let changed = coeffs != self.coeffs;
        self.coeffs = coeffs;
        Ok(changed)
    }
}

// ============================================================
// BirdCarreau
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct BirdCarreauCoeffs {
    nu0: f64,
    nu_inf: f64,
    k: f64,
    n: f64,
}

/// Bird-Carreau 剪切稀化模型
#[derive(Debug, Clone)]
pub struct BirdCarreau {
    coeffs: BirdCarreauCoeffs,
    nu: VolField<f64>,
}

impl BirdCarreau {
    /// 注册名
    pub const TYPE_NAME: &'static str = "BirdCarreau";

    fn read_coeffs(dict: &Dictionary) -> FvResult<BirdCarreauCoeffs> {
        let c = coeffs_dict(dict, Self::TYPE_NAME)?;
        c.check_keys(&["type", "nu0", "nuInf", "k", "n"])?;
        let nu0 = c.lookup_dimensioned("nu0", DimensionSet::KINEMATIC_VISCOSITY)?;
        let nu_inf = c.lookup_dimensioned("nuInf", DimensionSet::KINEMATIC_VISCOSITY)?;
        let k = c.lookup_dimensioned("k", DimensionSet::TIME)?;
        let n: f64 = c.lookup("n")?;
        for v in [&nu0, &nu_inf, &k] {
            positive(&c, v)?;
        }
        Ok(BirdCarreauCoeffs {
            nu0: nu0.value,
            nu_inf: nu_inf.value,
            k: k.value,
            n,
        })
    }

    /// 构造函数
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn ViscosityModel>> {
        let coeffs = Self::read_coeffs(dict)?;
        let nu = uniform_calculated("nu", ctx.mesh(), DimensionSet::KINEMATIC_VISCOSITY, coeffs.nu0)?;
        Ok(Box::new(Self { coeffs, nu }))
    }

    /// 给定应变率下的粘度
    pub fn nu_at(&self, strain_rate: f64) -> f64 {
        let c = &self.coeffs;
        c.nu_inf + (c.nu0 - c.nu_inf) * (1.0 + (c.k * strain_rate).powi(2)).powf((c.n - 1.0) / 2.0)
    }
}

impl ViscosityModel for BirdCarreau {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn nu(&self) -> &VolField<f64> {
        &self.nu
    }

    fn correct(&mut self, mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<()> {
        let sr = strain_rate(mesh, u)?;
        let values = sr.internal().iter().map(|&s| self.nu_at(s)).collect();
        self.nu = crate::fvc::extrapolated("nu", mesh, DimensionSet::KINEMATIC_VISCOSITY, values)?;
        Ok(())
    }

    fn read(&mut self, dict: &Dictionary) -> FvResult<bool> {
        let coeffs = Self::read_coeffs(dict)?;
        let changed = coeffs != self.coeffs;
        self.coeffs = coeffs;
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

    fn shear(mesh: &FvMesh, rate: f64) -> VolField<DVec3> {
        let values = mesh.c().iter().map(|c| DVec3::new(rate * c.y, 0.0, 0.0)).collect();
        let mut u = VolField::from_values("U", mesh, DimensionSet::VELOCITY, values).unwrap();
        for patch in ["bottom", "top", "left", "right"] {
            let p = mesh.patch_index(patch).unwrap();
            let cf: Vec<DVec3> = mesh.cf()[mesh.patches()[p].faces()].to_vec();
            for (v, c) in u.boundary_field_mut(p).unwrap().values_mut().iter_mut().zip(&cf) {
                *v = DVec3::new(rate * c.y, 0.0, 0.0);
            }
        }
        u
    }

    #[test]
    fn test_newtonian_read_reports_change() {
        let mesh = StructuredBlock::line(3, 1.0).build().unwrap();
        let dict = Dictionary::from_value("transport", json!({ "type": "Newtonian", "nu": 1e-5 })).unwrap();
        let mut model = registry()
            .new_model_from_dict::<ViscosityModels>(&dict, &ModelContext::new(&mesh))
            .unwrap();
        assert_eq!(model.nu().value(0), 1e-5);
        assert_eq!(model.nu().dimensions(), DimensionSet::KINEMATIC_VISCOSITY);
        assert!(!model.read(&dict).unwrap());

        let changed = Dictionary::from_value("transport", json!({ "type": "Newtonian", "nu": 2e-5 })).unwrap();
        assert!(model.read(&changed).unwrap());
        assert!(model.nu().internal().iter().all(|&v| v == 2e-5));
    }

    #[test]
    fn test_newtonian_requires_nu() {
        let mesh = StructuredBlock::line(3, 1.0).build().unwrap();
        let dict = Dictionary::from_value("transport", json!({ "type": "Newtonian" })).unwrap();
        let err = registry()
            .new_model_from_dict::<ViscosityModels>(&dict, &ModelContext::new(&mesh))
            .err()
            .unwrap();
        assert!(matches!(err, FvError::MissingConfigurationKey { ref key, .. } if key == "nu"));
    }

    #[test]
    fn test_power_law_clips() {
        let mesh = StructuredBlock::plane(4, 4, 1.0, 1.0).build().unwrap();
        let dict = Dictionary::from_value(
            "transport",
            json!({
                "type": "powerLaw",
                "powerLawCoeffs": { "k": 1e-3, "n": 0.5, "nuMin": 1e-5, "nuMax": 1e-2 }
            }),
        )
        .unwrap();
        let mut model = registry()
            .new_model_from_dict::<ViscosityModels>(&dict, &ModelContext::new(&mesh))
            .unwrap();
        // γ̇ = 4：1e-3·4^-0.5 = 5e-4
        model.correct(&mesh, &shear(&mesh, 4.0)).unwrap();
        for &nu in model.nu().internal() {
            assert!((nu - 5e-4).abs() < 1e-12, "{nu}");
        }
        // 静止流场取上限
        model.correct(&mesh, &shear(&mesh, 0.0)).unwrap();
        assert!(model.nu().internal().iter().all(|&nu| nu == 1e-2));
    }

    #[test]
    fn test_bird_carreau_limits() {
        let mesh = StructuredBlock::plane(2, 2, 1.0, 1.0).build().unwrap();
        let dict = Dictionary::from_value(
            "transport",
            json!({ "type": "BirdCarreau", "nu0": 1e-3, "nuInf": 1e-5, "k": 1.0, "n": 0.5 }),
        )
        .unwrap();
        let mut model = registry()
            .new_model_from_dict::<ViscosityModels>(&dict, &ModelContext::new(&mesh))
            .unwrap();
        model.correct(&mesh, &shear(&mesh, 0.0)).unwrap();
        assert!(model.nu().internal().iter().all(|&nu| (nu - 1e-3).abs() < 1e-15));
        model.correct(&mesh, &shear(&mesh, 1e8)).unwrap();
        assert!(model.nu().internal().iter().all(|&nu| nu < 2e-5));
        let unchanged = model.read(&dict).unwrap();
        assert!(!unchanged);
    }
}
