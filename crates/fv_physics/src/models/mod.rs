// crates/fv_physics/src/models/mod.rs

//! 运行时可选模型
//!
//! | 类别 | 能力 trait | 内置实现 |
//! |------|-----------|---------|
//! | `viscosityModel` | [`ViscosityModel`] | Newtonian, powerLaw, BirdCarreau |
//! | `turbulenceModel` | [`TurbulenceModel`] | laminar, Smagorinsky |
//! | `dragModel` | [`DragModel`] | SchillerNaumann, constantCoefficient |
//!
//! 每个模型在算例内构造一次，`read` 热更新系数并报告是否有变化。
//! 系数可以直接写在模型字典里，也可以放在 `<type>Coeffs` 子字典中。

pub mod drag;
pub mod turbulence;
pub mod viscosity;

pub use drag::{ConstantCoefficient, DragInputs, DragModel, DragModels, SchillerNaumann};
pub use turbulence::{Laminar, Smagorinsky, TurbulenceModel, TurbulenceModels};
pub use viscosity::{BirdCarreau, Newtonian, PowerLaw, ViscosityModel, ViscosityModels};

use crate::boundary::register_boundary_conditions;
use crate::fvc;
use crate::field::{value::tensor, FieldValue, VolField};
use crate::registry::ModelRegistry;
use fv_config::Dictionary;
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::FvResult;
use fv_mesh::FvMesh;
use glam::{DMat3, DVec3};

/// 注册全部内置边界条件与模型
///
/// 在算例启动阶段显式调用一次，之后封存注册表。
pub fn register_builtin_models(registry: &mut ModelRegistry) -> FvResult<()> {
    register_boundary_conditions::<f64>(registry)?;
    register_boundary_conditions::<DVec3>(registry)?;
    register_boundary_conditions::<DMat3>(registry)?;
    viscosity::register(registry)?;
    turbulence::register(registry)?;
    drag::register(registry)?;
    log::debug!("内置模型注册完成: {registry}");
    Ok(())
}

/// 系数字典：优先 `<type>Coeffs` 子字典，否则模型字典本身
pub(crate) fn coeffs_dict(dict: &Dictionary, type_name: &str) -> FvResult<Dictionary> {
    let key = format!("{type_name}Coeffs");
    if dict.found(&key) {
        dict.sub_dict(&key)
    } else {
        Ok(dict.clone())
    }
}

/// 应变率 `√2·|symm(∇U)|`
pub fn strain_rate(mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<VolField<f64>> {
    let grad_u = fvc::grad(mesh, u)?;
    let values = grad_u
        .internal()
        .iter()
        .map(|g| std::f64::consts::SQRT_2 * tensor::symm(g).mag())
        .collect();
    fvc::extrapolated("strainRate", mesh, DimensionSet::TIME.inv(), values)
}

/// 均匀的 calculated 标量场
pub(crate) fn uniform_calculated(
    name: &str,
    mesh: &FvMesh,
    dimensions: DimensionSet,
    value: f64,
) -> FvResult<VolField<f64>> {
    fvc::extrapolated(name, mesh, dimensions, vec![value; mesh.n_cells()])
}
