// crates/fv_physics/src/fvc/mod.rs

//! 显式离散算子
//!
//! 与 [`fvm`](crate::fvm) 对应，但直接由当前场值计算结果场，不组装矩阵。
//! 结果场的边界条件为 calculated，面值取相邻单元值（零梯度外推）。

pub mod ddt;
pub mod div;
pub mod sn_grad;

pub use ddt::ddt;
pub use div::{div, div_flux, div_tensor, div_vector, surface_integrate, surface_sum};
pub use sn_grad::{laplacian, sn_grad, sn_grad_with};

pub(crate) use sn_grad::non_orth_correction;

use crate::field::{FieldValue, Gradient, SurfaceField, VolField};
use crate::numerics::green_gauss;
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use glam::DVec3;

/// 由单元值构造结果场，面片面值取相邻单元值
pub(crate) fn extrapolated<T: FieldValue>(
    name: impl Into<String>,
    mesh: &FvMesh,
    dimensions: DimensionSet,
    internal: Vec<T>,
) -> FvResult<VolField<T>> {
    let boundary = (0..mesh.patches().len())
        .map(|p| mesh.patch_face_cells(p).iter().map(|&c| internal[c]).collect())
        .collect();
    VolField::calculated(name, mesh, dimensions, internal, boundary)
}

/// Green-Gauss 梯度 `∇ψ`
pub fn grad<T: Gradient>(mesh: &FvMesh, psi: &VolField<T>) -> FvResult<VolField<T::Grad>> {
    green_gauss(mesh, psi)
}

/// 线性插值到面
pub fn interpolate<T: FieldValue>(mesh: &FvMesh, psi: &VolField<T>) -> FvResult<SurfaceField<T>> {
    crate::numerics::interpolate(mesh, psi)
}

/// 体积通量 `S_f·U_f`
///
/// 内部面取线性插值，边界面取面片值，空面片通量为零。
pub fn flux(mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<SurfaceField<f64>> {
    let u_f = interpolate(mesh, u)?;
    let sf = mesh.sf();
    let mut phi = SurfaceField::from_fn(
        format!("flux({})", u.name()),
        mesh,
        u.dimensions() * DimensionSet::AREA,
        |_| 0.0,
    );
    for (f, v) in phi.internal_mut().iter_mut().enumerate() {
        *v = sf[f].dot(u_f.internal()[f]);
    }
    for patch in mesh.patches().iter().filter(|p| !p.is_empty_kind()) {
        let u_b = u_f.boundary_values(patch.index);
        for (i, face) in patch.faces().enumerate() {
            phi.boundary_values_mut(patch.index)[i] = sf[face].dot(u_b[i]);
        }
    }
    Ok(phi)
}

/// 体积积分 `Σ ψ_P·V_P`，量纲为 `[ψ]·[体积]`
pub fn domain_integrate<T: FieldValue>(mesh: &FvMesh, psi: &VolField<T>) -> FvResult<T> {
    FvError::check_size(psi.name(), mesh.n_cells(), psi.len())?;
    Ok(psi
        .internal()
        .iter()
        .zip(mesh.v())
        .fold(T::ZERO, |acc, (&value, &v)| acc + value * v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;

    #[test]
    fn test_flux_of_uniform_velocity() {
        let mesh = StructuredBlock::plane(2, 2, 1.0, 2.0).build().unwrap();
        let u = VolField::uniform("U", &mesh, DimensionSet::VELOCITY, DVec3::new(2.0, 0.0, 0.0)).unwrap();
        let phi = flux(&mesh, &u).unwrap();
        assert_eq!(phi.dimensions(), DimensionSet::VOLUMETRIC_FLUX);
        let sf = mesh.sf();
        for (f, &v) in phi.internal().iter().enumerate() {
            assert!((v - 2.0 * sf[f].x).abs() < 1e-14);
        }
        let back = mesh.patch_index("back").unwrap();
        assert!(phi.boundary_values(back).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_domain_integrate() {
        let mesh = StructuredBlock::line(4, 2.0).build().unwrap();
        let t = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 3.0).unwrap();
        let total = domain_integrate(&mesh, &t).unwrap();
        assert!((total - 3.0 * mesh.total_volume()).abs() < 1e-14);
    }
}
