// crates/fv_physics/src/fvc/div.rs

//! 显式散度与面积分
//!
//! ```text
//! surfaceIntegrate(F)_P = (1/V_P) Σ_f ±F_f
//! ```
//!
//! owner 侧取正号，neighbour 侧取负号；空面片不参与。

use super::extrapolated;
use crate::context::FvContext;
use crate::field::{FieldValue, Gradient, SurfaceField, VolField};
use crate::fvm::div_term_name;
use crate::numerics::{convection_weights, green_gauss, interpolate, interpolate_with, linear_upwind_correction};
use fv_config::ConvectionScheme;
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use glam::{DMat3, DVec3};

/// 面值按单元求和（不除体积）
fn face_sum<T: FieldValue>(mesh: &FvMesh, face_values: &SurfaceField<T>) -> FvResult<Vec<T>> {
    FvError::check_size(face_values.name(), mesh.n_internal_faces(), face_values.internal().len())?;
    let own = mesh.owner_addr();
    let nei = mesh.neighbour_addr();
    let mut sum = vec![T::ZERO; mesh.n_cells()];
    for (f, &v) in face_values.internal().iter().enumerate() {
        sum[own[f]] = sum[own[f]] + v;
        sum[nei[f]] = sum[nei[f]] - v;
    }
    for patch in mesh.patches().iter().filter(|p| !p.is_empty_kind()) {
        let values = face_values.boundary_values(patch.index);
        for (i, face) in patch.faces().enumerate() {
            let o = own[face];
            sum[o] = sum[o] + values[i];
        }
    }
    Ok(sum)
}

/// `Σ_f ±F_f`
pub fn surface_sum<T: FieldValue>(mesh: &FvMesh, face_values: &SurfaceField<T>) -> FvResult<VolField<T>> {
    let sum = face_sum(mesh, face_values)?;
    extrapolated(
        format!("surfaceSum({})", face_values.name()),
        mesh,
        face_values.dimensions(),
        sum,
    )
}

/// `(1/V) Σ_f ±F_f`
pub fn surface_integrate<T: FieldValue>(mesh: &FvMesh, face_values: &SurfaceField<T>) -> FvResult<VolField<T>> {
    let mut sum = face_sum(mesh, face_values)?;
    for (s, &v) in sum.iter_mut().zip(mesh.v()) {
        *s = *s * (1.0 / v);
    }
    extrapolated(
        format!("surfaceIntegrate({})", face_values.name()),
        mesh,
        face_values.dimensions() / DimensionSet::VOLUME,
        sum,
    )
}

/// 通量的散度 `∇·φ`
pub fn div(mesh: &FvMesh, flux: &SurfaceField<f64>) -> FvResult<VolField<f64>> {
    Ok(surface_integrate(mesh, flux)?.named(format!("div({})", flux.name())))
}

/// `∇·(φψ)`，面值按 `divSchemes` 中的对流格式插值
pub fn div_flux<T: Gradient>(
    ctx: &FvContext<'_>,
    flux: &SurfaceField<f64>,
    psi: &VolField<T>,
) -> FvResult<VolField<T>> {
    let mesh = ctx.mesh;
    let name = div_term_name(flux, psi.name());
    let scheme = ctx.div_scheme(&name)?;
    let grad = match scheme.interpolation {
        ConvectionScheme::Upwind | ConvectionScheme::Linear => None,
        _ => Some(green_gauss(mesh, psi)?),
    };
    let weights = convection_weights(mesh, scheme.interpolation, flux, psi, grad.as_ref().map(|g| g.internal()))?;
    let mut psi_f = interpolate_with(mesh, psi, &weights)?;
    if let (ConvectionScheme::LinearUpwind, Some(grad)) = (scheme.interpolation, grad.as_ref()) {
        psi_f = psi_f.try_add(&linear_upwind_correction(mesh, flux, psi, grad.internal())?)?;
    }
    let face_flux = psi_f.mul_scalar_field(flux)?;
    let mut result = surface_integrate(mesh, &face_flux)?;
    if scheme.bounded {
        let div_phi = div(mesh, flux)?;
        for (r, (&d, &p)) in result
            .internal_mut()
            .iter_mut()
            .zip(div_phi.internal().iter().zip(psi.internal()))
        {
            *r = *r - p * d;
        }
    }
    Ok(result.named(name))
}

/// 矢量场散度 `∇·U`
pub fn div_vector(mesh: &FvMesh, u: &VolField<DVec3>) -> FvResult<VolField<f64>> {
    let u_f = interpolate(mesh, u)?;
    let sf = mesh.sf();
    let mut flux = SurfaceField::from_fn("SfU", mesh, u.dimensions() * DimensionSet::AREA, |_| 0.0);
    for (f, v) in flux.internal_mut().iter_mut().enumerate() {
        *v = sf[f].dot(u_f.internal()[f]);
    }
    for patch in mesh.patches() {
        for (i, face) in patch.faces().enumerate() {
            flux.boundary_values_mut(patch.index)[i] = sf[face].dot(u_f.boundary_values(patch.index)[i]);
        }
    }
    Ok(surface_integrate(mesh, &flux)?.named(format!("div({})", u.name())))
}

/// 张量场散度 `(∇·T)_j = Σ_i ∂T_ij/∂x_i`
pub fn div_tensor(mesh: &FvMesh, t: &VolField<DMat3>) -> FvResult<VolField<DVec3>> {
    let t_f = interpolate(mesh, t)?;
    let sf = mesh.sf();
    let mut flux = SurfaceField::from_fn("SfT", mesh, t.dimensions() * DimensionSet::AREA, |_| DVec3::ZERO);
    for (f, v) in flux.internal_mut().iter_mut().enumerate() {
        *v = DVec3::directional(sf[f], &t_f.internal()[f]);
    }
    for patch in mesh.patches() {
        for (i, face) in patch.faces().enumerate() {
            flux.boundary_values_mut(patch.index)[i] =
                DVec3::directional(sf[face], &t_f.boundary_values(patch.index)[i]);
        }
    }
    Ok(surface_integrate(mesh, &flux)?.named(format!("div({})", t.name())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeState;
    use fv_config::FvSchemes;
    use fv_mesh::StructuredBlock;

    #[test]
    fn test_div_of_linear_velocity() {
        let mesh = StructuredBlock::plane(4, 4, 1.0, 1.0).distorted(0.1).build().unwrap();
        // U = (x, 2y, 0)，∇·U = 3
        let values = mesh.c().iter().map(|c| DVec3::new(c.x, 2.0 * c.y, 0.0)).collect();
        let mut u = VolField::from_values("U", &mesh, DimensionSet::VELOCITY, values).unwrap();
        for patch in ["left", "right", "bottom", "top"] {
            let p = mesh.patch_index(patch).unwrap();
            let cf: Vec<DVec3> = mesh.cf()[mesh.patches()[p].faces()].to_vec();
            let pf = u.boundary_field_mut(p).unwrap();
            for (v, c) in pf.values_mut().iter_mut().zip(&cf) {
                *v = DVec3::new(c.x, 2.0 * c.y, 0.0);
            }
        }
        let d = div_vector(&mesh, &u).unwrap();
        assert_eq!(d.name(), "div(U)");
        assert_eq!(d.dimensions(), DimensionSet::TIME.inv());
        // 畸变网格上线性插值不精确，只检查平均值
        let mean = d.weighted_average(&mesh);
        assert!((mean - 3.0).abs() < 1e-10, "{mean}");
    }

    #[test]
    fn test_surface_integrate_conserves() {
        let mesh = StructuredBlock::uniform([3, 2, 2], [1.0, 1.0, 1.0]).graded_x(2.0).build().unwrap();
        let phi = SurfaceField::from_fn("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, |f| (f as f64).sin());
        let sum = surface_sum(&mesh, &phi).unwrap();
        // 内部面正负抵消，总和等于边界通量之和
        let boundary: f64 = mesh
            .patches()
            .iter()
            .filter(|p| !p.is_empty_kind())
            .flat_map(|p| phi.boundary_values(p.index))
            .sum();
        assert!((sum.sum() - boundary).abs() < 1e-12);
        let integ = surface_integrate(&mesh, &phi).unwrap();
        assert_eq!(integ.dimensions(), DimensionSet::VOLUMETRIC_FLUX / DimensionSet::VOLUME);
    }

    #[test]
    fn test_div_flux_uniform_field() {
        let mesh = StructuredBlock::plane(3, 3, 1.0, 1.0).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let sf = mesh.sf();
        let phi = SurfaceField::from_fn("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, |f| sf[f].x);
        let psi = VolField::uniform("T", &mesh, DimensionSet::DIMLESS, 2.0).unwrap();
        let d = div_flux(&ctx, &phi, &psi).unwrap();
        assert_eq!(d.name(), "div(phi,T)");
        for &v in d.internal() {
            assert!(v.abs() < 1e-12);
        }
    }
}
