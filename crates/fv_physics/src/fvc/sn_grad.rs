// crates/fv_physics/src/fvc/sn_grad.rs

//! 面法向梯度与显式拉普拉斯
//!
//! ```text
//! snGrad_f = δ_f·(ψ_N - ψ_P) + k_f·(∇ψ)_f
//! ```
//!
//! `δ_f` 为非正交修正后的距离倒数，`k_f` 为非正交修正矢量。
//! `limited ψ` 把修正量限制在 `ψ/(1-ψ)` 倍未修正梯度以内。

use super::div::surface_integrate;
use crate::context::FvContext;
use crate::boundary::PatchGeometry;
use crate::field::{Gradient, SurfaceField, VolField};
use crate::fvm::{laplacian_term_name, Diffusivity};
use crate::numerics::{green_gauss, interpolate};
use fv_config::SnGradScheme;
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::FvResult;
use fv_foundation::float::SMALL;
use fv_mesh::FvMesh;

/// 非正交修正 `k_f·(∇ψ)_f`
///
/// 非耦合边界面为零，耦合面片取梯度场的面片值。
pub(crate) fn non_orth_correction<T: Gradient>(
    mesh: &FvMesh,
    psi: &VolField<T>,
    scheme: SnGradScheme,
) -> FvResult<SurfaceField<T>> {
    let grad_f = interpolate(mesh, &green_gauss(mesh, psi)?)?;
    let k = mesh.non_orth_correction_vectors();
    let mut corr = SurfaceField::from_fn(
        format!("snGradCorr({})", psi.name()),
        mesh,
        psi.dimensions() / DimensionSet::LENGTH,
        |_| T::ZERO,
    );
    for (f, c) in corr.internal_mut().iter_mut().enumerate() {
        *c = T::directional(k[f], &grad_f.internal()[f]);
    }
    for patch in mesh.patches().iter().filter(|p| p.kind.is_coupled()) {
        let g = grad_f.boundary_values(patch.index);
        for (i, face) in patch.faces().enumerate() {
            corr.boundary_values_mut(patch.index)[i] = T::directional(k[face], &g[i]);
        }
    }

    if let SnGradScheme::Limited(limit) = scheme {
        let own = mesh.owner_addr();
        let nei = mesh.neighbour_addr();
        let delta = mesh.non_orth_delta_coeffs();
        let values = psi.internal();
        for (f, c) in corr.internal_mut().iter_mut().enumerate() {
            let uncorrected = (values[nei[f]] - values[own[f]]) * delta[f];
            let ratio = limit * uncorrected.mag() / ((1.0 - limit) * c.mag() + SMALL);
            *c = *c * ratio.min(1.0);
        }
    }
    Ok(corr)
}

/// 指定格式的面法向梯度
pub fn sn_grad_with<T: Gradient>(
    mesh: &FvMesh,
    psi: &VolField<T>,
    scheme: SnGradScheme,
) -> FvResult<SurfaceField<T>> {
    let own = mesh.owner_addr();
    let nei = mesh.neighbour_addr();
    let delta = mesh.non_orth_delta_coeffs();
    let values = psi.internal();

    let mut result = SurfaceField::from_fn(
        format!("snGrad({})", psi.name()),
        mesh,
        psi.dimensions() / DimensionSet::LENGTH,
        |_| T::ZERO,
    );
    for (f, g) in result.internal_mut().iter_mut().enumerate() {
        *g = (values[nei[f]] - values[own[f]]) * delta[f];
    }
    for pf in psi.boundary() {
        let geo = PatchGeometry::new(mesh, pf.patch_index())?;
        result
            .boundary_values_mut(pf.patch_index())
            .copy_from_slice(&pf.sn_grad(&geo, values));
    }

    if scheme.corrected() && mesh.is_non_orthogonal() {
        let corr = non_orth_correction(mesh, psi, scheme)?;
        result = result.try_add(&corr)?.named(format!("snGrad({})", psi.name()));
    }
    Ok(result)
}

/// 面法向梯度，格式从 `snGradSchemes` 读取
pub fn sn_grad<T: Gradient>(ctx: &FvContext<'_>, psi: &VolField<T>) -> FvResult<SurfaceField<T>> {
    let scheme = ctx.sn_grad_scheme(&format!("snGrad({})", psi.name()))?;
    sn_grad_with(ctx.mesh, psi, scheme)
}

/// 显式 `∇·(Γ∇ψ)`，格式从 `laplacianSchemes` 读取
pub fn laplacian<'g, T: Gradient>(
    ctx: &FvContext<'_>,
    gamma: impl Into<Diffusivity<'g>>,
    psi: &VolField<T>,
) -> FvResult<VolField<T>> {
    let mesh = ctx.mesh;
    let gamma = gamma.into();
    let name = laplacian_term_name(gamma.name(), psi.name());
    let scheme = ctx.laplacian_scheme(&name)?;
    let mag_sf = mesh.mag_sf();
    let gamma_mag_sf = gamma
        .face_values(mesh)?
        .mul_scalar_field(&SurfaceField::from_fn("magSf", mesh, DimensionSet::AREA, |f| mag_sf[f]))?;
    let face_flux = sn_grad_with(mesh, psi, scheme)?.mul_scalar_field(&gamma_mag_sf)?;
    Ok(surface_integrate(mesh, &face_flux)?.named(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeState;
    use crate::fvm;
    use fv_config::FvSchemes;
    use fv_foundation::dimension::DimensionedScalar;
    use fv_mesh::StructuredBlock;

    fn patch_mean(field: &SurfaceField<f64>, patch: usize) -> f64 {
        let values = field.boundary_values(patch);
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn test_sn_grad_linear_field() {
        let mesh = StructuredBlock::line(4, 1.0).graded_x(2.0).build().unwrap();
        let values = mesh.c().iter().map(|c| 3.0 * c.x).collect();
        let mut t = VolField::from_values("T", &mesh, DimensionSet::TEMPERATURE, values).unwrap();
        t.fix_value(&mesh, "left", 0.0).unwrap();
        t.fix_value(&mesh, "right", 3.0).unwrap();
        let g = sn_grad_with(&mesh, &t, SnGradScheme::Corrected).unwrap();
        for &v in g.internal() {
            assert!((v - 3.0).abs() < 1e-12);
        }
        // 边界面法向朝外
        let left = mesh.patch_index("left").unwrap();
        let right = mesh.patch_index("right").unwrap();
        assert!((patch_mean(&g, left) + 3.0).abs() < 1e-12);
        assert!((patch_mean(&g, right) - 3.0).abs() < 1e-12);
        assert_eq!(g.dimensions(), DimensionSet::TEMPERATURE / DimensionSet::LENGTH);
    }

    #[test]
    fn test_limited_zero_matches_uncorrected() {
        let mesh = StructuredBlock::plane(4, 4, 1.0, 1.0).distorted(0.2).build().unwrap();
        let values = mesh.c().iter().map(|c| c.x * c.y + c.x).collect();
        let t = VolField::from_values("T", &mesh, DimensionSet::DIMLESS, values).unwrap();
        let a = sn_grad_with(&mesh, &t, SnGradScheme::Uncorrected).unwrap();
        let b = sn_grad_with(&mesh, &t, SnGradScheme::Limited(0.0)).unwrap();
        let c = sn_grad_with(&mesh, &t, SnGradScheme::Corrected).unwrap();
        assert_eq!(a.internal(), b.internal());
        assert!(a.internal().iter().zip(c.internal()).any(|(x, y)| (x - y).abs() > 1e-8));
    }

    #[test]
    fn test_explicit_matches_implicit_laplacian() {
        let mesh = StructuredBlock::plane(4, 3, 1.0, 1.0).distorted(0.15).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let values = mesh.c().iter().map(|c| c.x * c.x - c.y).collect();
        let mut t = VolField::from_values("T", &mesh, DimensionSet::DIMLESS, values).unwrap();
        t.fix_value(&mesh, "left", 1.0).unwrap();
        let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 0.7);

        let explicit = laplacian(&ctx, &dt, &t).unwrap();
        let m = fvm::laplacian(&ctx, &dt, &t).unwrap();
        let mut ax = vec![0.0; mesh.n_cells()];
        m.ldu().amul(t.internal(), &mut ax);
        let total_diag = m.total_diag();
        let total_source = m.total_source();
        for c in 0..mesh.n_cells() {
            let implicit = (ax[c] + (total_diag[c] - m.diag()[c]) * t.value(c) - total_source[c]) / mesh.v()[c];
            assert!((implicit - explicit.value(c)).abs() < 1e-10, "{c}");
        }
        assert_eq!(explicit.name(), "laplacian(DT,T)");
    }
}
