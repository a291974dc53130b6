// crates/fv_physics/src/fvm/convection.rs

//! 隐式对流项 `∇·(φψ)`
//!
//! 面值 `ψ_f = w·ψ_P + (1 - w)·ψ_N`，`w` 由插值格式给出：
//!
//! ```text
//! lower = -w·φ
//! upper = lower + φ
//! diag  = -Σ 非对角（按列）
//! ```
//!
//! 边界面：`internal_coeffs = φ_b·vic`，`boundary_coeffs = -φ_b·vbc`。
//! linearUpwind 的高阶修正显式进入源项；`bounded` 格式再减去 `(∇·φ)ψ`。

use crate::boundary::PatchGeometry;
use crate::context::FvContext;
use crate::field::{Gradient, SurfaceField, VolField};
use crate::matrix::FvMatrix;
use crate::numerics::{convection_weights, green_gauss, linear_upwind_correction};
use fv_config::{ConvectionScheme, DivScheme};
use fv_foundation::error::{FvError, FvResult};

/// 散度项名，形如 `div(phi,U)`
pub fn div_term_name(flux: &SurfaceField<f64>, psi_name: &str) -> String {
    format!("div({},{})", flux.name(), psi_name)
}

/// `∇·(φψ)`，格式从 `divSchemes` 读取
pub fn div<T: Gradient>(
    ctx: &FvContext<'_>,
    flux: &SurfaceField<f64>,
    psi: &VolField<T>,
) -> FvResult<FvMatrix<T>> {
    let scheme = ctx.div_scheme(&div_term_name(flux, psi.name()))?;
    div_with(ctx, flux, psi, scheme)
}

/// 指定格式的 `∇·(φψ)`
pub fn div_with<T: Gradient>(
    ctx: &FvContext<'_>,
    flux: &SurfaceField<f64>,
    psi: &VolField<T>,
    scheme: DivScheme,
) -> FvResult<FvMatrix<T>> {
    let mesh = ctx.mesh;
    FvError::check_size(flux.name(), mesh.n_internal_faces(), flux.internal().len())?;

    let grad = if matches!(scheme.interpolation, ConvectionScheme::LinearUpwind) || scheme.interpolation.is_limited() {
        Some(green_gauss(mesh, psi)?)
    } else {
        None
    };
    let weights = convection_weights(
        mesh,
        scheme.interpolation,
        flux,
        psi,
        grad.as_ref().map(|g| g.internal()),
    )?;

    let mut m = FvMatrix::new(psi, mesh, flux.dimensions() * psi.dimensions());
    {
        let (upper, lower) = m.ldu_mut().upper_lower_mut();
        for (f, (&phi, &w)) in flux.internal().iter().zip(weights.internal()).enumerate() {
            lower[f] = -w * phi;
            upper[f] = lower[f] + phi;
        }
    }
    m.ldu_mut().neg_sum_diag();

    for pf in psi.boundary().iter().filter(|pf| pf.contributes()) {
        let p = pf.patch_index();
        let geo = PatchGeometry::new(mesh, p)?;
        let phi_b = flux.boundary_values(p);
        let w_b = weights.boundary_values(p);
        let vic = pf.value_internal_coeffs(&geo, w_b);
        let vbc = pf.value_boundary_coeffs(&geo, w_b);
        for (i, ic) in m.internal_coeffs_mut(p).iter_mut().enumerate() {
            *ic = phi_b[i] * vic[i];
        }
        for (i, bc) in m.boundary_coeffs_mut(p).iter_mut().enumerate() {
            *bc = vbc[i] * -phi_b[i];
        }
    }

    if let (ConvectionScheme::LinearUpwind, Some(grad)) = (scheme.interpolation, grad.as_ref()) {
        let corr = linear_upwind_correction(mesh, flux, psi, grad.internal())?;
        let face_flux = corr.zip_with(flux, "phiCorr", flux.dimensions() * psi.dimensions(), |c, phi| {
            c * phi
        })?;
        subtract_face_sum(ctx, &mut m, &face_flux);
    }

    if scheme.bounded {
        let own = mesh.owner_addr();
        let nei = mesh.neighbour_addr();
        let diag = m.ldu_mut().diag_mut();
        for (f, &phi) in flux.internal().iter().enumerate() {
            diag[own[f]] -= phi;
            diag[nei[f]] += phi;
        }
        for patch in mesh.patches().iter().filter(|p| !p.is_empty_kind()) {
            for (i, face) in patch.faces().enumerate() {
                diag[own[face]] -= flux.boundary_values(patch.index)[i];
            }
        }
    }
    Ok(m)
}

/// 显式面通量的净流出量移入源项：`source -= Σ_f ±F_f`
pub(crate) fn subtract_face_sum<T: Gradient>(ctx: &FvContext<'_>, m: &mut FvMatrix<T>, face_flux: &SurfaceField<T>) {
    let mesh = ctx.mesh;
    let own = mesh.owner_addr();
    let nei = mesh.neighbour_addr();
    let source = m.source_mut();
    for (f, &v) in face_flux.internal().iter().enumerate() {
        source[own[f]] = source[own[f]] - v;
        source[nei[f]] = source[nei[f]] + v;
    }
    for patch in mesh.patches().iter().filter(|p| !p.is_empty_kind()) {
        for (i, face) in patch.faces().enumerate() {
            let o = own[face];
            source[o] = source[o] - face_flux.boundary_values(patch.index)[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeState;
    use fv_config::FvSchemes;
    use fv_foundation::DimensionSet;
    use fv_mesh::StructuredBlock;

    fn residual(m: &FvMatrix<f64>, x: &[f64]) -> Vec<f64> {
        let mut ax = vec![0.0; x.len()];
        m.ldu().amul(x, &mut ax);
        let total = m.total_diag();
        m.total_source()
            .iter()
            .enumerate()
            .map(|(c, b)| ax[c] + (total[c] - m.diag()[c]) * x[c] - b)
            .collect()
    }

    #[test]
    fn test_upwind_coefficients() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let mut psi = VolField::uniform("T", &mesh, DimensionSet::DIMLESS, 0.0).unwrap();
        psi.fix_value(&mesh, "left", 1.0).unwrap();
        let sf = mesh.sf();
        let phi = SurfaceField::from_fn("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, |f| 2.0 * sf[f].x);
        let m = div(&ctx, &phi, &psi).unwrap();

        assert_eq!(m.ldu().lower().unwrap(), &[-2.0, -2.0]);
        assert_eq!(m.ldu().upper().unwrap(), &[0.0, 0.0]);
        assert_eq!(m.diag(), &[2.0, 2.0, 0.0]);
        // 入口固定值：隐式系数为零，显式系数 φ_b·1，φ_b = -2
        let left = mesh.patch_index("left").unwrap();
        assert_eq!(m.internal_coeffs(left), &[0.0]);
        assert_eq!(m.boundary_coeffs(left), &[2.0]);
        // 出口零梯度
        let right = mesh.patch_index("right").unwrap();
        assert_eq!(m.internal_coeffs(right), &[2.0]);
    }

    #[test]
    fn test_uniform_field_with_divergence_free_flux() {
        let mesh = StructuredBlock::uniform([3, 2, 2], [1.0, 1.0, 1.0])
            .graded_x(1.7)
            .distorted(0.15)
            .build()
            .unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let u = glam::DVec3::new(1.0, 0.3, -0.2);
        let sf = mesh.sf();
        let phi = SurfaceField::from_fn("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, |f| sf[f].dot(u));
        let psi = VolField::uniform("T", &mesh, DimensionSet::DIMLESS, 3.0).unwrap();

        for scheme in ["Gauss upwind", "Gauss linear", "Gauss linearUpwind", "Gauss vanLeer", "bounded Gauss limitedLinear 1"] {
            let m = div_with(&ctx, &phi, &psi, scheme.parse().unwrap()).unwrap();
            for r in residual(&m, psi.internal()) {
                assert!(r.abs() < 1e-12, "{scheme}: {r}");
            }
        }
    }
}
