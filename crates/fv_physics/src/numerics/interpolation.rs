// crates/fv_physics/src/numerics/interpolation.rs

//! 面插值
//!
//! 内部面值 `φ_f = w·φ_P + (1 - w)·φ_N`，`w` 为 owner 权重。
//! 边界面直接取面片场的面值。
//!
//! 对流格式只决定权重：
//!
//! | 格式 | 内部面权重 |
//! |------|-----------|
//! | upwind | `pos0(φ)` |
//! | linear | 几何权重 |
//! | linearUpwind | `pos0(φ)`，另加显式修正 `(C_f - C_up)·(∇ψ)_up` |
//! | limitedLinear / vanLeer / Minmod / SuperBee | `λ·w + (1 - λ)·pos0(φ)` |
//!
//! 耦合面片上的限制型格式退化为迎风。

use super::gradient::green_gauss;
use super::limiter::{limited_weight, limiter_for, nvd_r, pos0};
use crate::field::{FieldValue, Gradient, SurfaceField, VolField};
use fv_config::ConvectionScheme;
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;

/// 几何线性权重
pub fn linear_weights(mesh: &FvMesh) -> SurfaceField<f64> {
    let w = mesh.weights();
    SurfaceField::from_fn("weights", mesh, DimensionSet::DIMLESS, |f| w[f])
}

/// 迎风权重，零通量按正向处理
pub fn upwind_weights(mesh: &FvMesh, flux: &SurfaceField<f64>) -> SurfaceField<f64> {
    let mut weights = flux.map("upwindWeights", DimensionSet::DIMLESS, pos0);
    // 非耦合面片的权重不参与计算，统一取 1
    for patch in mesh.patches().iter().filter(|p| !p.kind.is_coupled()) {
        weights.boundary_values_mut(patch.index).fill(1.0);
    }
    weights
}

/// 按权重插值
pub fn interpolate_with<T: FieldValue>(
    mesh: &FvMesh,
    field: &VolField<T>,
    weights: &SurfaceField<f64>,
) -> FvResult<SurfaceField<T>> {
    FvError::check_size(weights.name(), mesh.n_internal_faces(), weights.internal().len())?;
    let own = mesh.owner_addr();
    let nei = mesh.neighbour_addr();
    let psi = field.internal();

    let internal = weights
        .internal()
        .iter()
        .enumerate()
        .map(|(f, &w)| psi[own[f]] * w + psi[nei[f]] * (1.0 - w))
        .collect();
    let boundary = field.boundary().iter().map(|pf| pf.values().to_vec()).collect();

    SurfaceField::new(
        format!("interpolate({})", field.name()),
        mesh,
        field.dimensions(),
        internal,
        boundary,
    )
}

/// 线性插值
pub fn interpolate<T: FieldValue>(mesh: &FvMesh, field: &VolField<T>) -> FvResult<SurfaceField<T>> {
    interpolate_with(mesh, field, &linear_weights(mesh))
}

/// 对流格式的面权重
///
/// `grad` 为 `ψ` 的单元梯度，限制型格式需要；传 None 时现场计算。
pub fn convection_weights<T: Gradient>(
    mesh: &FvMesh,
    scheme: ConvectionScheme,
    flux: &SurfaceField<f64>,
    psi: &VolField<T>,
    grad: Option<&[T::Grad]>,
) -> FvResult<SurfaceField<f64>> {
    FvError::check_size(flux.name(), mesh.n_internal_faces(), flux.internal().len())?;
    match scheme {
        ConvectionScheme::Upwind | ConvectionScheme::LinearUpwind => Ok(upwind_weights(mesh, flux)),
        ConvectionScheme::Linear => Ok(linear_weights(mesh)),
        limited => {
            let limiter = limiter_for(limited).ok_or_else(|| {
                FvError::internal(format!("格式 {limited} 没有对应的限制器"))
            })?;
            let owned;
            let grad = match grad {
                Some(g) => g,
                None => {
                    owned = green_gauss(mesh, psi)?;
                    owned.internal()
                }
            };
            FvError::check_size(&format!("grad({})", psi.name()), mesh.n_cells(), grad.len())?;

            let own = mesh.owner_addr();
            let nei = mesh.neighbour_addr();
            let w_lin = mesh.weights();
            let delta = mesh.delta();
            let values = psi.internal();

            let mut weights = upwind_weights(mesh, flux).named("limitedWeights");
            for (f, w) in weights.internal_mut().iter_mut().enumerate() {
                let (p, n) = (own[f], nei[f]);
                let phi = flux.internal()[f];
                let dgrad_p = T::directional(delta[f], &grad[p]);
                let dgrad_n = T::directional(delta[f], &grad[n]);
                // 矢量取各分量中最强的限制
                let lambda = (0..T::N_COMPONENTS)
                    .map(|d| {
                        let r = nvd_r(
                            phi,
                            values[p].component(d),
                            values[n].component(d),
                            dgrad_p.component(d),
                            dgrad_n.component(d),
                        );
                        limiter.limiter(r)
                    })
                    .fold(f64::INFINITY, f64::min);
                *w = limited_weight(lambda, w_lin[f], phi);
            }
            Ok(weights)
        }
    }
}

/// linearUpwind 的显式面修正 `(C_f - C_up)·(∇ψ)_up`
///
/// 非耦合边界面修正为零；耦合面片只在 owner 侧为迎风时修正。
pub fn linear_upwind_correction<T: Gradient>(
    mesh: &FvMesh,
    flux: &SurfaceField<f64>,
    psi: &VolField<T>,
    grad: &[T::Grad],
) -> FvResult<SurfaceField<T>> {
    FvError::check_size(&format!("grad({})", psi.name()), mesh.n_cells(), grad.len())?;
    let own = mesh.owner_addr();
    let nei = mesh.neighbour_addr();
    let cf = mesh.cf();
    let c = mesh.c();

    let internal = flux
        .internal()
        .iter()
        .enumerate()
        .map(|(f, &phi)| {
            let up = if phi >= 0.0 { own[f] } else { nei[f] };
            T::directional(cf[f] - c[up], &grad[up])
        })
        .collect();

    let boundary = mesh
        .patches()
        .iter()
        .map(|patch| {
            let phi_b = flux.boundary_values(patch.index);
            patch
                .faces()
                .enumerate()
                .map(|(i, face)| {
                    if patch.kind.is_coupled() && phi_b[i] >= 0.0 {
                        let o = own[face];
                        T::directional(cf[face] - c[o], &grad[o])
                    } else {
                        T::ZERO
                    }
                })
                .collect()
        })
        .collect();

    SurfaceField::new(
        format!("linearUpwindCorrection({})", psi.name()),
        mesh,
        psi.dimensions(),
        internal,
        boundary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;
    use glam::DVec3;

    #[test]
    fn test_linear_interpolation_graded() {
        let mesh = StructuredBlock::line(4, 1.0).graded_x(3.0).build().unwrap();
        let values: Vec<f64> = mesh.c().iter().map(|c| 1.0 + 2.0 * c.x).collect();
        let t = VolField::from_values("T", &mesh, DimensionSet::TEMPERATURE, values).unwrap();
        let tf = interpolate(&mesh, &t).unwrap();
        for (f, v) in tf.internal().iter().enumerate() {
            let expected = 1.0 + 2.0 * mesh.cf()[f].x;
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_upwind_weights_zero_flux_is_owner() {
        let mesh = StructuredBlock::line(3, 1.0).build().unwrap();
        let phi = SurfaceField::from_fn("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, |f| {
            [0.0, -1.0][f.min(1)]
        });
        let w = upwind_weights(&mesh, &phi);
        assert_eq!(w.internal(), &[1.0, 0.0]);
    }

    #[test]
    fn test_weights_sum_to_one_for_all_schemes() {
        let mesh = StructuredBlock::line(6, 1.0).graded_x(1.5).build().unwrap();
        let values: Vec<f64> = mesh.c().iter().map(|c| (6.0 * c.x).sin()).collect();
        let psi = VolField::from_values("psi", &mesh, DimensionSet::DIMLESS, values).unwrap();
        let phi = SurfaceField::uniform("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, 1.0);
        for scheme in [
            ConvectionScheme::Upwind,
            ConvectionScheme::Linear,
            ConvectionScheme::LimitedLinear(1.0),
            ConvectionScheme::VanLeer,
            ConvectionScheme::Minmod,
            ConvectionScheme::SuperBee,
        ] {
            let w = convection_weights(&mesh, scheme, &phi, &psi, None).unwrap();
            for (f, &wf) in w.internal().iter().enumerate() {
                let lo = mesh.weights()[f].min(1.0);
                assert!(wf >= lo - 1e-12 && wf <= 1.0 + 1e-12, "{scheme} face {f}: {wf}");
            }
        }
    }

    #[test]
    fn test_linear_upwind_correction_vector() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let u = VolField::uniform("U", &mesh, DimensionSet::VELOCITY, DVec3::X).unwrap();
        let phi = SurfaceField::uniform("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, 1.0);
        let grad = vec![glam::DMat3::from_cols(DVec3::X, DVec3::ZERO, DVec3::ZERO); 3];
        let corr = linear_upwind_correction(&mesh, &phi, &u, &grad).unwrap();
        // 迎风单元中心到面心 0.5，∂U_x/∂x = 1
        for v in corr.internal() {
            assert!((v.x - 0.5).abs() < 1e-12);
        }
    }
}
