// crates/fv_physics/src/fvm/laplacian.rs

//! 隐式拉普拉斯项 `∇·(Γ∇ψ)`
//!
//! ```text
//! upper = Γ_f·|S_f|·δ_f        δ_f 为非正交修正后的距离倒数
//! diag  = -Σ upper
//! ```
//!
//! 边界面：`internal_coeffs = Γ_b|S_b|·gic`，`boundary_coeffs = -Γ_b|S_b|·gbc`。
//! `corrected` 格式把非正交修正 `Γ_f|S_f|·k_f·(∇ψ)_f` 显式放入源项。

use super::convection::subtract_face_sum;
use crate::boundary::PatchGeometry;
use crate::context::FvContext;
use crate::fvc::non_orth_correction;
use crate::field::{Gradient, SurfaceField, VolField};
use crate::matrix::FvMatrix;
use crate::numerics::interpolate;
use fv_config::SnGradScheme;
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::FvResult;
use fv_mesh::FvMesh;

/// 扩散系数
#[derive(Debug, Clone, Copy)]
pub enum Diffusivity<'a> {
    /// 常数
    Uniform(&'a DimensionedScalar),
    /// 单元场，线性插值到面
    Cell(&'a VolField<f64>),
    /// 面场
    Face(&'a SurfaceField<f64>),
}

impl<'a> From<&'a DimensionedScalar> for Diffusivity<'a> {
    fn from(value: &'a DimensionedScalar) -> Self {
        Self::Uniform(value)
    }
}

impl<'a> From<&'a VolField<f64>> for Diffusivity<'a> {
    fn from(value: &'a VolField<f64>) -> Self {
        Self::Cell(value)
    }
}

impl<'a> From<&'a SurfaceField<f64>> for Diffusivity<'a> {
    fn from(value: &'a SurfaceField<f64>) -> Self {
        Self::Face(value)
    }
}

impl Diffusivity<'_> {
    /// 名称
    pub fn name(&self) -> &str {
        match self {
            Self::Uniform(g) => &g.name,
            Self::Cell(g) => g.name(),
            Self::Face(g) => g.name(),
        }
    }

    /// 量纲
    pub fn dimensions(&self) -> DimensionSet {
        match self {
            Self::Uniform(g) => g.dimensions,
            Self::Cell(g) => g.dimensions(),
            Self::Face(g) => g.dimensions(),
        }
    }

    /// 面值
    pub fn face_values(&self, mesh: &FvMesh) -> FvResult<SurfaceField<f64>> {
        match self {
            Self::Uniform(g) => Ok(SurfaceField::uniform(g.name.clone(), mesh, g.dimensions, g.value)),
            Self::Cell(g) => interpolate(mesh, g),
            Self::Face(g) => Ok((*g).clone()),
        }
    }
}

/// 拉普拉斯项名，形如 `laplacian(nu,U)`
pub fn laplacian_term_name(gamma: &str, psi: &str) -> String {
    format!("laplacian({gamma},{psi})")
}

/// `∇·(Γ∇ψ)`，格式从 `laplacianSchemes` 读取
pub fn laplacian<'g, T: Gradient>(
    ctx: &FvContext<'_>,
    gamma: impl Into<Diffusivity<'g>>,
    psi: &VolField<T>,
) -> FvResult<FvMatrix<T>> {
    let gamma = gamma.into();
    let scheme = ctx.laplacian_scheme(&laplacian_term_name(gamma.name(), psi.name()))?;
    laplacian_with(ctx, gamma, psi, scheme)
}

/// 指定格式的 `∇·(Γ∇ψ)`
pub fn laplacian_with<'g, T: Gradient>(
    ctx: &FvContext<'_>,
    gamma: impl Into<Diffusivity<'g>>,
    psi: &VolField<T>,
    scheme: SnGradScheme,
) -> FvResult<FvMatrix<T>> {
    let mesh = ctx.mesh;
    let gamma = gamma.into();
    let gamma_f = gamma.face_values(mesh)?;
    let mag_sf = mesh.mag_sf();
    let delta = mesh.non_orth_delta_coeffs();

    let dims = gamma.dimensions() * psi.dimensions() * DimensionSet::LENGTH;
    let mut m = FvMatrix::new(psi, mesh, dims);
    for (f, u) in m.ldu_mut().upper_mut().iter_mut().enumerate() {
        *u = gamma_f.internal()[f] * mag_sf[f] * delta[f];
    }
    m.ldu_mut().neg_sum_diag();

    for pf in psi.boundary().iter().filter(|pf| pf.contributes()) {
        let p = pf.patch_index();
        let geo = PatchGeometry::new(mesh, p)?;
        let gamma_b = gamma_f.boundary_values(p);
        let gic = pf.gradient_internal_coeffs(&geo);
        let gbc = pf.gradient_boundary_coeffs(&geo);
        let pmag = geo.mag_sf();
        for (i, ic) in m.internal_coeffs_mut(p).iter_mut().enumerate() {
            *ic = gamma_b[i] * pmag[i] * gic[i];
        }
        for (i, bc) in m.boundary_coeffs_mut(p).iter_mut().enumerate() {
            *bc = gbc[i] * -(gamma_b[i] * pmag[i]);
        }
    }

    if scheme.corrected() && mesh.is_non_orthogonal() {
        let corr = non_orth_correction(mesh, psi, scheme)?;
        let mag = SurfaceField::from_fn("magSf", mesh, DimensionSet::AREA, |f| mag_sf[f]);
        let gamma_mag_sf = gamma_f.mul_scalar_field(&mag)?;
        let face_flux = corr.mul_scalar_field(&gamma_mag_sf)?;
        subtract_face_sum(ctx, &mut m, &face_flux);
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeState;
    use fv_config::FvSchemes;
    use fv_mesh::StructuredBlock;

    #[test]
    fn test_coefficients_and_dimensions() {
        let mesh = StructuredBlock::line(4, 2.0).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let mut psi = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 0.0).unwrap();
        psi.fix_value(&mesh, "left", 1.0).unwrap();
        let dt = DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 2.0);
        let m = laplacian(&ctx, &dt, &psi).unwrap();

        // |S| = 0.25, δ = 2
        assert_eq!(m.ldu().upper().unwrap(), &[1.0, 1.0, 1.0]);
        assert!(m.ldu().is_symmetric());
        assert_eq!(m.diag(), &[-1.0, -2.0, -2.0, -1.0]);
        let left = mesh.patch_index("left").unwrap();
        // 半单元距离 δ_b = 4
        assert_eq!(m.internal_coeffs(left), &[-2.0]);
        assert_eq!(m.boundary_coeffs(left), &[-2.0]);
        assert_eq!(
            m.dimensions(),
            DimensionSet::KINEMATIC_VISCOSITY * DimensionSet::TEMPERATURE * DimensionSet::LENGTH
        );
    }

    #[test]
    fn test_diffusivity_variants_agree() {
        let mesh = StructuredBlock::plane(3, 3, 1.0, 1.0).distorted(0.1).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let psi = VolField::from_values(
            "T",
            &mesh,
            DimensionSet::DIMLESS,
            mesh.c().iter().map(|c| c.x * c.x + c.y).collect(),
        )
        .unwrap();
        let g = DimensionedScalar::new("g", DimensionSet::KINEMATIC_VISCOSITY, 0.5);
        let gc = VolField::uniform("g", &mesh, DimensionSet::KINEMATIC_VISCOSITY, 0.5).unwrap();
        let gf = SurfaceField::uniform("g", &mesh, DimensionSet::KINEMATIC_VISCOSITY, 0.5);

        let a = laplacian(&ctx, &g, &psi).unwrap();
        assert!(a.source().iter().any(|s| s.abs() > 0.0));
        for other in [laplacian(&ctx, &gc, &psi).unwrap(), laplacian(&ctx, &gf, &psi).unwrap()] {
            for (x, y) in a.diag().iter().zip(other.diag()) {
                assert!((x - y).abs() < 1e-12);
            }
            for (x, y) in a.source().iter().zip(other.source()) {
                assert!((x - y).abs() < 1e-12);
            }
        }
    }
}
