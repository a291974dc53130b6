// crates/fv_physics/src/fvm/ddt.rs

//! 隐式时间导数
//!
//! 统一写成
//!
//! ```text
//! ∂ψ/∂t ≈ (a·ψ - b0·ψ⁰ + b00·ψ⁰⁰) / Δt
//! ```
//!
//! | 格式 | a | b0 | b00 |
//! |------|---|----|-----|
//! | Euler | 1 | 1 | 0 |
//! | backward | `1 + Δt/(Δt + Δt⁰)` | `a + b00` | `Δt²/(Δt⁰(Δt + Δt⁰))` |
//! | blended ψ | ψ·backward + (1 - ψ)·Euler | | |
//!
//! backward 在没有旧旧时间层或第一步时退化为 Euler。

use crate::context::FvContext;
use crate::field::{FieldValue, VolField};
use crate::matrix::FvMatrix;
use fv_config::DdtScheme;
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::FvResult;

/// 时间离散系数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DdtCoefficients {
    /// 当前时间层系数
    pub a: f64,
    /// 旧时间层系数
    pub b0: f64,
    /// 旧旧时间层系数
    pub b00: f64,
    /// `1/Δt`，稳态为 0
    pub r_delta_t: f64,
}

impl DdtCoefficients {
    const EULER: (f64, f64, f64) = (1.0, 1.0, 0.0);

    /// 按格式和时间状态计算系数
    pub fn new<T: FieldValue>(ctx: &FvContext<'_>, psi: &VolField<T>) -> Self {
        let time = ctx.time;
        let backward = || {
            if psi.old_old_time().is_none() || time.index < 2 {
                return Self::EULER;
            }
            let dt = time.delta_t;
            let dt0 = time.delta_t0;
            let coefft = 1.0 + dt / (dt + dt0);
            let coefft00 = dt * dt / (dt0 * (dt + dt0));
            (coefft, coefft + coefft00, coefft00)
        };
        let (a, b0, b00) = match ctx.ddt_scheme {
            DdtScheme::SteadyState => {
                return Self {
                    a: 0.0,
                    b0: 0.0,
                    b00: 0.0,
                    r_delta_t: 0.0,
                }
            }
            DdtScheme::Euler => Self::EULER,
            DdtScheme::Backward => backward(),
            DdtScheme::Blended(w) => {
                let (ba, bb0, bb00) = backward();
                let (ea, eb0, eb00) = Self::EULER;
                (
                    w * ba + (1.0 - w) * ea,
                    w * bb0 + (1.0 - w) * eb0,
                    w * bb00 + (1.0 - w) * eb00,
                )
            }
        };
        Self {
            a,
            b0,
            b00,
            r_delta_t: 1.0 / time.delta_t,
        }
    }

    /// 是否为稳态
    pub fn is_steady(&self) -> bool {
        self.r_delta_t == 0.0
    }
}

/// 旧时间层，未保存时取当前值
pub(crate) fn old_levels<T: FieldValue>(psi: &VolField<T>) -> (&[T], &[T]) {
    let old = psi.old_time().unwrap_or(psi.internal());
    let old_old = psi.old_old_time().unwrap_or(old);
    (old, old_old)
}

/// `∂ψ/∂t`
pub fn ddt<T: FieldValue>(ctx: &FvContext<'_>, psi: &VolField<T>) -> FvResult<FvMatrix<T>> {
    let mesh = ctx.mesh;
    let mut m = FvMatrix::new(psi, mesh, psi.dimensions() * DimensionSet::VOLUME / DimensionSet::TIME);
    let k = DdtCoefficients::new(ctx, psi);
    if k.is_steady() {
        return Ok(m);
    }

    let (old, old_old) = old_levels(psi);
    let v = mesh.v();
    for (c, d) in m.ldu_mut().diag_mut().iter_mut().enumerate() {
        *d = k.a * v[c] * k.r_delta_t;
    }
    for (c, s) in m.source_mut().iter_mut().enumerate() {
        *s = (old[c] * k.b0 - old_old[c] * k.b00) * (v[c] * k.r_delta_t);
    }
    Ok(m)
}

/// `∂(ρψ)/∂t`，`ρ` 为常数
pub fn ddt_coeff<T: FieldValue>(
    ctx: &FvContext<'_>,
    rho: &DimensionedScalar,
    psi: &VolField<T>,
) -> FvResult<FvMatrix<T>> {
    let m = ddt(ctx, psi)?;
    Ok(m.scaled(rho.value, rho.dimensions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeState;
    use fv_config::FvSchemes;
    use fv_mesh::StructuredBlock;

    fn field(mesh: &fv_mesh::FvMesh) -> VolField<f64> {
        let mut psi = VolField::uniform("T", mesh, DimensionSet::TEMPERATURE, 1.0).unwrap();
        psi.store_old_time();
        psi.internal_mut().fill(2.0);
        psi.store_old_time();
        psi.internal_mut().fill(4.0);
        psi
    }

    #[test]
    fn test_euler_coefficients() {
        let mesh = StructuredBlock::line(2, 2.0).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::new(0.0, 0.5).unwrap();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let psi = field(&mesh);
        let m = ddt(&ctx, &psi).unwrap();
        assert_eq!(m.diag(), &[2.0, 2.0]);
        assert_eq!(m.source(), &[4.0, 4.0]);
        assert_eq!(
            m.dimensions(),
            DimensionSet::TEMPERATURE * DimensionSet::VOLUME / DimensionSet::TIME
        );
    }

    #[test]
    fn test_backward_falls_back_then_second_order() {
        let mesh = StructuredBlock::line(2, 2.0).build().unwrap();
        let schemes = FvSchemes::default();
        let mut time = TimeState::new(0.0, 1.0).unwrap();
        time.advance();
        let psi = field(&mesh);

        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap().with_ddt_scheme(DdtScheme::Backward);
        assert_eq!(DdtCoefficients::new(&ctx, &psi).a, 1.0);

        time.advance();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap().with_ddt_scheme(DdtScheme::Backward);
        let k = DdtCoefficients::new(&ctx, &psi);
        assert!((k.a - 1.5).abs() < 1e-14);
        assert!((k.b0 - 2.0).abs() < 1e-14);
        assert!((k.b00 - 0.5).abs() < 1e-14);

        // 线性时间历程 1, 2, 3 的二阶导数估计精确
        let mut lin = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 1.0).unwrap();
        lin.store_old_time();
        lin.internal_mut().fill(2.0);
        lin.store_old_time();
        lin.internal_mut().fill(3.0);
        let m = ddt(&ctx, &lin).unwrap();
        let rate = (m.diag()[0] * 3.0 - m.source()[0]) / mesh.v()[0];
        assert!((rate - 1.0).abs() < 1e-12);

        let blended = ctx.with_ddt_scheme(DdtScheme::Blended(0.5));
        assert!((DdtCoefficients::new(&blended, &psi).a - 1.25).abs() < 1e-14);
    }

    #[test]
    fn test_steady_state_and_coefficient() {
        let mesh = StructuredBlock::line(2, 2.0).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::default();
        let ctx = FvContext::new(&mesh, &schemes, &time)
            .unwrap()
            .with_ddt_scheme(DdtScheme::SteadyState);
        let psi = field(&mesh);
        let m = ddt(&ctx, &psi).unwrap();
        assert!(m.diag().iter().all(|&d| d == 0.0));

        let ctx = ctx.with_ddt_scheme(DdtScheme::Euler);
        let rho = DimensionedScalar::new("rho", DimensionSet::DENSITY, 10.0);
        let m = ddt_coeff(&ctx, &rho, &psi).unwrap();
        assert_eq!(m.diag()[0], 10.0);
        assert_eq!(
            m.dimensions(),
            DimensionSet::DENSITY * DimensionSet::TEMPERATURE * DimensionSet::VOLUME / DimensionSet::TIME
        );
    }
}
