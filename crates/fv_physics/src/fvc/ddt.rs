// crates/fv_physics/src/fvc/ddt.rs

//! 显式时间导数

use super::extrapolated;
use crate::context::FvContext;
use crate::field::{FieldValue, VolField};
use crate::fvm::ddt::{old_levels, DdtCoefficients};
use fv_foundation::dimension::DimensionSet;
use fv_foundation::error::FvResult;

/// `∂ψ/∂t`，系数与隐式算子相同，稳态为零
pub fn ddt<T: FieldValue>(ctx: &FvContext<'_>, psi: &VolField<T>) -> FvResult<VolField<T>> {
    let k = DdtCoefficients::new(ctx, psi);
    let (old, old_old) = old_levels(psi);
    let values = psi
        .internal()
        .iter()
        .zip(old.iter().zip(old_old))
        .map(|(&cur, (&o, &oo))| (cur * k.a - o * k.b0 + oo * k.b00) * k.r_delta_t)
        .collect();
    extrapolated(
        format!("ddt({})", psi.name()),
        ctx.mesh,
        psi.dimensions() / DimensionSet::TIME,
        values,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TimeState;
    use fv_config::{DdtScheme, FvSchemes};
    use fv_mesh::StructuredBlock;

    #[test]
    fn test_euler_rate() {
        let mesh = StructuredBlock::line(3, 1.0).build().unwrap();
        let schemes = FvSchemes::default();
        let time = TimeState::new(0.0, 0.25).unwrap();
        let ctx = FvContext::new(&mesh, &schemes, &time).unwrap();
        let mut t = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 1.0).unwrap();
        t.store_old_time();
        t.internal_mut().fill(2.0);

        let rate = ddt(&ctx, &t).unwrap();
        assert!(rate.internal().iter().all(|&r| (r - 4.0).abs() < 1e-12));
        assert_eq!(rate.dimensions(), DimensionSet::TEMPERATURE / DimensionSet::TIME);

        let steady = ddt(&ctx.with_ddt_scheme(DdtScheme::SteadyState), &t).unwrap();
        assert!(steady.internal().iter().all(|&r| r == 0.0));
    }
}
