// crates/fv_physics/src/boundary/inlet_outlet.rs

//! inletOutlet 边界条件
//!
//! 出流面（`φ ≥ 0`）零梯度，回流面（`φ < 0`）取给定的 `inletValue`。
//! 内部是一个 [`Mixed`]，值权重在 `update_coeffs` 中按面通量符号刷新。

use super::basic::Mixed;
use super::{require_patch_values, BoundaryCondition, PatchGeometry};
use crate::field::value::FieldValue;
use crate::registry::ModelContext;
use fv_config::Dictionary;
use fv_foundation::error::FvResult;

/// 随通量方向切换的混合边界
#[derive(Debug, Clone, PartialEq)]
pub struct InletOutlet<T> {
    mixed: Mixed<T>,
}

impl<T: FieldValue> InletOutlet<T> {
    /// 注册名
    pub const TYPE_NAME: &'static str = "inletOutlet";

    /// 由回流值创建，初始全部按出流处理
    pub fn new(inlet_value: Vec<T>) -> FvResult<Self> {
        let n = inlet_value.len();
        Ok(Self {
            mixed: Mixed::new(inlet_value, vec![T::ZERO; n], vec![0.0; n])?,
        })
    }

    /// 回流值
    pub fn inlet_value(&self) -> &[T] {
        self.mixed.ref_value()
    }

    /// 当前值权重（回流面为 1）
    pub fn value_fraction(&self) -> &[f64] {
        self.mixed.value_fraction()
    }

    /// 从字典构造，要求 `inletValue`
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "inletValue", "value", "values"])?;
        let size = ctx.patch()?.size;
        Ok(Box::new(Self::new(require_patch_values(dict, "inletValue", size)?)?))
    }
}

impl<T: FieldValue> BoundaryCondition<T> for InletOutlet<T> {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn update_coeffs(&mut self, geo: &PatchGeometry<'_>, flux: Option<&[f64]>) -> FvResult<()> {
        let Some(flux) = flux else {
            log::trace!("{}: 未提供面通量，沿用上次的值权重", geo.patch().name);
            return Ok(());
        };
        for (f, &phi) in self.mixed.value_fraction_mut().iter_mut().zip(flux) {
            *f = if phi >= 0.0 { 0.0 } else { 1.0 };
        }
        Ok(())
    }

    fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
        self.mixed.mixed_evaluate(geo, internal, values);
    }

    fn sn_grad(&self, geo: &PatchGeometry<'_>, internal: &[T], _values: &[T]) -> Vec<T> {
        self.mixed.mixed_sn_grad(geo, internal)
    }

    fn value_internal_coeffs(&self, _geo: &PatchGeometry<'_>, _weights: &[f64]) -> Vec<f64> {
        self.mixed.mixed_value_internal_coeffs()
    }

    fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64], _values: &[T]) -> Vec<T> {
        self.mixed.mixed_value_boundary_coeffs(geo)
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        self.mixed.mixed_gradient_internal_coeffs(geo)
    }

    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _values: &[T]) -> Vec<T> {
        self.mixed.mixed_gradient_boundary_coeffs(geo)
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(self.clone())
    }
}
