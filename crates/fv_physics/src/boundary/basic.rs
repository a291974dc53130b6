// crates/fv_physics/src/boundary/basic.rs

//! 基本边界条件
//!
//! 给定值类条件（fixedValue、calculated）的面值就是 [`PatchField`] 保存的值，
//! 条件本身不再另存一份。
//!
//! [`PatchField`]: super::PatchField

use super::{lookup_patch_values, require_patch_values, BoundaryCondition, PatchGeometry};
use crate::field::value::FieldValue;
use crate::registry::ModelContext;
use fv_config::Dictionary;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::PatchKind;

fn zeros<T: FieldValue>(n: usize) -> Vec<T> {
    vec![T::ZERO; n]
}

fn copy_internal<T: FieldValue>(geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
    for (v, &c) in values.iter_mut().zip(geo.face_cells()) {
        *v = internal[c];
    }
}

fn fixed_value_coeffs<T: FieldValue>(geo: &PatchGeometry<'_>, values: &[T]) -> Vec<T> {
    values
        .iter()
        .zip(geo.delta_coeffs())
        .map(|(&v, &dc)| v * dc)
        .collect()
}

// ============================================================
// fixedValue
// ============================================================

/// 给定面值（Dirichlet）
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedValue;

impl FixedValue {
    /// 注册名
    pub const TYPE_NAME: &'static str = "fixedValue";

    /// 从字典构造，要求 `value` 或 `values`
    pub fn construct<T: FieldValue>(
        dict: &Dictionary,
        _ctx: &ModelContext<'_>,
    ) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "value", "values"])?;
        if !dict.found("value") && !dict.found("values") {
            return Err(FvError::missing_key("value", dict.scope()));
        }
        Ok(Box::new(Self))
    }
}

impl<T: FieldValue> BoundaryCondition<T> for FixedValue {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&self, _geo: &PatchGeometry<'_>, _internal: &[T], _values: &mut [T]) {}

    fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64]) -> Vec<f64> {
        vec![0.0; geo.size()]
    }

    fn value_boundary_coeffs(&self, _geo: &PatchGeometry<'_>, _weights: &[f64], values: &[T]) -> Vec<T> {
        values.to_vec()
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        geo.delta_coeffs().iter().map(|dc| -dc).collect()
    }

    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, values: &[T]) -> Vec<T> {
        fixed_value_coeffs(geo, values)
    }

    fn fixes_value(&self) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(*self)
    }
}

// ============================================================
// zeroGradient
// ============================================================

/// 零法向梯度（齐次 Neumann）
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroGradient;

impl ZeroGradient {
    /// 注册名
    pub const TYPE_NAME: &'static str = "zeroGradient";

    /// 从字典构造
    pub fn construct<T: FieldValue>(
        dict: &Dictionary,
        _ctx: &ModelContext<'_>,
    ) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "value", "values"])?;
        Ok(Box::new(Self))
    }
}

impl<T: FieldValue> BoundaryCondition<T> for ZeroGradient {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
        copy_internal(geo, internal, values);
    }

    fn sn_grad(&self, geo: &PatchGeometry<'_>, _internal: &[T], _values: &[T]) -> Vec<T> {
        zeros(geo.size())
    }

    fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64]) -> Vec<f64> {
        vec![1.0; geo.size()]
    }

    fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64], _values: &[T]) -> Vec<T> {
        zeros(geo.size())
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        vec![0.0; geo.size()]
    }

    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _values: &[T]) -> Vec<T> {
        zeros(geo.size())
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(*self)
    }
}

// ============================================================
// fixedGradient
// ============================================================

/// 给定法向梯度（Neumann）
#[derive(Debug, Clone, PartialEq)]
pub struct FixedGradient<T> {
    gradient: Vec<T>,
}

impl<T: FieldValue> FixedGradient<T> {
    /// 注册名
    pub const TYPE_NAME: &'static str = "fixedGradient";

    /// 逐面梯度
    pub fn new(gradient: Vec<T>) -> Self {
        Self { gradient }
    }

    /// 梯度
    pub fn gradient(&self) -> &[T] {
        &self.gradient
    }

    /// 修改梯度
    pub fn gradient_mut(&mut self) -> &mut Vec<T> {
        &mut self.gradient
    }

    /// 从字典构造，要求 `gradient`
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "gradient", "value", "values"])?;
        let size = ctx.patch()?.size;
        Ok(Box::new(Self::new(require_patch_values(dict, "gradient", size)?)))
    }
}

impl<T: FieldValue> BoundaryCondition<T> for FixedGradient<T> {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
        for (((v, &c), &g), &dc) in values
            .iter_mut()
            .zip(geo.face_cells())
            .zip(&self.gradient)
            .zip(geo.delta_coeffs())
        {
            *v = internal[c] + g * (1.0 / dc);
        }
    }

    fn sn_grad(&self, _geo: &PatchGeometry<'_>, _internal: &[T], _values: &[T]) -> Vec<T> {
        self.gradient.clone()
    }

    fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64]) -> Vec<f64> {
        vec![1.0; geo.size()]
    }

    fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64], _values: &[T]) -> Vec<T> {
        self.gradient
            .iter()
            .zip(geo.delta_coeffs())
            .map(|(&g, &dc)| g * (1.0 / dc))
            .collect()
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        vec![0.0; geo.size()]
    }

    fn gradient_boundary_coeffs(&self, _geo: &PatchGeometry<'_>, _values: &[T]) -> Vec<T> {
        self.gradient.clone()
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(self.clone())
    }
}

// ============================================================
// mixed
// ============================================================

/// 给定值与给定梯度按 `valueFraction` 混合
///
/// `f = 1` 退化为 fixedValue，`f = 0` 退化为 fixedGradient。
#[derive(Debug, Clone, PartialEq)]
pub struct Mixed<T> {
    ref_value: Vec<T>,
    ref_gradient: Vec<T>,
    value_fraction: Vec<f64>,
}

impl<T: FieldValue> Mixed<T> {
    /// 注册名
    pub const TYPE_NAME: &'static str = "mixed";

    /// 创建，三个数组长度必须一致
    pub fn new(ref_value: Vec<T>, ref_gradient: Vec<T>, value_fraction: Vec<f64>) -> FvResult<Self> {
        FvError::check_size("refGradient", ref_value.len(), ref_gradient.len())?;
        FvError::check_size("valueFraction", ref_value.len(), value_fraction.len())?;
        if let Some(f) = value_fraction.iter().find(|f| !(0.0..=1.0).contains(*f)) {
            return Err(FvError::invalid_config("valueFraction", f, "必须在 [0, 1] 内"));
        }
        Ok(Self {
            ref_value,
            ref_gradient,
            value_fraction,
        })
    }

    /// 参考值
    pub fn ref_value(&self) -> &[T] {
        &self.ref_value
    }

    /// 参考梯度
    pub fn ref_gradient(&self) -> &[T] {
        &self.ref_gradient
    }

    /// 值权重
    pub fn value_fraction(&self) -> &[f64] {
        &self.value_fraction
    }

    /// 修改值权重
    pub fn value_fraction_mut(&mut self) -> &mut [f64] {
        &mut self.value_fraction
    }

    /// 从字典构造：`refValue`、`valueFraction` 必需，`refGradient` 默认为零
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "refValue", "refGradient", "valueFraction", "value", "values"])?;
        let size = ctx.patch()?.size;
        let ref_value = require_patch_values(dict, "refValue", size)?;
        let ref_gradient = lookup_patch_values(dict, "refGradient", size)?.unwrap_or_else(|| zeros(size));
        let value_fraction = require_patch_values(dict, "valueFraction", size)?;
        Ok(Box::new(Self::new(ref_value, ref_gradient, value_fraction)?))
    }

    pub(crate) fn mixed_evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
        for (i, (v, &c)) in values.iter_mut().zip(geo.face_cells()).enumerate() {
            let f = self.value_fraction[i];
            let extrapolated = internal[c] + self.ref_gradient[i] * (1.0 / geo.delta_coeffs()[i]);
            *v = self.ref_value[i] * f + extrapolated * (1.0 - f);
        }
    }

    pub(crate) fn mixed_sn_grad(&self, geo: &PatchGeometry<'_>, internal: &[T]) -> Vec<T> {
        geo.face_cells()
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let f = self.value_fraction[i];
                (self.ref_value[i] - internal[c]) * (f * geo.delta_coeffs()[i]) + self.ref_gradient[i] * (1.0 - f)
            })
            .collect()
    }

    pub(crate) fn mixed_value_internal_coeffs(&self) -> Vec<f64> {
        self.value_fraction.iter().map(|f| 1.0 - f).collect()
    }

    pub(crate) fn mixed_value_boundary_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<T> {
        (0..self.ref_value.len())
            .map(|i| {
                let f = self.value_fraction[i];
                self.ref_value[i] * f + self.ref_gradient[i] * ((1.0 - f) / geo.delta_coeffs()[i])
            })
            .collect()
    }

    pub(crate) fn mixed_gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        self.value_fraction
            .iter()
            .zip(geo.delta_coeffs())
            .map(|(f, dc)| -f * dc)
            .collect()
    }

    pub(crate) fn mixed_gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<T> {
        (0..self.ref_value.len())
            .map(|i| {
                let f = self.value_fraction[i];
                self.ref_value[i] * (f * geo.delta_coeffs()[i]) + self.ref_gradient[i] * (1.0 - f)
            })
            .collect()
    }
}

impl<T: FieldValue> BoundaryCondition<T> for Mixed<T> {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
        self.mixed_evaluate(geo, internal, values);
    }

    fn sn_grad(&self, geo: &PatchGeometry<'_>, internal: &[T], _values: &[T]) -> Vec<T> {
        self.mixed_sn_grad(geo, internal)
    }

    fn value_internal_coeffs(&self, _geo: &PatchGeometry<'_>, _weights: &[f64]) -> Vec<f64> {
        self.mixed_value_internal_coeffs()
    }

    fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64], _values: &[T]) -> Vec<T> {
        self.mixed_value_boundary_coeffs(geo)
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        self.mixed_gradient_internal_coeffs(geo)
    }

    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _values: &[T]) -> Vec<T> {
        self.mixed_gradient_boundary_coeffs(geo)
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(self.clone())
    }
}

// ============================================================
// calculated
// ============================================================

/// 运算结果的边界值
///
/// 面值由产生它的运算写入，`evaluate` 不改变面值；
/// 若被用于隐式离散，系数按当前面值视为给定值。
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculated;

impl Calculated {
    /// 注册名
    pub const TYPE_NAME: &'static str = "calculated";

    /// 从字典构造
    pub fn construct<T: FieldValue>(
        dict: &Dictionary,
        _ctx: &ModelContext<'_>,
    ) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "value", "values"])?;
        Ok(Box::new(Self))
    }
}

impl<T: FieldValue> BoundaryCondition<T> for Calculated {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&self, _geo: &PatchGeometry<'_>, _internal: &[T], _values: &mut [T]) {}

    fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64]) -> Vec<f64> {
        vec![0.0; geo.size()]
    }

    fn value_boundary_coeffs(&self, _geo: &PatchGeometry<'_>, _weights: &[f64], values: &[T]) -> Vec<T> {
        values.to_vec()
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        geo.delta_coeffs().iter().map(|dc| -dc).collect()
    }

    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, values: &[T]) -> Vec<T> {
        fixed_value_coeffs(geo, values)
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(*self)
    }
}

// ============================================================
// empty
// ============================================================

/// 降维方向的空面片，不参与任何离散
#[derive(Debug, Clone, Copy, Default)]
pub struct Empty;

impl Empty {
    /// 注册名
    pub const TYPE_NAME: &'static str = "empty";

    /// 从字典构造，只能用于空面片
    pub fn construct<T: FieldValue>(
        dict: &Dictionary,
        ctx: &ModelContext<'_>,
    ) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "value", "values"])?;
        let patch = ctx.patch()?;
        if patch.kind != PatchKind::Empty {
            return Err(FvError::mesh_consistency(format!(
                "empty 边界条件只能用于空面片，面片 {} 的类型为 {}",
                patch.name, patch.kind
            )));
        }
        Ok(Box::new(Self))
    }
}

impl<T: FieldValue> BoundaryCondition<T> for Empty {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
        copy_internal(geo, internal, values);
    }

    fn sn_grad(&self, geo: &PatchGeometry<'_>, _internal: &[T], _values: &[T]) -> Vec<T> {
        zeros(geo.size())
    }

    fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64]) -> Vec<f64> {
        vec![0.0; geo.size()]
    }

    fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _weights: &[f64], _values: &[T]) -> Vec<T> {
        zeros(geo.size())
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        vec![0.0; geo.size()]
    }

    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _values: &[T]) -> Vec<T> {
        zeros(geo.size())
    }

    fn contributes(&self) -> bool {
        false
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(*self)
    }
}
