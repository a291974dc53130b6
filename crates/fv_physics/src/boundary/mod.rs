// crates/fv_physics/src/boundary/mod.rs

//! 边界条件模块
//!
//! 每个场在每个面片上恰有一个边界条件实例，负责三件事：
//!
//! 1. 由内部场计算面片面值（[`BoundaryCondition::evaluate`]）
//! 2. 计算面法向梯度（[`BoundaryCondition::sn_grad`]）
//! 3. 为隐式离散提供矩阵系数
//!
//! # 系数约定
//!
//! 面值 `ψ_b = vic·ψ_P + vbc`，面法向梯度 `∂ψ/∂n = gic·ψ_P + gbc`。
//! `vic`/`gic` 是标量系数，`vbc`/`gbc` 与场同型。
//!
//! | 类型 | vic | vbc | gic | gbc |
//! |---|---|---|---|---|
//! | fixedValue | 0 | ψ_b | -δ | δ·ψ_b |
//! | zeroGradient | 1 | 0 | 0 | 0 |
//! | fixedGradient | 1 | g/δ | 0 | g |
//! | mixed | 1-f | f·ψ_r + (1-f)·g_r/δ | -f·δ | f·δ·ψ_r + (1-f)·g_r |
//! | coupled | w | (1-w)·ψ_N | -δ | δ·ψ_N |
//!
//! # 子模块
//!
//! - [`basic`]: fixedValue、zeroGradient、fixedGradient、mixed、calculated、empty
//! - [`inlet_outlet`]: 随通量方向切换的 inletOutlet
//! - [`coupled`]: 分区交界（processor）
//! - [`factory`]: 注册与按名构造

pub mod basic;
pub mod coupled;
pub mod factory;
pub mod inlet_outlet;

pub use basic::{Calculated, Empty, FixedGradient, FixedValue, Mixed, ZeroGradient};
pub use coupled::Processor;
pub use factory::{
    calculated_condition, check_patch_kind, default_condition, new_patch_field,
    register_boundary_conditions, BoundaryConditions,
};
pub use inlet_outlet::InletOutlet;

use crate::field::value::FieldValue;
use fv_config::Dictionary;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::{BoundaryPatch, FvMesh};
use glam::DVec3;
use serde_json::Value;
use std::fmt::Debug;

// ============================================================
// 面片几何
// ============================================================

/// 面片几何视图
#[derive(Debug, Clone, Copy)]
pub struct PatchGeometry<'a> {
    mesh: &'a FvMesh,
    patch: &'a BoundaryPatch,
}

impl<'a> PatchGeometry<'a> {
    /// 按面片序号创建
    pub fn new(mesh: &'a FvMesh, patch: usize) -> FvResult<Self> {
        let patch = mesh
            .patches()
            .get(patch)
            .ok_or_else(|| FvError::invalid_input(format!("面片序号 {patch} 越界")))?;
        Ok(Self { mesh, patch })
    }

    /// 网格
    #[inline]
    pub fn mesh(&self) -> &'a FvMesh {
        self.mesh
    }

    /// 面片
    #[inline]
    pub fn patch(&self) -> &'a BoundaryPatch {
        self.patch
    }

    /// 面数
    #[inline]
    pub fn size(&self) -> usize {
        self.patch.size
    }

    /// 面片面的 owner 单元
    #[inline]
    pub fn face_cells(&self) -> &'a [usize] {
        &self.mesh.owner_addr()[self.patch.faces()]
    }

    /// 面法向距离系数 `1/(n·d)`
    #[inline]
    pub fn delta_coeffs(&self) -> &'a [f64] {
        &self.mesh.non_orth_delta_coeffs()[self.patch.faces()]
    }

    /// 几何插值权重（非耦合面片为 1）
    #[inline]
    pub fn weights(&self) -> &'a [f64] {
        &self.mesh.weights()[self.patch.faces()]
    }

    /// 面积
    #[inline]
    pub fn mag_sf(&self) -> &'a [f64] {
        &self.mesh.mag_sf()[self.patch.faces()]
    }

    /// 面积矢量
    #[inline]
    pub fn sf(&self) -> &'a [DVec3] {
        &self.mesh.sf()[self.patch.faces()]
    }

    /// 面中心
    #[inline]
    pub fn cf(&self) -> &'a [DVec3] {
        &self.mesh.cf()[self.patch.faces()]
    }

    /// 面片相邻单元的内部场值
    pub fn internal_values<T: FieldValue>(&self, internal: &[T]) -> Vec<T> {
        self.face_cells().iter().map(|&c| internal[c]).collect()
    }
}

// ============================================================
// 边界条件 trait
// ============================================================

/// 边界条件
///
/// 实现者保存自身参数（给定值、梯度、参考值等），当前面值由
/// [`PatchField`] 保存并在系数计算时传入。
pub trait BoundaryCondition<T: FieldValue>: Send + Sync + Debug {
    /// 类型名（注册名）
    fn type_name(&self) -> &'static str;

    /// 更新依赖时间或通量的系数
    fn update_coeffs(&mut self, _geo: &PatchGeometry<'_>, _flux: Option<&[f64]>) -> FvResult<()> {
        Ok(())
    }

    /// 由内部场计算面值
    fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]);

    /// 面法向梯度
    fn sn_grad(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &[T]) -> Vec<T> {
        geo.face_cells()
            .iter()
            .zip(values)
            .zip(geo.delta_coeffs())
            .map(|((&c, &vb), &dc)| (vb - internal[c]) * dc)
            .collect()
    }

    /// 面值对内部单元的系数
    fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, weights: &[f64]) -> Vec<f64>;

    /// 面值的显式部分
    fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, weights: &[f64], values: &[T]) -> Vec<T>;

    /// 面法向梯度对内部单元的系数
    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64>;

    /// 面法向梯度的显式部分
    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, values: &[T]) -> Vec<T>;

    /// 是否为耦合（分区交界）条件
    fn is_coupled(&self) -> bool {
        false
    }

    /// 是否参与离散（空面片不参与）
    fn contributes(&self) -> bool {
        true
    }

    /// 是否固定面值（决定压力类方程是否需要参考点）
    fn fixes_value(&self) -> bool {
        false
    }

    /// 写入最近一次交换的邻侧单元值
    fn set_neighbour_values(&mut self, _values: &[T]) -> FvResult<()> {
        Err(FvError::mesh_consistency(format!(
            "{} 边界条件没有邻侧分区",
            self.type_name()
        )))
    }

    /// 复制为 trait 对象
    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>>;
}

impl<T: FieldValue> Clone for Box<dyn BoundaryCondition<T>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ============================================================
// 面片场
// ============================================================

/// 面片场：一个边界条件加上它的面值
///
/// `updated` 标志保证每个外迭代内 `update_coeffs` 只生效一次，
/// `evaluate` 后清除。
#[derive(Debug, Clone)]
pub struct PatchField<T: FieldValue> {
    patch: usize,
    condition: Box<dyn BoundaryCondition<T>>,
    values: Vec<T>,
    updated: bool,
}

impl<T: FieldValue> PatchField<T> {
    /// 创建面片场，面值数必须等于面片面数
    pub fn new(
        geo: &PatchGeometry<'_>,
        condition: Box<dyn BoundaryCondition<T>>,
        values: Vec<T>,
    ) -> FvResult<Self> {
        FvError::check_size(&geo.patch().name, geo.size(), values.len())?;
        Ok(Self {
            patch: geo.patch().index,
            condition,
            values,
            updated: false,
        })
    }

    /// 由已知相容的部件直接组装（运算结果）
    pub(crate) fn from_parts(patch: usize, condition: Box<dyn BoundaryCondition<T>>, values: Vec<T>) -> Self {
        Self {
            patch,
            condition,
            values,
            updated: false,
        }
    }

    /// 面片序号
    #[inline]
    pub fn patch_index(&self) -> usize {
        self.patch
    }

    /// 边界条件类型名
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.condition.type_name()
    }

    /// 边界条件
    #[inline]
    pub fn condition(&self) -> &dyn BoundaryCondition<T> {
        self.condition.as_ref()
    }

    /// 可变边界条件
    #[inline]
    pub fn condition_mut(&mut self) -> &mut dyn BoundaryCondition<T> {
        self.condition.as_mut()
    }

    /// 面值
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// 可变面值
    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// 面片局部面值
    #[inline]
    pub fn value(&self, face: usize) -> T {
        self.values[face]
    }

    /// 面数
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有面
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 本次外迭代是否已更新
    #[inline]
    pub fn is_updated(&self) -> bool {
        self.updated
    }

    /// 是否参与离散
    #[inline]
    pub fn contributes(&self) -> bool {
        self.condition.contributes()
    }

    /// 是否为耦合面片
    #[inline]
    pub fn is_coupled(&self) -> bool {
        self.condition.is_coupled()
    }

    /// 更新系数，已更新时不重复执行
    pub fn update_coeffs(&mut self, geo: &PatchGeometry<'_>, flux: Option<&[f64]>) -> FvResult<()> {
        if self.updated {
            return Ok(());
        }
        if let Some(flux) = flux {
            FvError::check_size(&geo.patch().name, geo.size(), flux.len())?;
        }
        self.condition.update_coeffs(geo, flux)?;
        self.updated = true;
        Ok(())
    }

    /// 由内部场重新计算面值并清除更新标志
    pub fn evaluate(&mut self, geo: &PatchGeometry<'_>, internal: &[T]) -> FvResult<()> {
        if !self.updated {
            self.update_coeffs(geo, None)?;
        }
        self.condition.evaluate(geo, internal, &mut self.values);
        self.updated = false;
        Ok(())
    }

    /// 面法向梯度
    pub fn sn_grad(&self, geo: &PatchGeometry<'_>, internal: &[T]) -> Vec<T> {
        self.condition.sn_grad(geo, internal, &self.values)
    }

    /// 面值对内部单元的系数
    pub fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, weights: &[f64]) -> Vec<f64> {
        self.condition.value_internal_coeffs(geo, weights)
    }

    /// 面值的显式部分
    pub fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, weights: &[f64]) -> Vec<T> {
        self.condition.value_boundary_coeffs(geo, weights, &self.values)
    }

    /// 面法向梯度对内部单元的系数
    pub fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        self.condition.gradient_internal_coeffs(geo)
    }

    /// 面法向梯度的显式部分
    pub fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<T> {
        self.condition.gradient_boundary_coeffs(geo, &self.values)
    }

    /// 写入邻侧单元值（仅耦合条件），随即重算面值
    ///
    /// 不改变 `updated` 标志。
    pub fn set_neighbour_values(&mut self, geo: &PatchGeometry<'_>, internal: &[T], values: &[T]) -> FvResult<()> {
        FvError::check_size("neighbourValues", self.values.len(), values.len())?;
        self.condition.set_neighbour_values(values)?;
        self.condition.evaluate(geo, internal, &mut self.values);
        Ok(())
    }

    /// 替换边界条件，保留面值
    pub fn replace_condition(&mut self, condition: Box<dyn BoundaryCondition<T>>) {
        self.condition = condition;
        self.updated = false;
    }
}

// ============================================================
// 字典读取
// ============================================================

/// 读取面片值：均匀值（标量数值、矢量/张量数组）或逐面列表
///
/// 键不存在返回 `None`。
pub fn lookup_patch_values<T: FieldValue>(
    dict: &Dictionary,
    key: &str,
    size: usize,
) -> FvResult<Option<Vec<T>>> {
    let Some(raw) = dict.raw(key) else {
        return Ok(None);
    };
    if let Some(uniform) = T::from_json(raw) {
        return Ok(Some(vec![uniform; size]));
    }
    let invalid = |reason: String| FvError::invalid_config(format!("{}.{}", dict.scope(), key), raw, reason);
    let Value::Array(items) = raw else {
        return Err(invalid(format!("需要 {} 值或逐面列表", T::CLASS_NAME)));
    };
    if items.len() != size {
        return Err(invalid(format!("面片有 {} 个面，给出 {} 个值", size, items.len())));
    }
    items
        .iter()
        .map(|item| T::from_json(item).ok_or_else(|| invalid(format!("列表元素不是 {} 值", T::CLASS_NAME))))
        .collect::<FvResult<Vec<T>>>()
        .map(Some)
}

/// 读取必需的面片值
pub fn require_patch_values<T: FieldValue>(
    dict: &Dictionary,
    key: &str,
    size: usize,
) -> FvResult<Vec<T>> {
    lookup_patch_values(dict, key, size)?.ok_or_else(|| FvError::missing_key(key, dict.scope()))
}

/// 读取面片当前值：先找 `value`，再找 `values`
pub fn lookup_initial_values<T: FieldValue>(dict: &Dictionary, size: usize) -> FvResult<Option<Vec<T>>> {
    match lookup_patch_values(dict, "value", size)? {
        Some(v) => Ok(Some(v)),
        None => lookup_patch_values(dict, "values", size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct Counting(Arc<AtomicUsize>);

    impl BoundaryCondition<f64> for Counting {
        fn type_name(&self) -> &'static str {
            "counting"
        }

        fn update_coeffs(&mut self, _geo: &PatchGeometry<'_>, _flux: Option<&[f64]>) -> FvResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[f64], values: &mut [f64]) {
            values.copy_from_slice(&geo.internal_values(internal));
        }

        fn value_internal_coeffs(&self, geo: &PatchGeometry<'_>, _w: &[f64]) -> Vec<f64> {
            vec![1.0; geo.size()]
        }

        fn value_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _w: &[f64], _v: &[f64]) -> Vec<f64> {
            vec![0.0; geo.size()]
        }

        fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
            vec![0.0; geo.size()]
        }

        fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _v: &[f64]) -> Vec<f64> {
            vec![0.0; geo.size()]
        }

        fn clone_box(&self) -> Box<dyn BoundaryCondition<f64>> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn test_update_coeffs_idempotent_until_evaluate() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let geo = PatchGeometry::new(&mesh, 0).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pf = PatchField::new(&geo, Box::new(Counting(counter.clone())), vec![0.0]).unwrap();

        pf.update_coeffs(&geo, None).unwrap();
        pf.update_coeffs(&geo, None).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(pf.is_updated());

        pf.evaluate(&geo, &[7.0, 8.0, 9.0]).unwrap();
        assert!(!pf.is_updated());
        assert_eq!(pf.values(), &[7.0]);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // evaluate 前未更新时自动更新一次
        pf.evaluate(&geo, &[1.0, 8.0, 9.0]).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_patch_field_size_checked() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let geo = PatchGeometry::new(&mesh, 0).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        assert!(matches!(
            PatchField::new(&geo, Box::new(Counting(counter)), vec![0.0, 1.0]),
            Err(FvError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_lookup_patch_values() {
        let dict = Dictionary::from_value(
            "inlet",
            json!({ "value": [1.0, 0.0, 0.0], "values": [1.0, 2.0], "bad": "x" }),
        )
        .unwrap();
        let uniform: Vec<DVec3> = lookup_patch_values(&dict, "value", 2).unwrap().unwrap();
        assert_eq!(uniform, vec![DVec3::X; 2]);
        let list: Vec<f64> = lookup_patch_values(&dict, "values", 2).unwrap().unwrap();
        assert_eq!(list, vec![1.0, 2.0]);
        assert!(lookup_patch_values::<f64>(&dict, "values", 3).is_err());
        assert!(lookup_patch_values::<f64>(&dict, "bad", 1).is_err());
        assert!(lookup_patch_values::<f64>(&dict, "missing", 1).unwrap().is_none());
        assert!(matches!(
            require_patch_values::<f64>(&dict, "gradient", 1),
            Err(FvError::MissingConfigurationKey { .. })
        ));
    }
}
