// crates/fv_physics/src/field/value.rs

//! 场值类型
//!
//! 场可以存放标量 `f64`、矢量 `DVec3` 或二阶张量 `DMat3`。
//! 张量分量按行主序编号：分量 `3·i + j` 对应第 `i` 行第 `j` 列。

use glam::{DMat3, DVec3};
use serde_json::Value;
use std::fmt::Debug;
use std::ops::{Add, Mul, Sub};

/// 场值 trait
pub trait FieldValue:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
{
    /// 零值
    const ZERO: Self;
    /// 分量数
    const N_COMPONENTS: usize;
    /// 持久化记录中的类名
    const CLASS_NAME: &'static str;
    /// 边界条件注册类别名
    const BOUNDARY_CATEGORY: &'static str;

    /// 第 `d` 个分量
    fn component(&self, d: usize) -> f64;

    /// 设置第 `d` 个分量
    fn set_component(&mut self, d: usize, value: f64);

    /// 由分量构造，长度不符返回 None
    fn from_components(components: &[f64]) -> Option<Self>;

    /// 模
    fn mag(&self) -> f64;

    /// 模的平方
    fn mag_sqr(&self) -> f64;

    /// 给定求解方向时该分量是否需要求解
    fn component_is_solved(_d: usize, _solution_d: [bool; 3]) -> bool {
        true
    }

    /// 逐分量取最小
    fn cmpt_min(self, other: Self) -> Self {
        let mut out = self;
        for d in 0..Self::N_COMPONENTS {
            out.set_component(d, self.component(d).min(other.component(d)));
        }
        out
    }

    /// 逐分量取最大
    fn cmpt_max(self, other: Self) -> Self {
        let mut out = self;
        for d in 0..Self::N_COMPONENTS {
            out.set_component(d, self.component(d).max(other.component(d)));
        }
        out
    }

    /// 所有分量
    fn components(&self) -> Vec<f64> {
        (0..Self::N_COMPONENTS).map(|d| self.component(d)).collect()
    }

    /// 从 JSON 读取：标量为数值，矢量/张量为数组
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) if Self::N_COMPONENTS == 1 => n.as_f64().and_then(|v| Self::from_components(&[v])),
            Value::Array(items) => {
                let comps = items.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>()?;
                Self::from_components(&comps)
            }
            _ => None,
        }
    }

    /// 转为 JSON
    fn to_json(&self) -> Value {
        if Self::N_COMPONENTS == 1 {
            Value::from(self.component(0))
        } else {
            Value::from(self.components())
        }
    }
}

/// 可求梯度的场值
///
/// 梯度约定 `(∇φ)_ij = ∂φ_j/∂x_i`，面积分中 `S_f ⊗ φ_f`。
pub trait Gradient: FieldValue {
    /// 梯度类型
    type Grad: FieldValue;

    /// 外积 `s ⊗ value`
    fn outer(s: DVec3, value: Self) -> Self::Grad;

    /// 方向导数 `d · grad`
    fn directional(d: DVec3, grad: &Self::Grad) -> Self;
}

// ============================================================
// 标量
// ============================================================

impl FieldValue for f64 {
    const ZERO: Self = 0.0;
    const N_COMPONENTS: usize = 1;
    const CLASS_NAME: &'static str = "scalar";
    const BOUNDARY_CATEGORY: &'static str = "scalarBoundaryCondition";

    #[inline]
    fn component(&self, _d: usize) -> f64 {
        *self
    }

    #[inline]
    fn set_component(&mut self, _d: usize, value: f64) {
        *self = value;
    }

    fn from_components(components: &[f64]) -> Option<Self> {
        match components {
            [v] => Some(*v),
            _ => None,
        }
    }

    #[inline]
    fn mag(&self) -> f64 {
        self.abs()
    }

    #[inline]
    fn mag_sqr(&self) -> f64 {
        self * self
    }
}

impl Gradient for f64 {
    type Grad = DVec3;

    #[inline]
    fn outer(s: DVec3, value: Self) -> DVec3 {
        s * value
    }

    #[inline]
    fn directional(d: DVec3, grad: &DVec3) -> Self {
        d.dot(*grad)
    }
}

// ============================================================
// 矢量
// ============================================================

impl FieldValue for DVec3 {
    const ZERO: Self = DVec3::ZERO;
    const N_COMPONENTS: usize = 3;
    const CLASS_NAME: &'static str = "vector";
    const BOUNDARY_CATEGORY: &'static str = "vectorBoundaryCondition";

    #[inline]
    fn component(&self, d: usize) -> f64 {
        self[d]
    }

    #[inline]
    fn set_component(&mut self, d: usize, value: f64) {
        self[d] = value;
    }

    fn from_components(components: &[f64]) -> Option<Self> {
        match components {
            [x, y, z] => Some(DVec3::new(*x, *y, *z)),
            _ => None,
        }
    }

    #[inline]
    fn mag(&self) -> f64 {
        self.length()
    }

    #[inline]
    fn mag_sqr(&self) -> f64 {
        self.length_squared()
    }

    #[inline]
    fn component_is_solved(d: usize, solution_d: [bool; 3]) -> bool {
        solution_d[d]
    }
}

impl Gradient for DVec3 {
    type Grad = DMat3;

    #[inline]
    fn outer(s: DVec3, value: Self) -> DMat3 {
        // 第 j 列为 s·v_j，元素 (i, j) = s_i·v_j
        DMat3::from_cols(s * value.x, s * value.y, s * value.z)
    }

    #[inline]
    fn directional(d: DVec3, grad: &DMat3) -> Self {
        // Σ_i d_i·T_ij
        grad.transpose() * d
    }
}

// ============================================================
// 张量
// ============================================================

impl FieldValue for DMat3 {
    const ZERO: Self = DMat3::ZERO;
    const N_COMPONENTS: usize = 9;
    const CLASS_NAME: &'static str = "tensor";
    const BOUNDARY_CATEGORY: &'static str = "tensorBoundaryCondition";

    #[inline]
    fn component(&self, d: usize) -> f64 {
        self.col(d % 3)[d / 3]
    }

    #[inline]
    fn set_component(&mut self, d: usize, value: f64) {
        self.col_mut(d % 3)[d / 3] = value;
    }

    fn from_components(components: &[f64]) -> Option<Self> {
        let row_major: [f64; 9] = components.try_into().ok()?;
        Some(DMat3::from_cols_array(&row_major).transpose())
    }

    #[inline]
    fn mag(&self) -> f64 {
        self.mag_sqr().sqrt()
    }

    #[inline]
    fn mag_sqr(&self) -> f64 {
        self.to_cols_array().iter().map(|v| v * v).sum()
    }
}

/// 张量辅助函数
pub mod tensor {
    use glam::DMat3;

    /// 对称部分 `(T + Tᵀ)/2`
    #[inline]
    pub fn symm(t: &DMat3) -> DMat3 {
        (*t + t.transpose()) * 0.5
    }

    /// 迹
    #[inline]
    pub fn trace(t: &DMat3) -> f64 {
        t.x_axis.x + t.y_axis.y + t.z_axis.z
    }

    /// `T - (2/3)·tr(T)·I`
    #[inline]
    pub fn dev2(t: &DMat3) -> DMat3 {
        *t - DMat3::IDENTITY * (2.0 / 3.0 * trace(t))
    }

    /// `T - (1/3)·tr(T)·I`
    #[inline]
    pub fn dev(t: &DMat3) -> DMat3 {
        *t - DMat3::IDENTITY * (trace(t) / 3.0)
    }
}
