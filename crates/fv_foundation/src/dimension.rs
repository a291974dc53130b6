// crates/fv_foundation/src/dimension.rs

//! 物理量纲系统
//!
//! 以 SI 七个基本量的指数向量表示物理量纲，运行时检查加减运算的量纲一致性，
//! 乘除运算按量纲代数规则组合。
//!
//! # 基本量顺序
//!
//! ```text
//! [质量 长度 时间 温度 物质的量 电流 发光强度]
//! [kg   m    s    K    mol      A    cd      ]
//! ```
//!
//! # 用法
//!
//! ```
//! use fv_foundation::dimension::DimensionSet;
//!
//! let velocity = DimensionSet::LENGTH / DimensionSet::TIME;
//! assert_eq!(velocity, DimensionSet::VELOCITY);
//! assert!(velocity.check_same(&DimensionSet::PRESSURE, "U + p").is_err());
//! ```

use crate::error::{FvError, FvResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

/// 基本量数量
pub const N_BASE_DIMENSIONS: usize = 7;

/// 指数比较容差
const SMALL_EXPONENT: f64 = 1e-10;

/// 物理量纲（七个 SI 基本量的指数）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimensionSet {
    exponents: [f64; N_BASE_DIMENSIONS],
}

impl DimensionSet {
    /// 无量纲
    pub const DIMLESS: Self = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 质量 [kg]
    pub const MASS: Self = Self::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 长度 [m]
    pub const LENGTH: Self = Self::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 时间 [s]
    pub const TIME: Self = Self::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
    /// 温度 [K]
    pub const TEMPERATURE: Self = Self::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0);
    /// 物质的量 [mol]
    pub const MOLES: Self = Self::new(0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    /// 电流 [A]
    pub const CURRENT: Self = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
    /// 发光强度 [cd]
    pub const LUMINOUS_INTENSITY: Self = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0);

    /// 面积 [m²]
    pub const AREA: Self = Self::new(0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 体积 [m³]
    pub const VOLUME: Self = Self::new(0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 速度 [m/s]
    pub const VELOCITY: Self = Self::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0);
    /// 加速度 [m/s²]
    pub const ACCELERATION: Self = Self::new(0.0, 1.0, -2.0, 0.0, 0.0, 0.0, 0.0);
    /// 密度 [kg/m³]
    pub const DENSITY: Self = Self::new(1.0, -3.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 压强 [kg/(m·s²)]
    pub const PRESSURE: Self = Self::new(1.0, -1.0, -2.0, 0.0, 0.0, 0.0, 0.0);
    /// 运动压强 p/ρ [m²/s²]
    pub const KINEMATIC_PRESSURE: Self = Self::new(0.0, 2.0, -2.0, 0.0, 0.0, 0.0, 0.0);
    /// 运动黏度 [m²/s]
    pub const KINEMATIC_VISCOSITY: Self = Self::new(0.0, 2.0, -1.0, 0.0, 0.0, 0.0, 0.0);
    /// 动力黏度 [kg/(m·s)]
    pub const DYNAMIC_VISCOSITY: Self = Self::new(1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 0.0);
    /// 体积通量 [m³/s]
    pub const VOLUMETRIC_FLUX: Self = Self::new(0.0, 3.0, -1.0, 0.0, 0.0, 0.0, 0.0);
    /// 质量通量 [kg/s]
    pub const MASS_FLUX: Self = Self::new(1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0);

    /// 按基本量顺序创建
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        mass: f64,
        length: f64,
        time: f64,
        temperature: f64,
        moles: f64,
        current: f64,
        luminous_intensity: f64,
    ) -> Self {
        Self {
            exponents: [
                mass,
                length,
                time,
                temperature,
                moles,
                current,
                luminous_intensity,
            ],
        }
    }

    /// 从指数数组创建
    pub const fn from_exponents(exponents: [f64; N_BASE_DIMENSIONS]) -> Self {
        Self { exponents }
    }

    /// 指数数组
    #[inline]
    pub fn exponents(&self) -> &[f64; N_BASE_DIMENSIONS] {
        &self.exponents
    }

    /// 是否无量纲
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMLESS
    }

    /// 幂运算
    pub fn pow(&self, n: f64) -> Self {
        let mut exponents = self.exponents;
        for e in &mut exponents {
            *e *= n;
        }
        Self { exponents }
    }

    /// 平方根
    pub fn sqrt(&self) -> Self {
        self.pow(0.5)
    }

    /// 倒数
    pub fn inv(&self) -> Self {
        self.pow(-1.0)
    }

    /// 检查两个量纲相同，用于加、减、比较和赋值
    ///
    /// `operation` 仅用于错误信息。
    pub fn check_same(&self, other: &Self, operation: &str) -> FvResult<Self> {
        if self == other {
            Ok(*self)
        } else {
            Err(FvError::dimension_mismatch(operation, self, other))
        }
    }

    /// 检查无量纲（超越函数的参数）
    pub fn check_dimensionless(&self, operation: &str) -> FvResult<()> {
        self.check_same(&Self::DIMLESS, operation).map(|_| ())
    }
}

impl Default for DimensionSet {
    fn default() -> Self {
        Self::DIMLESS
    }
}

impl PartialEq for DimensionSet {
    fn eq(&self, other: &Self) -> bool {
        self.exponents
            .iter()
            .zip(other.exponents.iter())
            .all(|(a, b)| (a - b).abs() < SMALL_EXPONENT)
    }
}

impl Mul for DimensionSet {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut exponents = self.exponents;
        for (e, r) in exponents.iter_mut().zip(rhs.exponents.iter()) {
            *e += r;
        }
        Self { exponents }
    }
}

impl Div for DimensionSet {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        let mut exponents = self.exponents;
        for (e, r) in exponents.iter_mut().zip(rhs.exponents.iter()) {
            *e -= r;
        }
        Self { exponents }
    }
}

impl fmt::Display for DimensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.exponents.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            // 整数指数不带小数点
            if (e - e.round()).abs() < SMALL_EXPONENT {
                write!(f, "{}", e.round() as i64)?;
            } else {
                write!(f, "{}", e)?;
            }
        }
        write!(f, "]")
    }
}

impl FromStr for DimensionSet {
    type Err = FvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| FvError::invalid_input(format!("量纲必须写成 [..] 形式: {s}")))?;

        let values: Vec<f64> = inner
            .split_whitespace()
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| FvError::invalid_input(format!("无效的量纲指数 '{t}'")))
            })
            .collect::<FvResult<_>>()?;

        // 允许只写前五个基本量
        if values.len() != N_BASE_DIMENSIONS && values.len() != 5 {
            return Err(FvError::size_mismatch("dimensions", N_BASE_DIMENSIONS, values.len()));
        }
        let mut exponents = [0.0; N_BASE_DIMENSIONS];
        exponents[..values.len()].copy_from_slice(&values);
        Ok(Self { exponents })
    }
}

// ============================================================
// 带量纲标量
// ============================================================

/// 带量纲的标量常数（例如黏度 `nu`、时间步长 `deltaT`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionedScalar {
    /// 名称
    pub name: String,
    /// 量纲
    pub dimensions: DimensionSet,
    /// 数值
    pub value: f64,
}

impl DimensionedScalar {
    /// 创建带量纲标量
    pub fn new(name: impl Into<String>, dimensions: DimensionSet, value: f64) -> Self {
        Self {
            name: name.into(),
            dimensions,
            value,
        }
    }

    /// 无量纲常数
    pub fn dimless(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, DimensionSet::DIMLESS, value)
    }

    /// 带量纲检查的加法
    pub fn try_add(&self, other: &Self) -> FvResult<Self> {
        let op = format!("{} + {}", self.name, other.name);
        let dimensions = self.dimensions.check_same(&other.dimensions, &op)?;
        Ok(Self::new(op, dimensions, self.value + other.value))
    }

    /// 带量纲检查的减法
    pub fn try_sub(&self, other: &Self) -> FvResult<Self> {
        let op = format!("{} - {}", self.name, other.name);
        let dimensions = self.dimensions.check_same(&other.dimensions, &op)?;
        Ok(Self::new(op, dimensions, self.value - other.value))
    }
}

impl Mul for &DimensionedScalar {
    type Output = DimensionedScalar;

    fn mul(self, rhs: Self) -> DimensionedScalar {
        DimensionedScalar::new(
            format!("{}*{}", self.name, rhs.name),
            self.dimensions * rhs.dimensions,
            self.value * rhs.value,
        )
    }
}

impl Div for &DimensionedScalar {
    type Output = DimensionedScalar;

    fn div(self, rhs: Self) -> DimensionedScalar {
        DimensionedScalar::new(
            format!("{}|{}", self.name, rhs.name),
            self.dimensions / rhs.dimensions,
            self.value / rhs.value,
        )
    }
}

impl fmt::Display for DimensionedScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.dimensions, self.value)
    }
}
