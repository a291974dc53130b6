// crates/fv_foundation/src/lib.rs

//! 有限体积基础层
//!
//! 提供整个工作区共享的基础抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型 `FvError`
//! - [`dimension`]: 物理量纲 `DimensionSet` 与带量纲标量
//! - [`float`]: 数值常量和浮点辅助函数
//!
//! # 示例
//!
//! ```
//! use fv_foundation::prelude::*;
//!
//! let u = DimensionSet::VELOCITY;
//! let rho = DimensionSet::DENSITY;
//! assert_eq!(rho * u * u, DimensionSet::PRESSURE);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dimension;
pub mod error;
pub mod float;

// 重导出常用类型
pub use dimension::{DimensionSet, DimensionedScalar};
pub use error::{FvError, FvResult};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::dimension::{DimensionSet, DimensionedScalar};
    pub use crate::error::{FvError, FvResult};
    pub use crate::float::{safe_div, GREAT, ROOT_VSMALL, SMALL, VSMALL};
    pub use crate::{ensure, require};
}
