// crates/fv_physics/src/control/mod.rs

//! 时间与求解控制
//!
//! - [`time`]: 时间状态
//! - [`solution_control`]: 外迭代与残差控制

pub mod solution_control;
pub mod time;

pub use solution_control::{IterationResiduals, SolutionControl};
pub use time::TimeState;
