// crates/fv_physics/src/numerics/mod.rs

//! 数值方法
//!
//! - [`linear_algebra`]: CSR 矩阵、预条件器与迭代求解器
//! - [`interpolation`]: 单元到面的插值与对流格式权重
//! - [`limiter`]: TVD 限制器
//! - [`gradient`]: Green-Gauss 梯度

pub mod gradient;
pub mod interpolation;
pub mod limiter;
pub mod linear_algebra;

pub use gradient::{gauss_grad, green_gauss};
pub use interpolation::{
    convection_weights, interpolate, interpolate_with, linear_upwind_correction, linear_weights,
    upwind_weights,
};
pub use limiter::{LimitedLinear, Limiter, Minmod, SuperBee, VanLeer};
