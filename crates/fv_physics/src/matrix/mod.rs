// crates/fv_physics/src/matrix/mod.rs

//! 方程矩阵
//!
//! - [`ldu`]: 按面寻址的 LDU 系数存储
//! - [`fv_matrix`]: 带源项和边界系数的有限体积方程
//! - [`solve`]: 导出 CSR、残差与逐分量求解

pub mod fv_matrix;
pub mod ldu;
pub mod solve;

pub use fv_matrix::FvMatrix;
pub use ldu::LduMatrix;
pub use solve::{ComponentPerformance, SolverPerformance};
