// crates/fv_physics/src/numerics/linear_algebra/mod.rs

//! 稀疏线性代数
//!
//! 方程矩阵导出的 CSR 系统在这里求解：
//!
//! - [`csr`]: CSR 矩阵与构建器
//! - [`vector_ops`]: 向量运算
//! - [`preconditioner`]: 预条件器
//! - [`solver`]: 迭代求解器与有限体积归一化残差

pub mod csr;
pub mod preconditioner;
pub mod solver;
pub mod vector_ops;

pub use csr::{CsrBuilder, CsrMatrix, CsrPattern, RowView};
pub use preconditioner::{
    build_preconditioner, IdentityPreconditioner, Ilu0Preconditioner, JacobiPreconditioner,
    Preconditioner,
};
pub use solver::{
    normalisation_factor, normalised_residual, solve_system, BiCgStabSolver, DiagonalSolver,
    IterativeSolver, PcgSolver, SmoothSolver, SolverConfig, SolverResult, SolverStatus,
};
