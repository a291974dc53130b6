// crates/fv_physics/src/fvm/mod.rs

//! 隐式离散算子
//!
//! 每个函数返回一个 [`FvMatrix`](crate::matrix::FvMatrix)，表示 `A·ψ - b`，
//! 量纲为 `[被离散量]·[体积]`。矩阵用 `+`、`-`、`eq_*` 组合成方程：
//!
//! ```text
//! let eqn = (fvm::ddt(&ctx, &t)? + fvm::div(&ctx, &phi, &t)?)?
//!     .eq_matrix(&fvm::laplacian(&ctx, &dt, &t)?)?;
//! ```
//!
//! 格式按项名（`div(phi,T)`、`laplacian(DT,T)`）从 `fvSchemes` 读取。

pub mod convection;
pub mod ddt;
pub mod laplacian;
pub mod source;

pub use convection::{div, div_term_name, div_with};
pub use ddt::{ddt, ddt_coeff, DdtCoefficients};
pub use laplacian::{laplacian, laplacian_term_name, laplacian_with, Diffusivity};
pub use source::{sp, su, su_sp, SourceCoeff};
