// crates/fv_config/src/lib.rs

//! 有限体积配置层
//!
//! 所有模型、边界条件和求解控制都从键值字典构造。本层只负责读取和校验，
//! 不依赖网格或场。
//!
//! # 模块概览
//!
//! - [`dictionary`]: `Dictionary` 键值字典（JSON 承载，严格/宽松模式）
//! - [`schemes`]: `FvSchemes` 离散格式选择
//! - [`solution`]: `FvSolution` 线性求解器控制、外迭代控制和欠松弛因子
//!
//! # 层级架构
//!
//! ```text
//! fv_physics  ─> 读取 FvSchemes / FvSolution，从 Dictionary 构造模型
//! fv_mesh
//! fv_config   ─> Dictionary, FvSchemes, FvSolution (本层)
//! fv_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dictionary;
pub mod schemes;
pub mod solution;

// 重导出核心类型
pub use dictionary::Dictionary;
pub use schemes::{ConvectionScheme, DdtScheme, DivScheme, FvSchemes, SnGradScheme};
pub use solution::{
    FvSolution, LinearSolverControls, LinearSolverKind, OuterLoopControls, PreconditionerKind,
    RelaxationFactors,
};
