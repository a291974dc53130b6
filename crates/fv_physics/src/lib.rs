// crates/fv_physics/src/lib.rs

//! 有限体积物理层
//!
//! 在非结构多面体网格上离散输运方程，并在运行时按名称选择模型：
//! - 场与边界条件 (field, boundary)
//! - 隐式离散 (fvm) - 时间项、对流、扩散、源项组装为 [`FvMatrix`]
//! - 显式计算 (fvc) - 梯度、散度、面法向梯度、插值
//! - 方程矩阵与线性求解 (matrix, numerics)
//! - 运行时模型选择 (registry, models)
//! - 外迭代与时间控制 (control)
//! - 算例上下文 (case)
//!
//! # 层级架构
//!
//! ```text
//! case     ─> 持有网格、配置、注册表、场和时间
//! models   ─> 粘度、湍流、曳力模型
//! fvm/fvc  ─> 离散算子
//! matrix   ─> FvMatrix / LduMatrix / 求解
//! field    ─> VolField, SurfaceField, 边界条件
//! numerics ─> 插值、限制器、梯度、CSR 与迭代求解器
//! ```
//!
//! # 示例
//!
//! ```
//! use fv_config::{FvSchemes, FvSolution};
//! use fv_foundation::DimensionSet;
//! use fv_mesh::StructuredBlock;
//! use fv_physics::prelude::*;
//!
//! let mesh = StructuredBlock::line(4, 1.0).build().unwrap();
//! let case = Case::new(mesh, FvSchemes::default(), FvSolution::default(), TimeState::default()).unwrap();
//! let t = VolField::uniform("T", case.mesh(), DimensionSet::TEMPERATURE, 1.0).unwrap();
//! let eqn = fvm::laplacian(&case.context(), &DimensionedScalar::new("DT", DimensionSet::KINEMATIC_VISCOSITY, 1.0), &t).unwrap();
//! assert_eq!(eqn.dimensions(), DimensionSet::TEMPERATURE * DimensionSet::KINEMATIC_VISCOSITY * DimensionSet::LENGTH);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boundary;
pub mod case;
pub mod context;
pub mod control;
pub mod field;
pub mod fvc;
pub mod fvm;
pub mod matrix;
pub mod models;
pub mod numerics;
pub mod registry;

// 重导出常用类型
pub use boundary::{BoundaryCondition, PatchField, PatchGeometry};
pub use case::Case;
pub use context::FvContext;
pub use control::{IterationResiduals, SolutionControl, TimeState};
pub use field::{
    FieldRecord, FieldRegistry, FieldValue, SurfaceField, SurfaceScalarField, VolField,
    VolScalarField, VolTensorField, VolVectorField,
};
pub use matrix::{FvMatrix, LduMatrix, SolverPerformance};
pub use registry::{ModelCategory, ModelContext, ModelRegistry};

/// Prelude 模块，包含常用类型
pub mod prelude {
    pub use crate::boundary::BoundaryCondition;
    pub use crate::case::Case;
    pub use crate::context::FvContext;
    pub use crate::control::{SolutionControl, TimeState};
    pub use crate::field::{FieldRegistry, FieldValue, SurfaceField, VolField};
    pub use crate::matrix::{FvMatrix, SolverPerformance};
    pub use crate::models::register_builtin_models;
    pub use crate::registry::{ModelContext, ModelRegistry};
    pub use crate::{fvc, fvm};
    pub use fv_foundation::prelude::*;
}
