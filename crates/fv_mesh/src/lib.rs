// crates/fv_mesh/src/lib.rs

//! 有限体积网格层
//!
//! 离散层只读地使用网格：单元与面的连接关系、面积矢量、体积以及按名称划分的
//! 边界面片。本层不负责网格生成（结构化块网格仅用于测试与简单算例），
//! 也不处理网格运动或拓扑变化。
//!
//! # 模块概览
//!
//! - [`traits`]: `MeshTopology` 网格拓扑接口
//! - [`patch`]: `BoundaryPatch`、`PatchKind`
//! - [`geometry`]: 多面体面/单元几何计算
//! - [`mesh`]: `FvMesh`，带插值权重、距离系数、非正交修正矢量与 LDU 寻址
//! - [`structured`]: 结构化块网格生成
//! - [`validation`]: 网格检查与维数断言

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod geometry;
pub mod mesh;
pub mod patch;
pub mod structured;
pub mod traits;
pub mod validation;

// 重导出核心类型
pub use mesh::FvMesh;
pub use patch::{BoundaryPatch, PatchKind};
pub use structured::StructuredBlock;
pub use traits::MeshTopology;
