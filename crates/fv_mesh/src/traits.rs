// crates/fv_mesh/src/traits.rs

//! 网格拓扑抽象
//!
//! 离散层只读地使用网格。任何能提供以下信息的网格都可以通过
//! [`FvMesh::from_topology`](crate::FvMesh::from_topology) 接入。
//!
//! # 面编号约定
//!
//! - 内部面在前（`0..n_internal_faces`），边界面在后并按面片连续存放
//! - 面积矢量从 owner 指向 neighbour，边界面指向域外

use crate::patch::BoundaryPatch;
use glam::DVec3;

/// 网格拓扑 trait
pub trait MeshTopology: Send + Sync {
    // ========== 基本信息 ==========

    /// 单元数量
    fn n_cells(&self) -> usize;

    /// 面数量（内部面 + 边界面）
    fn n_faces(&self) -> usize;

    /// 内部面数量
    fn n_internal_faces(&self) -> usize;

    /// 边界面数量
    fn n_boundary_faces(&self) -> usize {
        self.n_faces() - self.n_internal_faces()
    }

    // ========== 连接关系 ==========

    /// 面的 owner 单元
    fn owner(&self, face: usize) -> usize;

    /// 面的 neighbour 单元，边界面为 None
    fn neighbour(&self, face: usize) -> Option<usize>;

    // ========== 几何数据 ==========

    /// 面积矢量（模为面积）
    fn face_area_vector(&self, face: usize) -> DVec3;

    /// 面中心
    fn face_centre(&self, face: usize) -> DVec3;

    /// 单元中心
    fn cell_centre(&self, cell: usize) -> DVec3;

    /// 单元体积
    fn cell_volume(&self, cell: usize) -> f64;

    // ========== 边界 ==========

    /// 边界面片
    fn patches(&self) -> &[BoundaryPatch];

    /// 按名称查找面片
    fn find_patch(&self, name: &str) -> Option<&BoundaryPatch> {
        self.patches().iter().find(|p| p.name == name)
    }
}
