// crates/fv_mesh/src/mesh.rs

//! 有限体积网格
//!
//! 在原始拓扑与几何（owner/neighbour、面积矢量、面中心、单元中心、体积、面片）
//! 之上预先计算离散所需的导出量：
//!
//! - 插值权重 `w`：面值 = `w·φ_P + (1-w)·φ_N`，非耦合边界面为 1
//! - 中心距矢量 `d`：内部面 `C_N - C_P`，边界面 `C_f - C_P`
//! - `delta_coeffs`：`1/|d|`
//! - `non_orth_delta_coeffs`：`1/max(n·d, 0.05|d|)`
//! - 非正交修正矢量：`n - d·non_orth_delta_coeff`
//! - LDU 寻址：`lower_addr`（owner）、`upper_addr`（neighbour）
//!
//! # 使用示例
//!
//! ```ignore
//! let mesh = StructuredBlock::line(10, 1.0).build()?;
//! for face in 0..mesh.n_internal_faces() {
//!     let (p, n) = (mesh.lower_addr()[face], mesh.upper_addr()[face]);
//!     let w = mesh.weights()[face];
//!     // ...
//! }
//! ```

use crate::geometry::{cell_centres_and_volumes, face_centre_and_area};
use crate::patch::{BoundaryPatch, PatchKind};
use crate::traits::MeshTopology;
use fv_foundation::error::{FvError, FvResult};
use fv_foundation::float::VSMALL;
use glam::DVec3;
use std::collections::HashSet;

/// `n·d` 相对 `|d|` 的下限，防止高度非正交面的系数发散
const NON_ORTH_DELTA_LIMIT: f64 = 0.05;

/// 有限体积网格
#[derive(Debug, Clone)]
pub struct FvMesh {
    // 原始数据
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    sf: Vec<DVec3>,
    cf: Vec<DVec3>,
    c: Vec<DVec3>,
    v: Vec<f64>,
    patches: Vec<BoundaryPatch>,

    // 导出数据
    mag_sf: Vec<f64>,
    weights: Vec<f64>,
    delta: Vec<DVec3>,
    delta_coeffs: Vec<f64>,
    non_orth_delta_coeffs: Vec<f64>,
    non_orth_correction: Vec<DVec3>,
    cell_face_ptr: Vec<usize>,
    cell_face_idx: Vec<usize>,
    solution_d: [bool; 3],
}

impl FvMesh {
    /// 从原始拓扑与几何构造
    ///
    /// 要求：内部面在前且 `owner < neighbour`；面片按起始面号连续覆盖所有边界面；
    /// 单元体积为正；面片名唯一。
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        face_area_vectors: Vec<DVec3>,
        face_centres: Vec<DVec3>,
        cell_centres: Vec<DVec3>,
        cell_volumes: Vec<f64>,
        mut patches: Vec<BoundaryPatch>,
    ) -> FvResult<Self> {
        let n_faces = owner.len();
        let n_internal = neighbour.len();
        let n_cells = cell_centres.len();

        FvError::check_size("faceAreaVectors", n_faces, face_area_vectors.len())?;
        FvError::check_size("faceCentres", n_faces, face_centres.len())?;
        FvError::check_size("cellVolumes", n_cells, cell_volumes.len())?;
        if n_internal > n_faces {
            return Err(FvError::invalid_mesh(format!(
                "内部面数 {n_internal} 超过总面数 {n_faces}"
            )));
        }

        for (f, &o) in owner.iter().enumerate() {
            if o >= n_cells {
                return Err(FvError::invalid_mesh(format!("面 {f} 的 owner {o} 越界")));
            }
        }
        for (f, &nb) in neighbour.iter().enumerate() {
            if nb >= n_cells {
                return Err(FvError::invalid_mesh(format!("面 {f} 的 neighbour {nb} 越界")));
            }
            if owner[f] >= nb {
                return Err(FvError::invalid_mesh(format!(
                    "内部面 {f} 要求 owner < neighbour，实际 {} >= {nb}",
                    owner[f]
                )));
            }
        }
        for (cell, &vol) in cell_volumes.iter().enumerate() {
            if vol.is_nan() || vol <= 0.0 {
                return Err(FvError::invalid_mesh(format!("单元 {cell} 体积非正: {vol}")));
            }
        }

        // 面片连续覆盖边界面
        patches.sort_by_key(|p| p.start);
        let mut names = HashSet::new();
        let mut expected_start = n_internal;
        for (i, patch) in patches.iter_mut().enumerate() {
            if !names.insert(patch.name.clone()) {
                return Err(FvError::invalid_mesh(format!("面片名重复: {}", patch.name)));
            }
            if patch.start != expected_start {
                return Err(FvError::invalid_mesh(format!(
                    "面片 {} 起始面 {} 不连续，期望 {expected_start}",
                    patch.name, patch.start
                )));
            }
            patch.index = i;
            expected_start += patch.size;
        }
        if expected_start != n_faces {
            return Err(FvError::invalid_mesh(format!(
                "面片覆盖到面 {expected_start}，总面数 {n_faces}"
            )));
        }

        let mut mesh = Self {
            owner,
            neighbour,
            sf: face_area_vectors,
            cf: face_centres,
            c: cell_centres,
            v: cell_volumes,
            patches,
            mag_sf: Vec::new(),
            weights: Vec::new(),
            delta: Vec::new(),
            delta_coeffs: Vec::new(),
            non_orth_delta_coeffs: Vec::new(),
            non_orth_correction: Vec::new(),
            cell_face_ptr: Vec::new(),
            cell_face_idx: Vec::new(),
            solution_d: [true; 3],
        };
        mesh.calc_geometry();
        mesh.calc_cell_faces();
        mesh.calc_solution_directions();

        log::debug!(
            "网格: {} 单元, {} 面 ({} 内部), {} 面片, 求解方向 {:?}",
            mesh.n_cells(),
            mesh.n_faces(),
            mesh.n_internal_faces(),
            mesh.patches.len(),
            mesh.solution_d
        );
        Ok(mesh)
    }

    /// 由节点坐标和面节点列表构造，几何量由多面体剖分计算
    pub fn from_polyhedra(
        points: &[DVec3],
        faces: &[Vec<usize>],
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<BoundaryPatch>,
    ) -> FvResult<Self> {
        FvError::check_size("faces", owner.len(), faces.len())?;
        for (f, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(FvError::invalid_mesh(format!("面 {f} 少于 3 个节点")));
            }
            if let Some(&p) = face.iter().find(|&&p| p >= points.len()) {
                return Err(FvError::invalid_mesh(format!("面 {f} 引用了不存在的节点 {p}")));
            }
        }

        let (cf, sf): (Vec<DVec3>, Vec<DVec3>) = faces
            .iter()
            .map(|face| face_centre_and_area(points, face))
            .unzip();

        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .max()
            .map_or(0, |&m| m + 1);
        let (c, v) = cell_centres_and_volumes(n_cells, &owner, &neighbour, &cf, &sf);

        Self::new(owner, neighbour, sf, cf, c, v, patches)
    }

    /// 从任意网格拓扑提供者复制
    pub fn from_topology<M: MeshTopology + ?Sized>(topology: &M) -> FvResult<Self> {
        let n_faces = topology.n_faces();
        let n_internal = topology.n_internal_faces();
        let owner = (0..n_faces).map(|f| topology.owner(f)).collect();
        let neighbour = (0..n_internal)
            .map(|f| {
                topology
                    .neighbour(f)
                    .ok_or_else(|| FvError::invalid_mesh(format!("内部面 {f} 缺少 neighbour")))
            })
            .collect::<FvResult<Vec<_>>>()?;
        let sf = (0..n_faces).map(|f| topology.face_area_vector(f)).collect();
        let cf = (0..n_faces).map(|f| topology.face_centre(f)).collect();
        let c = (0..topology.n_cells()).map(|i| topology.cell_centre(i)).collect();
        let v = (0..topology.n_cells()).map(|i| topology.cell_volume(i)).collect();
        Self::new(owner, neighbour, sf, cf, c, v, topology.patches().to_vec())
    }

    // ========================================================================
    // 导出量计算
    // ========================================================================

    fn calc_geometry(&mut self) {
        let n_faces = self.n_faces();
        let n_internal = self.n_internal_faces();

        self.mag_sf = self.sf.iter().map(|s| s.length()).collect();
        self.weights = vec![1.0; n_faces];
        self.delta = vec![DVec3::ZERO; n_faces];
        self.delta_coeffs = vec![0.0; n_faces];
        self.non_orth_delta_coeffs = vec![0.0; n_faces];
        self.non_orth_correction = vec![DVec3::ZERO; n_faces];

        for f in 0..n_internal {
            let cp = self.c[self.owner[f]];
            let cn = self.c[self.neighbour[f]];
            self.set_face_geometry(f, cp, cn, true);
        }

        for pi in 0..self.patches.len() {
            let coupled = self.patches[pi].kind.is_coupled();
            for f in self.patches[pi].faces() {
                let cp = self.c[self.owner[f]];
                if coupled {
                    // 未提供邻侧几何时按镜像单元处理
                    let cn = 2.0 * self.cf[f] - cp;
                    self.set_face_geometry(f, cp, cn, true);
                } else {
                    self.set_face_geometry(f, cp, self.cf[f], false);
                }
            }
        }
    }

    fn set_face_geometry(&mut self, f: usize, cp: DVec3, cn: DVec3, interpolated: bool) {
        let n = self.sf[f] / self.mag_sf[f].max(VSMALL);
        let d = cn - cp;
        let mag_d = d.length().max(VSMALL);

        if interpolated {
            let sfd_own = n.dot(self.cf[f] - cp).abs();
            let sfd_nei = n.dot(cn - self.cf[f]).abs();
            self.weights[f] = if sfd_own + sfd_nei > VSMALL {
                sfd_nei / (sfd_own + sfd_nei)
            } else {
                0.5
            };
        } else {
            self.weights[f] = 1.0;
        }

        let non_orth = 1.0 / n.dot(d).max(NON_ORTH_DELTA_LIMIT * mag_d);
        self.delta[f] = d;
        self.delta_coeffs[f] = 1.0 / mag_d;
        self.non_orth_delta_coeffs[f] = non_orth;
        self.non_orth_correction[f] = if interpolated {
            n - d * non_orth
        } else {
            DVec3::ZERO
        };
    }

    fn calc_cell_faces(&mut self) {
        let n_cells = self.n_cells();
        let mut count = vec![0usize; n_cells];
        for &o in &self.owner {
            count[o] += 1;
        }
        for &nb in &self.neighbour {
            count[nb] += 1;
        }

        let mut ptr = Vec::with_capacity(n_cells + 1);
        ptr.push(0);
        let mut total = 0;
        for &c in &count {
            total += c;
            ptr.push(total);
        }

        let mut idx = vec![0usize; total];
        let mut pos = ptr[..n_cells].to_vec();
        for (f, &o) in self.owner.iter().enumerate() {
            idx[pos[o]] = f;
            pos[o] += 1;
        }
        for (f, &nb) in self.neighbour.iter().enumerate() {
            idx[pos[nb]] = f;
            pos[nb] += 1;
        }
        self.cell_face_ptr = ptr;
        self.cell_face_idx = idx;
    }

    fn calc_solution_directions(&mut self) {
        let mut solution_d = [true; 3];
        for patch in self.patches.iter().filter(|p| p.is_empty_kind()) {
            let sum: DVec3 = patch.faces().map(|f| self.sf[f].abs()).sum();
            let total = sum.x + sum.y + sum.z;
            if total <= VSMALL {
                continue;
            }
            for (dir, comp) in [sum.x, sum.y, sum.z].iter().enumerate() {
                if *comp / total > 0.5 {
                    solution_d[dir] = false;
                }
            }
        }
        self.solution_d = solution_d;
    }

    /// 为耦合面片设置邻侧单元中心，重新计算该面片的权重和距离系数
    pub fn set_coupled_neighbour_centres(
        &mut self,
        patch_index: usize,
        neighbour_centres: &[DVec3],
    ) -> FvResult<()> {
        let patch = self
            .patches
            .get(patch_index)
            .ok_or_else(|| FvError::invalid_input(format!("面片序号 {patch_index} 越界")))?
            .clone();
        if !patch.kind.is_coupled() {
            return Err(FvError::mesh_consistency(format!(
                "面片 {} 不是耦合面片，不能设置邻侧几何",
                patch.name
            )));
        }
        FvError::check_size(&patch.name, patch.size, neighbour_centres.len())?;
        for (i, f) in patch.faces().enumerate() {
            let cp = self.c[self.owner[f]];
            self.set_face_geometry(f, cp, neighbour_centres[i], true);
        }
        Ok(())
    }

    // ========================================================================
    // 基本信息
    // ========================================================================

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.c.len()
    }

    /// 面数
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.owner.len()
    }

    /// 内部面数
    #[inline]
    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    /// 是否为内部面
    #[inline]
    pub fn is_internal_face(&self, face: usize) -> bool {
        face < self.neighbour.len()
    }

    // ========================================================================
    // 寻址
    // ========================================================================

    /// 所有面的 owner
    #[inline]
    pub fn owner_addr(&self) -> &[usize] {
        &self.owner
    }

    /// 内部面的 neighbour
    #[inline]
    pub fn neighbour_addr(&self) -> &[usize] {
        &self.neighbour
    }

    /// LDU 下三角寻址（内部面 owner）
    #[inline]
    pub fn lower_addr(&self) -> &[usize] {
        &self.owner[..self.neighbour.len()]
    }

    /// LDU 上三角寻址（内部面 neighbour）
    #[inline]
    pub fn upper_addr(&self) -> &[usize] {
        &self.neighbour
    }

    /// 单元的面列表
    #[inline]
    pub fn cell_faces(&self, cell: usize) -> &[usize] {
        &self.cell_face_idx[self.cell_face_ptr[cell]..self.cell_face_ptr[cell + 1]]
    }

    /// 面片每个面的 owner 单元
    #[inline]
    pub fn patch_face_cells(&self, patch: usize) -> &[usize] {
        &self.owner[self.patches[patch].faces()]
    }

    // ========================================================================
    // 几何
    // ========================================================================

    /// 面积矢量
    #[inline]
    pub fn sf(&self) -> &[DVec3] {
        &self.sf
    }

    /// 面积
    #[inline]
    pub fn mag_sf(&self) -> &[f64] {
        &self.mag_sf
    }

    /// 面中心
    #[inline]
    pub fn cf(&self) -> &[DVec3] {
        &self.cf
    }

    /// 单元中心
    #[inline]
    pub fn c(&self) -> &[DVec3] {
        &self.c
    }

    /// 单元体积
    #[inline]
    pub fn v(&self) -> &[f64] {
        &self.v
    }

    /// 插值权重
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// 中心距矢量
    #[inline]
    pub fn delta(&self) -> &[DVec3] {
        &self.delta
    }

    /// `1/|d|`
    #[inline]
    pub fn delta_coeffs(&self) -> &[f64] {
        &self.delta_coeffs
    }

    /// `1/(n·d)`，用于面法向梯度
    #[inline]
    pub fn non_orth_delta_coeffs(&self) -> &[f64] {
        &self.non_orth_delta_coeffs
    }

    /// 非正交修正矢量
    #[inline]
    pub fn non_orth_correction_vectors(&self) -> &[DVec3] {
        &self.non_orth_correction
    }

    /// 总体积
    pub fn total_volume(&self) -> f64 {
        self.v.iter().sum()
    }

    /// 是否存在非正交修正（任一修正矢量非零）
    pub fn is_non_orthogonal(&self) -> bool {
        self.non_orth_correction
            .iter()
            .any(|k| k.length_squared() > 1e-20)
    }

    // ========================================================================
    // 面片与维数
    // ========================================================================

    /// 边界面片
    #[inline]
    pub fn patches(&self) -> &[BoundaryPatch] {
        &self.patches
    }

    /// 按名称查找面片序号
    pub fn patch_index(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    /// 求解方向（空面片法向的方向不求解）
    #[inline]
    pub fn solution_d(&self) -> [bool; 3] {
        self.solution_d
    }

    /// 求解方向数（1、2 或 3）
    #[inline]
    pub fn n_solution_d(&self) -> usize {
        self.solution_d.iter().filter(|&&d| d).count()
    }

    /// 面片所属类型
    pub fn patch_kind(&self, patch: usize) -> PatchKind {
        self.patches[patch].kind
    }
}

impl MeshTopology for FvMesh {
    fn n_cells(&self) -> usize {
        self.c.len()
    }

    fn n_faces(&self) -> usize {
        self.owner.len()
    }

    fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    fn owner(&self, face: usize) -> usize {
        self.owner[face]
    }

    fn neighbour(&self, face: usize) -> Option<usize> {
        self.neighbour.get(face).copied()
    }

    fn face_area_vector(&self, face: usize) -> DVec3 {
        self.sf[face]
    }

    fn face_centre(&self, face: usize) -> DVec3 {
        self.cf[face]
    }

    fn cell_centre(&self, cell: usize) -> DVec3 {
        self.c[cell]
    }

    fn cell_volume(&self, cell: usize) -> f64 {
        self.v[cell]
    }

    fn patches(&self) -> &[BoundaryPatch] {
        &self.patches
    }
}
