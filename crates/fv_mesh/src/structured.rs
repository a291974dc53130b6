// crates/fv_mesh/src/structured.rs

//! 结构化块网格生成
//!
//! 生成 `nx × ny × nz` 六面体块网格，用于驱动测试与简单算例。
//! 支持非均匀坐标、几何渐变和内部节点扰动（产生非正交网格）。
//!
//! 面片固定为六个，顺序为 `left`(x-)、`right`(x+)、`bottom`(y-)、`top`(y+)、
//! `back`(z-)、`front`(z+)，类型可单独指定。
//!
//! # 使用示例
//!
//! ```
//! use fv_mesh::structured::StructuredBlock;
//!
//! // 10 个单元的一维网格，长度 1
//! let mesh = StructuredBlock::line(10, 1.0).build().unwrap();
//! assert_eq!(mesh.n_cells(), 10);
//! assert_eq!(mesh.n_solution_d(), 1);
//! ```

use crate::mesh::FvMesh;
use crate::patch::{BoundaryPatch, PatchKind};
use fv_foundation::error::{FvError, FvResult};
use glam::DVec3;

/// 六个面片的名称
pub const BLOCK_PATCH_NAMES: [&str; 6] = ["left", "right", "bottom", "top", "back", "front"];

/// 结构化块网格描述
#[derive(Debug, Clone)]
pub struct StructuredBlock {
    xs: Vec<f64>,
    ys: Vec<f64>,
    zs: Vec<f64>,
    kinds: [PatchKind; 6],
    distortion: f64,
}

impl StructuredBlock {
    /// 均匀块网格
    pub fn uniform(cells: [usize; 3], lengths: [f64; 3]) -> Self {
        let axis = |n: usize, l: f64| -> Vec<f64> {
            (0..=n).map(|i| l * i as f64 / n.max(1) as f64).collect()
        };
        Self::from_coordinates(
            axis(cells[0], lengths[0]),
            axis(cells[1], lengths[1]),
            axis(cells[2], lengths[2]),
        )
    }

    /// 由各方向节点坐标构造（必须严格递增）
    pub fn from_coordinates(xs: Vec<f64>, ys: Vec<f64>, zs: Vec<f64>) -> Self {
        Self {
            xs,
            ys,
            zs,
            kinds: [PatchKind::Wall; 6],
            distortion: 0.0,
        }
    }

    /// 一维网格：x 方向 `n` 个单元，其余四个面片为空面片
    pub fn line(n: usize, length: f64) -> Self {
        let dx = length / n.max(1) as f64;
        Self::uniform([n, 1, 1], [length, dx, dx])
            .with_patch_kind("left", PatchKind::Patch)
            .with_patch_kind("right", PatchKind::Patch)
            .with_patch_kind("bottom", PatchKind::Empty)
            .with_patch_kind("top", PatchKind::Empty)
            .with_patch_kind("back", PatchKind::Empty)
            .with_patch_kind("front", PatchKind::Empty)
    }

    /// 二维网格：z 方向一层，`back`/`front` 为空面片
    pub fn plane(nx: usize, ny: usize, lx: f64, ly: f64) -> Self {
        let dz = (lx / nx.max(1) as f64).min(ly / ny.max(1) as f64);
        Self::uniform([nx, ny, 1], [lx, ly, dz])
            .with_patch_kind("back", PatchKind::Empty)
            .with_patch_kind("front", PatchKind::Empty)
    }

    /// x 方向几何渐变，相邻单元长度比为 `ratio`
    pub fn graded_x(mut self, ratio: f64) -> Self {
        self.xs = graded_axis(&self.xs, ratio);
        self
    }

    /// 指定面片类型
    pub fn with_patch_kind(mut self, name: &str, kind: PatchKind) -> Self {
        if let Some(i) = BLOCK_PATCH_NAMES.iter().position(|n| *n == name) {
            self.kinds[i] = kind;
        }
        self
    }

    /// 扰动内部节点，幅度为当地单元尺寸的 `amplitude` 倍（应小于 0.3）
    ///
    /// 只在 x、y 方向移动内部节点，扰动是确定性的。
    pub fn distorted(mut self, amplitude: f64) -> Self {
        self.distortion = amplitude;
        self
    }

    /// 单元数
    pub fn n_cells(&self) -> [usize; 3] {
        [
            self.xs.len().saturating_sub(1),
            self.ys.len().saturating_sub(1),
            self.zs.len().saturating_sub(1),
        ]
    }

    /// 生成网格
    pub fn build(&self) -> FvResult<FvMesh> {
        let [nx, ny, nz] = self.n_cells();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(FvError::invalid_mesh("块网格每个方向至少需要一个单元"));
        }
        for (axis, coords) in [("x", &self.xs), ("y", &self.ys), ("z", &self.zs)] {
            if coords.windows(2).any(|w| w[1] <= w[0]) {
                return Err(FvError::invalid_mesh(format!("{axis} 方向节点坐标不是严格递增")));
            }
        }

        let points = self.points();
        let pt = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
        let cell = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);

        let mut faces: Vec<Vec<usize>> = Vec::new();
        let mut owner = Vec::new();
        let mut neighbour = Vec::new();

        // 内部面按 owner 递增、neighbour 递增排列
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let c = cell(i, j, k);
                    if i + 1 < nx {
                        faces.push(x_face(&pt, i + 1, j, k));
                        owner.push(c);
                        neighbour.push(cell(i + 1, j, k));
                    }
                    if j + 1 < ny {
                        faces.push(y_face(&pt, i, j + 1, k));
                        owner.push(c);
                        neighbour.push(cell(i, j + 1, k));
                    }
                    if k + 1 < nz {
                        faces.push(z_face(&pt, i, j, k + 1));
                        owner.push(c);
                        neighbour.push(cell(i, j, k + 1));
                    }
                }
            }
        }

        let mut left = Vec::new();
        let mut right = Vec::new();
        for k in 0..nz {
            for j in 0..ny {
                left.push((reversed(x_face(&pt, 0, j, k)), cell(0, j, k)));
                right.push((x_face(&pt, nx, j, k), cell(nx - 1, j, k)));
            }
        }
        let mut bottom = Vec::new();
        let mut top = Vec::new();
        for k in 0..nz {
            for i in 0..nx {
                bottom.push((reversed(y_face(&pt, i, 0, k)), cell(i, 0, k)));
                top.push((y_face(&pt, i, ny, k), cell(i, ny - 1, k)));
            }
        }
        let mut back = Vec::new();
        let mut front = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                back.push((reversed(z_face(&pt, i, j, 0)), cell(i, j, 0)));
                front.push((z_face(&pt, i, j, nz), cell(i, j, nz - 1)));
            }
        }

        let mut patches = Vec::with_capacity(6);
        for (index, group) in [left, right, bottom, top, back, front].into_iter().enumerate() {
            patches.push(BoundaryPatch::new(
                BLOCK_PATCH_NAMES[index],
                self.kinds[index],
                faces.len(),
                group.len(),
                index,
            ));
            for (face, o) in group {
                faces.push(face);
                owner.push(o);
            }
        }

        FvMesh::from_polyhedra(&points, &faces, owner, neighbour, patches)
    }

    fn points(&self) -> Vec<DVec3> {
        let [nx, ny, nz] = self.n_cells();
        let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    let mut p = DVec3::new(self.xs[i], self.ys[j], self.zs[k]);
                    if self.distortion > 0.0 {
                        // 相位与 k 无关，保持 z 向拉伸结构
                        let phase = (i * 7 + j * 13) as f64;
                        if i > 0 && i < nx {
                            let h = (self.xs[i + 1] - self.xs[i]).min(self.xs[i] - self.xs[i - 1]);
                            p.x += self.distortion * h * (phase * 0.7).sin();
                        }
                        if j > 0 && j < ny {
                            let h = (self.ys[j + 1] - self.ys[j]).min(self.ys[j] - self.ys[j - 1]);
                            p.y += self.distortion * h * (phase * 1.3).cos();
                        }
                    }
                    points.push(p);
                }
            }
        }
        points
    }
}

/// x 面（法向 +x），位于节点平面 i
fn x_face(pt: &impl Fn(usize, usize, usize) -> usize, i: usize, j: usize, k: usize) -> Vec<usize> {
    vec![pt(i, j, k), pt(i, j + 1, k), pt(i, j + 1, k + 1), pt(i, j, k + 1)]
}

/// y 面（法向 +y），位于节点平面 j
fn y_face(pt: &impl Fn(usize, usize, usize) -> usize, i: usize, j: usize, k: usize) -> Vec<usize> {
    vec![pt(i, j, k), pt(i, j, k + 1), pt(i + 1, j, k + 1), pt(i + 1, j, k)]
}

/// z 面（法向 +z），位于节点平面 k
fn z_face(pt: &impl Fn(usize, usize, usize) -> usize, i: usize, j: usize, k: usize) -> Vec<usize> {
    vec![pt(i, j, k), pt(i + 1, j, k), pt(i + 1, j + 1, k), pt(i, j + 1, k)]
}

fn reversed(mut face: Vec<usize>) -> Vec<usize> {
    face.reverse();
    face
}

fn graded_axis(coords: &[f64], ratio: f64) -> Vec<f64> {
    let n = coords.len().saturating_sub(1);
    if n == 0 || (ratio - 1.0).abs() < 1e-12 {
        return coords.to_vec();
    }
    let (start, end) = (coords[0], coords[n]);
    let total: f64 = (0..n).map(|i| ratio.powi(i as i32)).sum();
    let mut x = start;
    let mut out = Vec::with_capacity(n + 1);
    out.push(start);
    for i in 0..n {
        x += (end - start) * ratio.powi(i as i32) / total;
        out.push(x);
    }
    out[n] = end;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_mesh() {
        let mesh = StructuredBlock::line(10, 1.0).build().unwrap();
        assert_eq!(mesh.n_cells(), 10);
        assert_eq!(mesh.n_internal_faces(), 9);
        assert_eq!(mesh.patches().len(), 6);
        assert_eq!(mesh.solution_d(), [true, false, false]);
        assert!((mesh.total_volume() - 0.1 * 0.1).abs() < 1e-14);
        for w in &mesh.weights()[..9] {
            assert!((w - 0.5).abs() < 1e-12);
        }
        assert!((mesh.c()[0].x - 0.05).abs() < 1e-14);
    }

    #[test]
    fn test_box_counts() {
        let mesh = StructuredBlock::uniform([3, 4, 2], [3.0, 4.0, 2.0]).build().unwrap();
        assert_eq!(mesh.n_cells(), 24);
        assert_eq!(mesh.n_internal_faces(), 2 * 4 * 2 + 3 * 3 * 2 + 3 * 4);
        assert!((mesh.total_volume() - 24.0).abs() < 1e-12);
        assert_eq!(mesh.n_solution_d(), 3);
        let upper = mesh.upper_addr();
        let lower = mesh.lower_addr();
        assert!(lower.iter().zip(upper).all(|(l, u)| l < u));
    }

    #[test]
    fn test_graded_weights() {
        let mesh = StructuredBlock::line(5, 1.0).graded_x(2.0).build().unwrap();
        assert!((mesh.total_volume() - 0.2 * 0.2).abs() < 1e-12);
        // 单元长度加倍，owner 侧更近
        assert!((mesh.weights()[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_distorted_is_non_orthogonal() {
        let mesh = StructuredBlock::plane(6, 6, 1.0, 1.0).distorted(0.2).build().unwrap();
        assert_eq!(mesh.n_solution_d(), 2);
        assert!(mesh.is_non_orthogonal());
        assert!((mesh.total_volume() - 1.0 / 6.0).abs() < 1e-12);
        assert!(mesh.v().iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_rejects_degenerate() {
        assert!(StructuredBlock::uniform([0, 1, 1], [1.0, 1.0, 1.0]).build().is_err());
        assert!(StructuredBlock::from_coordinates(vec![0.0, 1.0, 0.5], vec![0.0, 1.0], vec![0.0, 1.0])
            .build()
            .is_err());
    }
}
