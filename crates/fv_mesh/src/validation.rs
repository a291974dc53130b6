// crates/fv_mesh/src/validation.rs

//! 网格检查
//!
//! 检查单元封闭性、体积、非正交度，并提供模型对网格维数假设的断言。
//!
//! # 示例
//!
//! ```
//! use fv_mesh::structured::StructuredBlock;
//! use fv_mesh::validation::{check_mesh, assert_dimensions};
//!
//! let mesh = StructuredBlock::plane(4, 4, 1.0, 1.0).build().unwrap();
//! let report = check_mesh(&mesh);
//! assert!(report.is_valid());
//! assert!(assert_dimensions(&mesh, 2, "Smagorinsky").is_ok());
//! assert!(assert_dimensions(&mesh, 3, "LES delta").is_err());
//! ```

use crate::mesh::FvMesh;
use fv_foundation::error::{FvError, FvResult};
use glam::DVec3;
use std::fmt;

/// 单元开口（面积矢量和）相对容差
const CLOSED_TOLERANCE: f64 = 1e-6;

/// 非正交角警告阈值（度）
const NON_ORTH_WARNING_DEG: f64 = 70.0;

/// 网格检查报告
#[derive(Debug, Default)]
pub struct MeshCheckReport {
    /// 错误列表
    pub errors: Vec<MeshCheckError>,
    /// 警告列表
    pub warnings: Vec<String>,
    /// 最大非正交角（度）
    pub max_non_orthogonality: f64,
    /// 最大单元开口（相对）
    pub max_open_cell: f64,
}

impl MeshCheckReport {
    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 是否通过（无错误）
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 有错误时转为 [`FvError::InvalidMesh`]
    pub fn into_result(self) -> FvResult<()> {
        match self.errors.first() {
            None => Ok(()),
            Some(first) => Err(FvError::invalid_mesh(format!(
                "网格检查失败 ({} 个错误)，首个: {}",
                self.errors.len(),
                first
            ))),
        }
    }
}

impl fmt::Display for MeshCheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "网格检查:")?;
        writeln!(f, "  最大非正交角: {:.2}°", self.max_non_orthogonality)?;
        writeln!(f, "  最大单元开口: {:.3e}", self.max_open_cell)?;
        writeln!(f, "  错误: {} 个, 警告: {} 个", self.errors.len(), self.warnings.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, err)?;
        }
        for w in &self.warnings {
            writeln!(f, "  - {}", w)?;
        }
        Ok(())
    }
}

/// 网格检查错误
#[derive(Debug, Clone)]
pub enum MeshCheckError {
    /// 单元面积矢量和不为零
    OpenCell {
        /// 单元号
        cell: usize,
        /// 相对开口量
        magnitude: f64,
    },
    /// 内部面法向与中心连线夹角超过 90°
    InvertedFace {
        /// 面号
        face: usize,
    },
}

impl fmt::Display for MeshCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenCell { cell, magnitude } => {
                write!(f, "单元{}: 不封闭 (开口 {:.3e})", cell, magnitude)
            }
            Self::InvertedFace { face } => write!(f, "面{}: 法向与中心连线反向", face),
        }
    }
}

/// 检查网格
pub fn check_mesh(mesh: &FvMesh) -> MeshCheckReport {
    let mut report = MeshCheckReport::default();
    let sf = mesh.sf();
    let owner = mesh.owner_addr();
    let neighbour = mesh.neighbour_addr();

    // 封闭性：每个单元外法向面积矢量之和为零
    let mut sum_sf = vec![DVec3::ZERO; mesh.n_cells()];
    let mut sum_mag = vec![0.0; mesh.n_cells()];
    for (f, &o) in owner.iter().enumerate() {
        sum_sf[o] += sf[f];
        sum_mag[o] += mesh.mag_sf()[f];
    }
    for (f, &nb) in neighbour.iter().enumerate() {
        sum_sf[nb] -= sf[f];
        sum_mag[nb] += mesh.mag_sf()[f];
    }
    for (cell, (s, m)) in sum_sf.iter().zip(&sum_mag).enumerate() {
        let open = s.length() / m.max(f64::MIN_POSITIVE);
        report.max_open_cell = report.max_open_cell.max(open);
        if open > CLOSED_TOLERANCE {
            report.errors.push(MeshCheckError::OpenCell {
                cell,
                magnitude: open,
            });
        }
    }

    // 非正交角
    for f in 0..mesh.n_internal_faces() {
        let d = mesh.delta()[f];
        let cos = sf[f].dot(d) / (mesh.mag_sf()[f] * d.length()).max(f64::MIN_POSITIVE);
        if cos <= 0.0 {
            report.errors.push(MeshCheckError::InvertedFace { face: f });
            continue;
        }
        let angle = cos.clamp(-1.0, 1.0).acos().to_degrees();
        report.max_non_orthogonality = report.max_non_orthogonality.max(angle);
    }
    if report.max_non_orthogonality > NON_ORTH_WARNING_DEG {
        report.warnings.push(format!(
            "最大非正交角 {:.1}° 超过 {}°",
            report.max_non_orthogonality, NON_ORTH_WARNING_DEG
        ));
    }

    log::debug!("{}", report);
    report
}

/// 断言网格的求解方向数
///
/// 模型假设二维网格却收到三维网格时，返回 [`FvError::MeshConsistency`]。
pub fn assert_dimensions(mesh: &FvMesh, expected: usize, context: &str) -> FvResult<()> {
    let actual = mesh.n_solution_d();
    if actual == expected {
        Ok(())
    } else {
        Err(FvError::mesh_consistency(format!(
            "{context} 需要 {expected} 维网格，实际求解方向数为 {actual}"
        )))
    }
}

/// 断言网格至少有一个空方向（二维或一维）
pub fn assert_reduced_dimension(mesh: &FvMesh, context: &str) -> FvResult<()> {
    if mesh.n_solution_d() < 3 {
        Ok(())
    } else {
        Err(FvError::mesh_consistency(format!(
            "{context} 需要降维网格（至少一个 empty 方向），实际为三维网格"
        )))
    }
}
