// crates/fv_physics/src/numerics/linear_algebra/preconditioner.rs

//! 预条件器
//!
//! 将 `A·x = b` 转换为条件数更好的 `M⁻¹·A·x = M⁻¹·b`。
//!
//! - [`IdentityPreconditioner`]: 无预条件（`none`）
//! - [`JacobiPreconditioner`]: 对角预条件（`diagonal`）
//! - [`Ilu0Preconditioner`]: 零填充不完全 LU（`DIC`/`DILU`）

use super::csr::CsrMatrix;
use fv_config::PreconditionerKind;

/// 主元绝对值下限
const PIVOT_TOL: f64 = 1e-300;

/// 预条件器 trait
///
/// 核心操作是 `apply`: `z = M⁻¹·r`
pub trait Preconditioner: Send + Sync {
    /// 应用预条件器
    fn apply(&self, r: &[f64], z: &mut [f64]);

    /// 名称
    fn name(&self) -> &'static str;

    /// 矩阵数值变化但模式不变时更新
    fn update(&mut self, matrix: &CsrMatrix);
}

/// 按配置构造预条件器
pub fn build_preconditioner(kind: PreconditionerKind, matrix: &CsrMatrix) -> Box<dyn Preconditioner> {
    match kind {
        PreconditionerKind::None => Box::new(IdentityPreconditioner),
        PreconditionerKind::Diagonal => Box::new(JacobiPreconditioner::from_matrix(matrix)),
        PreconditionerKind::Dic | PreconditionerKind::Dilu => Box::new(Ilu0Preconditioner::new(matrix)),
    }
}

// ============================================================
// 恒等
// ============================================================

/// 恒等预条件器，`z = r`
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        z.copy_from_slice(r);
    }

    fn name(&self) -> &'static str {
        "none"
    }

    fn update(&mut self, _matrix: &CsrMatrix) {}
}

// ============================================================
// Jacobi
// ============================================================

/// Jacobi 预条件器，`z_i = r_i / A_ii`
///
/// 对角元为零的行退化为恒等。
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl JacobiPreconditioner {
    /// 从矩阵构造
    pub fn from_matrix(matrix: &CsrMatrix) -> Self {
        let mut p = Self {
            inv_diag: vec![1.0; matrix.n_rows()],
        };
        p.update(matrix);
        p
    }

    /// 对角元倒数
    pub fn inv_diagonal(&self) -> &[f64] {
        &self.inv_diag
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        for ((zi, ri), di) in z.iter_mut().zip(r).zip(&self.inv_diag) {
            *zi = ri * di;
        }
    }

    fn name(&self) -> &'static str {
        "diagonal"
    }

    fn update(&mut self, matrix: &CsrMatrix) {
        self.inv_diag.resize(matrix.n_rows(), 1.0);
        for (i, inv) in self.inv_diag.iter_mut().enumerate() {
            *inv = match matrix.diagonal_value(i) {
                Some(d) if d.abs() > PIVOT_TOL => 1.0 / d,
                _ => 1.0,
            };
        }
    }
}

// ============================================================
// ILU(0)
// ============================================================

/// 零填充不完全 LU 分解
///
/// `L` 为单位下三角，`U` 含对角，两者共用原矩阵的稀疏模式。
#[derive(Debug, Clone)]
pub struct Ilu0Preconditioner {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    lu_values: Vec<f64>,
    diag_ptr: Vec<usize>,
}

impl Ilu0Preconditioner {
    /// 分解矩阵（要求每行都存储了对角元）
    pub fn new(matrix: &CsrMatrix) -> Self {
        let n = matrix.n_rows();
        let row_ptr = matrix.row_ptr().to_vec();
        let col_idx = matrix.col_idx().to_vec();
        let diag_ptr = (0..n)
            .map(|i| matrix.pattern().find_index(i, i).unwrap_or(row_ptr[i]))
            .collect();

        let mut p = Self {
            n,
            row_ptr,
            col_idx,
            lu_values: matrix.values().to_vec(),
            diag_ptr,
        };
        p.factorize();
        p
    }

    fn factorize(&mut self) {
        let (row_ptr, col_idx, diag_ptr) = (&self.row_ptr, &self.col_idx, &self.diag_ptr);
        let lu = &mut self.lu_values;

        for i in 1..self.n {
            for k_idx in row_ptr[i]..row_ptr[i + 1] {
                let k = col_idx[k_idx];
                if k >= i {
                    break;
                }

                let mut pivot = lu[diag_ptr[k]];
                if pivot.abs() < PIVOT_TOL {
                    pivot = if pivot < 0.0 { -PIVOT_TOL } else { PIVOT_TOL };
                    lu[diag_ptr[k]] = pivot;
                }

                let factor = lu[k_idx] / pivot;
                lu[k_idx] = factor;

                for j_idx in (k_idx + 1)..row_ptr[i + 1] {
                    let j = col_idx[j_idx];
                    if let Ok(local) = col_idx[row_ptr[k]..row_ptr[k + 1]].binary_search(&j) {
                        lu[j_idx] -= factor * lu[row_ptr[k] + local];
                    }
                }
            }
        }
    }

    fn forward_solve(&self, r: &[f64], y: &mut [f64]) {
        y.copy_from_slice(r);
        for i in 0..self.n {
            for k_idx in self.row_ptr[i]..self.diag_ptr[i] {
                y[i] -= self.lu_values[k_idx] * y[self.col_idx[k_idx]];
            }
        }
    }

    fn backward_solve(&self, z: &mut [f64]) {
        for i in (0..self.n).rev() {
            for k_idx in (self.diag_ptr[i] + 1)..self.row_ptr[i + 1] {
                z[i] -= self.lu_values[k_idx] * z[self.col_idx[k_idx]];
            }
            let diag = self.lu_values[self.diag_ptr[i]];
            if diag.abs() > PIVOT_TOL {
                z[i] /= diag;
            }
        }
    }
}

impl Preconditioner for Ilu0Preconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        self.forward_solve(r, z);
        self.backward_solve(z);
    }

    fn name(&self) -> &'static str {
        "ILU(0)"
    }

    fn update(&mut self, matrix: &CsrMatrix) {
        self.lu_values.copy_from_slice(matrix.values());
        self.factorize();
    }
}
