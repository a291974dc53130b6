// crates/fv_physics/src/numerics/linear_algebra/solver.rs

//! 迭代求解器
//!
//! - [`PcgSolver`]: 预条件共轭梯度（对称定矩阵，正定或负定均可）
//! - [`BiCgStabSolver`]: 预条件稳定双共轭梯度（一般非对称矩阵）
//! - [`SmoothSolver`]: 对称 Gauss-Seidel 光顺
//! - [`DiagonalSolver`]: 仅对角矩阵
//!
//! # 残差
//!
//! 收敛判据使用有限体积惯用的归一化一范数：
//!
//! ```text
//! res = Σ|b - A·x| / (Σ(|A·x - A·x̄| + |b - A·x̄|) + small)
//! ```
//!
//! 其中 `x̄` 为 `x` 的平均值。归一化因子在初值处计算一次，
//! 使残差与方程整体缩放及解的量级无关。

use super::csr::CsrMatrix;
use super::preconditioner::{build_preconditioner, Preconditioner};
use super::vector_ops::{average, axpy, dot, sum_mag, xpay};
use fv_config::{LinearSolverControls, LinearSolverKind, PreconditionerKind};
use serde::{Deserialize, Serialize};

/// 归一化因子中的小量
const NORM_SMALL: f64 = 1e-20;

/// 判定内积退化（breakdown）的阈值
const BREAKDOWN_TOL: f64 = 1e-300;

// ============================================================
// 配置与结果
// ============================================================

/// 求解器配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 归一化残差的绝对容差
    pub tolerance: f64,
    /// 相对初始残差的容差，0 表示不用
    pub rel_tol: f64,
    /// 最大迭代次数
    pub max_iter: usize,
    /// 最少迭代次数
    pub min_iter: usize,
    /// 光顺器每次迭代的扫掠次数
    pub n_sweeps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::from(&LinearSolverControls::default())
    }
}

impl From<&LinearSolverControls> for SolverConfig {
    fn from(c: &LinearSolverControls) -> Self {
        Self {
            tolerance: c.tolerance,
            rel_tol: c.rel_tol,
            max_iter: c.max_iter,
            min_iter: c.min_iter,
            n_sweeps: c.n_sweeps.max(1),
        }
    }
}

impl SolverConfig {
    /// 指定容差和最大迭代次数
    pub fn new(tolerance: f64, max_iter: usize) -> Self {
        Self {
            tolerance,
            max_iter,
            ..Default::default()
        }
    }

    /// 在第 `iterations` 次迭代后是否收敛
    #[inline]
    pub fn converged(&self, iterations: usize, initial: f64, current: f64) -> bool {
        iterations >= self.min_iter
            && (current < self.tolerance || (self.rel_tol > 0.0 && current < self.rel_tol * initial))
    }
}

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// 已收敛
    Converged,
    /// 达到最大迭代次数
    MaxIterationsReached,
    /// 残差出现非有限值
    Diverged,
    /// 内积退化，无法继续
    Stagnated,
}

/// 求解结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    /// 状态
    pub status: SolverStatus,
    /// 迭代次数
    pub iterations: usize,
    /// 初始归一化残差
    pub initial_residual: f64,
    /// 最终归一化残差
    pub final_residual: f64,
}

impl SolverResult {
    /// 是否收敛
    #[inline]
    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}

// ============================================================
// 残差归一化
// ============================================================

/// 残差归一化因子 `Σ(|A·x - A·x̄| + |b - A·x̄|) + small`
///
/// `ax` 为已算好的 `A·x`。
pub fn normalisation_factor(matrix: &CsrMatrix, x: &[f64], b: &[f64], ax: &[f64]) -> f64 {
    let x_ref = average(x);
    let row_sums = matrix.row_sums();
    let mut factor = 0.0;
    for i in 0..b.len() {
        let ax_ref = row_sums[i] * x_ref;
        factor += (ax[i] - ax_ref).abs() + (b[i] - ax_ref).abs();
    }
    factor + NORM_SMALL
}

/// 归一化残差，同时返回残差向量与归一化因子
pub fn normalised_residual(matrix: &CsrMatrix, x: &[f64], b: &[f64]) -> (Vec<f64>, f64, f64) {
    let mut ax = vec![0.0; b.len()];
    matrix.mul_vec(x, &mut ax);
    let norm = normalisation_factor(matrix, x, b, &ax);
    let r: Vec<f64> = b.iter().zip(&ax).map(|(bi, ai)| bi - ai).collect();
    let res = sum_mag(&r) / norm;
    (r, norm, res)
}

// ============================================================
// 求解器 trait
// ============================================================

/// 迭代求解器 trait
pub trait IterativeSolver {
    /// 求解 `A·x = b`，`x` 作为初值并原地更新
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &P,
    ) -> SolverResult;

    /// 名称
    fn name(&self) -> &'static str;
}

/// 按配置选择求解器和预条件器求解
pub fn solve_system(
    kind: LinearSolverKind,
    preconditioner: PreconditionerKind,
    config: SolverConfig,
    matrix: &CsrMatrix,
    b: &[f64],
    x: &mut [f64],
) -> SolverResult {
    let precond = build_preconditioner(preconditioner, matrix);
    match kind {
        LinearSolverKind::Pcg => PcgSolver::new(config).solve(matrix, b, x, precond.as_ref()),
        LinearSolverKind::PBiCGStab => {
            BiCgStabSolver::new(config).solve(matrix, b, x, precond.as_ref())
        }
        LinearSolverKind::SmoothSolver => {
            SmoothSolver::new(config).solve(matrix, b, x, precond.as_ref())
        }
        LinearSolverKind::Diagonal => DiagonalSolver.solve(matrix, b, x, precond.as_ref()),
    }
}

fn finish(status: SolverStatus, iterations: usize, initial: f64, current: f64) -> SolverResult {
    SolverResult {
        status,
        iterations,
        initial_residual: initial,
        final_residual: current,
    }
}

// ============================================================
// PCG
// ============================================================

/// 预条件共轭梯度
#[derive(Debug, Clone)]
pub struct PcgSolver {
    config: SolverConfig,
    z: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl PcgSolver {
    /// 创建求解器
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            z: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        if self.z.len() != n {
            self.z = vec![0.0; n];
            self.p = vec![0.0; n];
            self.ap = vec![0.0; n];
        }
    }
}

impl IterativeSolver for PcgSolver {
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &P,
    ) -> SolverResult {
        self.ensure_workspace(b.len());
        let (mut r, norm, initial) = normalised_residual(matrix, x, b);
        let mut current = initial;
        if self.config.converged(0, initial, current) {
            return finish(SolverStatus::Converged, 0, initial, current);
        }

        let mut rho_old = 1.0;
        for iter in 1..=self.config.max_iter {
            precond.apply(&r, &mut self.z);
            let rho = dot(&r, &self.z);
            if iter == 1 {
                self.p.copy_from_slice(&self.z);
            } else {
                xpay(&self.z, rho / rho_old, &mut self.p);
            }

            matrix.mul_vec(&self.p, &mut self.ap);
            let pap = dot(&self.p, &self.ap);
            if pap.abs() < BREAKDOWN_TOL {
                return finish(SolverStatus::Stagnated, iter - 1, initial, current);
            }

            let alpha = rho / pap;
            axpy(alpha, &self.p, x);
            axpy(-alpha, &self.ap, &mut r);

            current = sum_mag(&r) / norm;
            log::trace!("PCG iter {}: residual = {:.6e}", iter, current);

            if !current.is_finite() {
                return finish(SolverStatus::Diverged, iter, initial, current);
            }
            if self.config.converged(iter, initial, current) {
                return finish(SolverStatus::Converged, iter, initial, current);
            }
            rho_old = rho;
        }

        finish(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            initial,
            current,
        )
    }

    fn name(&self) -> &'static str {
        "PCG"
    }
}

// ============================================================
// BiCGStab
// ============================================================

/// 预条件稳定双共轭梯度（右预条件）
#[derive(Debug, Clone)]
pub struct BiCgStabSolver {
    config: SolverConfig,
    r0: Vec<f64>,
    p: Vec<f64>,
    v: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
    p_hat: Vec<f64>,
    s_hat: Vec<f64>,
}

impl BiCgStabSolver {
    /// 创建求解器
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r0: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            s: Vec::new(),
            t: Vec::new(),
            p_hat: Vec::new(),
            s_hat: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        if self.r0.len() != n {
            self.r0 = vec![0.0; n];
            self.p = vec![0.0; n];
            self.v = vec![0.0; n];
            self.s = vec![0.0; n];
            self.t = vec![0.0; n];
            self.p_hat = vec![0.0; n];
            self.s_hat = vec![0.0; n];
        } else {
            self.p.fill(0.0);
            self.v.fill(0.0);
        }
    }
}

impl IterativeSolver for BiCgStabSolver {
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &P,
    ) -> SolverResult {
        let n = b.len();
        self.ensure_workspace(n);
        let (mut r, norm, initial) = normalised_residual(matrix, x, b);
        let mut current = initial;
        if self.config.converged(0, initial, current) {
            return finish(SolverStatus::Converged, 0, initial, current);
        }

        self.r0.copy_from_slice(&r);
        let (mut rho_old, mut alpha, mut omega) = (1.0, 1.0, 1.0);

        for iter in 1..=self.config.max_iter {
            let rho = dot(&self.r0, &r);
            if rho.abs() < BREAKDOWN_TOL {
                return finish(SolverStatus::Stagnated, iter - 1, initial, current);
            }

            if iter == 1 {
                self.p.copy_from_slice(&r);
            } else {
                let beta = (rho / rho_old) * (alpha / omega);
                for i in 0..n {
                    self.p[i] = r[i] + beta * (self.p[i] - omega * self.v[i]);
                }
            }

            precond.apply(&self.p, &mut self.p_hat);
            matrix.mul_vec(&self.p_hat, &mut self.v);
            let r0v = dot(&self.r0, &self.v);
            if r0v.abs() < BREAKDOWN_TOL {
                return finish(SolverStatus::Stagnated, iter - 1, initial, current);
            }
            alpha = rho / r0v;

            for i in 0..n {
                self.s[i] = r[i] - alpha * self.v[i];
            }
            let s_res = sum_mag(&self.s) / norm;
            if self.config.converged(iter, initial, s_res) {
                axpy(alpha, &self.p_hat, x);
                log::trace!("PBiCGStab iter {}: residual = {:.6e}", iter, s_res);
                return finish(SolverStatus::Converged, iter, initial, s_res);
            }

            precond.apply(&self.s, &mut self.s_hat);
            matrix.mul_vec(&self.s_hat, &mut self.t);
            let tt = dot(&self.t, &self.t);
            omega = if tt > BREAKDOWN_TOL {
                dot(&self.t, &self.s) / tt
            } else {
                0.0
            };

            for i in 0..n {
                x[i] += alpha * self.p_hat[i] + omega * self.s_hat[i];
                r[i] = self.s[i] - omega * self.t[i];
            }

            current = sum_mag(&r) / norm;
            log::trace!("PBiCGStab iter {}: residual = {:.6e}", iter, current);

            if !current.is_finite() {
                return finish(SolverStatus::Diverged, iter, initial, current);
            }
            if self.config.converged(iter, initial, current) {
                return finish(SolverStatus::Converged, iter, initial, current);
            }
            if omega == 0.0 {
                return finish(SolverStatus::Stagnated, iter, initial, current);
            }
            rho_old = rho;
        }

        finish(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            initial,
            current,
        )
    }

    fn name(&self) -> &'static str {
        "PBiCGStab"
    }
}

// ============================================================
// 对称 Gauss-Seidel
// ============================================================

/// 对称 Gauss-Seidel 光顺求解器
///
/// 每次迭代执行 `n_sweeps` 次前向加后向扫掠，忽略预条件器。
#[derive(Debug, Clone)]
pub struct SmoothSolver {
    config: SolverConfig,
}

impl SmoothSolver {
    /// 创建求解器
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    fn relax_row(matrix: &CsrMatrix, b: &[f64], x: &mut [f64], row: usize) {
        let mut diag = 0.0;
        let mut sum = b[row];
        for (col, a) in matrix.row(row).iter() {
            if col == row {
                diag = a;
            } else {
                sum -= a * x[col];
            }
        }
        if diag != 0.0 {
            x[row] = sum / diag;
        }
    }
}

impl IterativeSolver for SmoothSolver {
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        _precond: &P,
    ) -> SolverResult {
        let n = b.len();
        let (_, norm, initial) = normalised_residual(matrix, x, b);
        let mut current = initial;
        if self.config.converged(0, initial, current) {
            return finish(SolverStatus::Converged, 0, initial, current);
        }

        let mut ax = vec![0.0; n];
        for iter in 1..=self.config.max_iter {
            for _ in 0..self.config.n_sweeps {
                for row in 0..n {
                    Self::relax_row(matrix, b, x, row);
                }
                for row in (0..n).rev() {
                    Self::relax_row(matrix, b, x, row);
                }
            }

            matrix.mul_vec(x, &mut ax);
            current = b.iter().zip(&ax).map(|(bi, ai)| (bi - ai).abs()).sum::<f64>() / norm;
            log::trace!("smoothSolver iter {}: residual = {:.6e}", iter, current);

            if !current.is_finite() {
                return finish(SolverStatus::Diverged, iter, initial, current);
            }
            if self.config.converged(iter, initial, current) {
                return finish(SolverStatus::Converged, iter, initial, current);
            }
        }

        finish(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            initial,
            current,
        )
    }

    fn name(&self) -> &'static str {
        "smoothSolver"
    }
}

// ============================================================
// 对角
// ============================================================

/// 对角矩阵直接求解 `x_i = b_i / A_ii`
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagonalSolver;

impl IterativeSolver for DiagonalSolver {
    fn solve<P: Preconditioner + ?Sized>(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        _precond: &P,
    ) -> SolverResult {
        let (_, _, initial) = normalised_residual(matrix, x, b);
        for (i, xi) in x.iter_mut().enumerate() {
            if let Some(d) = matrix.diagonal_value(i).filter(|d| *d != 0.0) {
                *xi = b[i] / d;
            }
        }
        let (_, _, current) = normalised_residual(matrix, x, b);
        let status = if current.is_finite() {
            SolverStatus::Converged
        } else {
            SolverStatus::Diverged
        };
        finish(status, 0, initial, current)
    }

    fn name(&self) -> &'static str {
        "diagonal"
    }
}
