// crates/fv_physics/src/matrix/solve.rs

//! 方程求解
//!
//! 标量系数矩阵对所有分量相同，逐分量导出右端项后调用迭代求解器。
//! 空方向上的矢量分量不求解。

use super::fv_matrix::FvMatrix;
use crate::field::{FieldValue, VolField};
use crate::numerics::linear_algebra::{normalised_residual, solve_system, CsrMatrix, SolverConfig};
use fv_config::LinearSolverControls;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 单个分量的求解结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentPerformance {
    /// 分量号
    pub component: usize,
    /// 初始归一化残差
    pub initial_residual: f64,
    /// 最终归一化残差
    pub final_residual: f64,
    /// 迭代次数
    pub iterations: usize,
    /// 是否收敛
    pub converged: bool,
}

/// 一次方程求解的汇总
///
/// 残差和迭代次数取各分量最大值，全部分量收敛才算收敛。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverPerformance {
    /// 求解器名
    pub solver: String,
    /// 场名
    pub field: String,
    /// 初始归一化残差
    pub initial_residual: f64,
    /// 最终归一化残差
    pub final_residual: f64,
    /// 迭代次数
    pub iterations: usize,
    /// 是否收敛
    pub converged: bool,
    /// 各分量结果
    pub components: Vec<ComponentPerformance>,
}

impl SolverPerformance {
    fn from_components(solver: &str, field: &str, components: Vec<ComponentPerformance>) -> Self {
        Self {
            solver: solver.to_string(),
            field: field.to_string(),
            initial_residual: components.iter().map(|c| c.initial_residual).fold(0.0, f64::max),
            final_residual: components.iter().map(|c| c.final_residual).fold(0.0, f64::max),
            iterations: components.iter().map(|c| c.iterations).max().unwrap_or(0),
            converged: components.iter().all(|c| c.converged),
            components,
        }
    }
}

impl fmt::Display for SolverPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Solving for {}, Initial residual = {:e}, Final residual = {:e}, No Iterations {}",
            self.solver, self.field, self.initial_residual, self.final_residual, self.iterations
        )
    }
}

impl<T: FieldValue> FvMatrix<T> {
    /// 导出 CSR 系数矩阵（含边界隐式系数）
    pub fn to_csr(&self) -> CsrMatrix {
        let total = self.total_diag();
        let extra: Vec<f64> = total.iter().zip(self.diag()).map(|(t, d)| t - d).collect();
        self.ldu().to_csr(&extra)
    }

    /// 第 `d` 个分量的右端项（含边界显式系数）
    pub fn rhs(&self, d: usize) -> Vec<f64> {
        self.total_source().iter().map(|v| v.component(d)).collect()
    }

    /// 当前 `psi` 的归一化残差，逐分量
    pub fn residual(&self, psi: &VolField<T>) -> FvResult<Vec<f64>> {
        FvError::check_size(psi.name(), self.n_cells(), psi.len())?;
        let csr = self.to_csr();
        Ok((0..T::N_COMPONENTS)
            .map(|d| {
                let x: Vec<f64> = psi.internal().iter().map(|v| v.component(d)).collect();
                normalised_residual(&csr, &x, &self.rhs(d)).2
            })
            .collect())
    }

    /// 求解并原地更新 `psi`，随后修正其边界条件
    ///
    /// 不收敛时默认只记警告；`fatalNonConvergence` 打开时返回
    /// [`FvError::LinearSolverNonConvergence`]。
    pub fn solve(
        &self,
        mesh: &FvMesh,
        psi: &mut VolField<T>,
        controls: &LinearSolverControls,
    ) -> FvResult<SolverPerformance> {
        if psi.name() != self.psi_name() {
            return Err(FvError::invalid_input(format!(
                "方程的未知量是 {}，不能用来求解 {}",
                self.psi_name(),
                psi.name()
            )));
        }
        FvError::check_size(psi.name(), self.n_cells(), psi.len())?;

        let csr = self.to_csr();
        let config = SolverConfig::from(controls);
        let solution_d = mesh.solution_d();
        let mut components = Vec::with_capacity(T::N_COMPONENTS);
        let mut x = vec![0.0; self.n_cells()];

        for d in (0..T::N_COMPONENTS).filter(|&d| T::component_is_solved(d, solution_d)) {
            for (xi, v) in x.iter_mut().zip(psi.internal()) {
                *xi = v.component(d);
            }
            let b = self.rhs(d);
            let result = solve_system(controls.solver, controls.preconditioner, config, &csr, &b, &mut x);
            for (v, &xi) in psi.internal_mut().iter_mut().zip(&x) {
                v.set_component(d, xi);
            }
            components.push(ComponentPerformance {
                component: d,
                initial_residual: result.initial_residual,
                final_residual: result.final_residual,
                iterations: result.iterations,
                converged: result.is_converged(),
            });
        }
        psi.correct_boundary_conditions(mesh)?;

        let perf = SolverPerformance::from_components(controls.solver.as_str(), psi.name(), components);
        log::debug!("{perf}");

        if !perf.converged {
            if controls.fatal_non_convergence {
                return Err(FvError::LinearSolverNonConvergence {
                    field: perf.field.clone(),
                    solver: perf.solver.clone(),
                    iterations: perf.iterations,
                    initial_residual: perf.initial_residual,
                    final_residual: perf.final_residual,
                });
            }
            log::warn!(
                "{} 未收敛：{} 次迭代后残差 {:e}（初始 {:e}）",
                perf.field,
                perf.iterations,
                perf.final_residual,
                perf.initial_residual
            );
        }
        Ok(perf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_config::{LinearSolverKind, PreconditionerKind};
    use fv_foundation::DimensionSet;
    use fv_mesh::StructuredBlock;
    use glam::DVec3;

    fn controls(solver: LinearSolverKind) -> LinearSolverControls {
        LinearSolverControls {
            solver,
            preconditioner: PreconditionerKind::Dic,
            tolerance: 1e-12,
            rel_tol: 0.0,
            max_iter: 200,
            ..Default::default()
        }
    }

    /// 两端固定值的一维扩散：单元系数 `-1`，边界系数 `2`
    fn dirichlet<T: FieldValue>(mesh: &FvMesh, psi: &VolField<T>, left: T, right: T) -> FvMatrix<T> {
        let mut m = FvMatrix::new(psi, mesh, psi.dimensions() * DimensionSet::VOLUME);
        m.ldu_mut().upper_mut().fill(-1.0);
        m.ldu_mut().neg_sum_diag();
        m.internal_coeffs_mut(0)[0] = 2.0;
        m.internal_coeffs_mut(1)[0] = 2.0;
        m.boundary_coeffs_mut(0)[0] = left * 2.0;
        m.boundary_coeffs_mut(1)[0] = right * 2.0;
        m
    }

    #[test]
    fn test_solve_scalar_linear_profile() {
        let mesh = StructuredBlock::line(4, 4.0).build().unwrap();
        let mut psi = VolField::uniform("T", &mesh, DimensionSet::DIMLESS, 0.0).unwrap();
        let m = dirichlet(&mesh, &psi, 0.0, 1.0);
        let initial = m.residual(&psi).unwrap()[0];
        let perf = m.solve(&mesh, &mut psi, &controls(LinearSolverKind::Pcg)).unwrap();
        assert!(perf.converged);
        assert!((perf.initial_residual - initial).abs() < 1e-12);
        for (i, v) in psi.internal().iter().enumerate() {
            assert!((v - (i as f64 + 0.5) / 4.0).abs() < 1e-9);
        }
        assert!(m.residual(&psi).unwrap()[0] < 1e-9);
        assert!(perf.to_string().starts_with("PCG: Solving for T"));
    }

    #[test]
    fn test_solve_vector_skips_empty_directions() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let mut u = VolField::uniform("U", &mesh, DimensionSet::VELOCITY, DVec3::new(0.0, 7.0, 0.0)).unwrap();
        let m = dirichlet(&mesh, &u, DVec3::ZERO, DVec3::new(3.0, 3.0, 3.0));
        let perf = m.solve(&mesh, &mut u, &controls(LinearSolverKind::PBiCGStab)).unwrap();
        assert_eq!(perf.components.len(), 1);
        assert_eq!(perf.components[0].component, 0);
        assert!((u.value(2).x - 2.5).abs() < 1e-9);
        assert_eq!(u.value(2).y, 7.0);
    }

    #[test]
    fn test_non_convergence_is_fatal_only_when_configured() {
        let mesh = StructuredBlock::line(20, 1.0).build().unwrap();
        let mut psi = VolField::uniform("T", &mesh, DimensionSet::DIMLESS, 0.0).unwrap();
        let m = dirichlet(&mesh, &psi, 0.0, 1.0);
        let mut c = controls(LinearSolverKind::SmoothSolver);
        c.max_iter = 1;
        let perf = m.solve(&mesh, &mut psi, &c).unwrap();
        assert!(!perf.converged);

        c.fatal_non_convergence = true;
        let mut psi = VolField::uniform("T", &mesh, DimensionSet::DIMLESS, 0.0).unwrap();
        assert!(matches!(
            m.solve(&mesh, &mut psi, &c),
            Err(FvError::LinearSolverNonConvergence { iterations: 1, .. })
        ));

        let mut other = VolField::uniform("p", &mesh, DimensionSet::DIMLESS, 0.0).unwrap();
        assert!(m.solve(&mesh, &mut other, &c).is_err());
    }
}
