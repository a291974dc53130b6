// crates/fv_physics/src/control/solution_control.rs

//! 外迭代控制
//!
//! 每个时间步内的外迭代按如下方式驱动：
//!
//! ```text
//! while control.next_iteration() {
//!     // 组装、松弛、求解各方程
//!     let perf = eqn.solve(mesh, &mut u, control.solver_controls("U")?)?;
//!     control.record(&perf);
//!     for corr in control.correctors() { ... }
//! }
//! ```
//!
//! `residualControl` 中列出的每个场，本次迭代第一次求解的初始残差都低于
//! 阈值时判定收敛，下一次 `next_iteration` 返回 false。

use crate::matrix::SolverPerformance;
use fv_config::solution::key_matches;
use fv_config::{FvSolution, LinearSolverControls};
use fv_foundation::error::FvResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

/// 一次外迭代记录的残差
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IterationResiduals {
    /// 外迭代序号（从 1 开始）
    pub iteration: usize,
    /// 场名 → 本次迭代第一次求解的初始残差
    pub initial: BTreeMap<String, f64>,
    /// 场名 → 最后一次求解的最终残差
    pub last: BTreeMap<String, f64>,
}

/// 外迭代控制
#[derive(Debug, Clone)]
pub struct SolutionControl {
    solution: FvSolution,
    corr: usize,
    converged: bool,
    history: Vec<IterationResiduals>,
}

impl SolutionControl {
    /// 由求解配置创建
    pub fn new(solution: &FvSolution) -> Self {
        Self {
            solution: solution.clone(),
            corr: 0,
            converged: false,
            history: Vec::new(),
        }
    }

    /// 求解配置
    pub fn solution(&self) -> &FvSolution {
        &self.solution
    }

    /// 外迭代次数上限
    pub fn n_outer_correctors(&self) -> usize {
        self.solution.algorithm.n_outer_correctors.max(1)
    }

    /// 当前外迭代序号，循环外为 0
    pub fn iteration(&self) -> usize {
        self.corr
    }

    /// 是否为本时间步最后一次外迭代
    pub fn is_final_iteration(&self) -> bool {
        self.corr >= self.n_outer_correctors()
    }

    /// 上一个时间步是否因残差达标提前结束
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// 进入下一次外迭代
    ///
    /// 上一次迭代满足残差控制或已达次数上限时返回 false，并重置计数
    /// 以便下一个时间步重新开始。
    pub fn next_iteration(&mut self) -> bool {
        if self.corr > 0 && self.criteria_satisfied() {
            tracing::info!(
                "外迭代在第 {} 次达到残差控制要求",
                self.corr
            );
            self.converged = true;
            self.corr = 0;
            return false;
        }
        if self.corr >= self.n_outer_correctors() {
            if self.corr > 1 {
                tracing::info!("外迭代达到上限 {} 次，未满足残差控制", self.corr);
            }
            self.converged = false;
            self.corr = 0;
            return false;
        }
        if self.corr == 0 {
            self.history.clear();
            self.converged = false;
        }
        self.corr += 1;
        self.history.push(IterationResiduals {
            iteration: self.corr,
            ..Default::default()
        });
        tracing::debug!("外迭代 {}/{}", self.corr, self.n_outer_correctors());
        true
    }

    /// 记录一次求解结果
    ///
    /// 同一次迭代内只保留该场第一次求解的初始残差。
    pub fn record(&mut self, perf: &SolverPerformance) {
        tracing::debug!("{perf}");
        let Some(current) = self.history.last_mut() else {
            return;
        };
        current
            .initial
            .entry(perf.field.clone())
            .or_insert(perf.initial_residual);
        current.last.insert(perf.field.clone(), perf.final_residual);
    }

    /// 当前迭代是否满足残差控制
    ///
    /// 未配置 `residualControl` 时恒为 false；配置的每个条目都必须有
    /// 匹配的已记录场，且这些场的初始残差都低于阈值。
    pub fn criteria_satisfied(&self) -> bool {
        let control = &self.solution.algorithm.residual_control;
        let Some(current) = self.history.last() else {
            return false;
        };
        if control.is_empty() {
            return false;
        }
        control.iter().all(|(pattern, &threshold)| {
            let mut matched = current
                .initial
                .iter()
                .filter(|(field, _)| key_matches(pattern, field))
                .peekable();
            matched.peek().is_some() && matched.all(|(_, &r)| r < threshold)
        })
    }

    /// 本时间步已记录的残差
    pub fn history(&self) -> &[IterationResiduals] {
        &self.history
    }

    /// 压力修正循环
    pub fn correctors(&self) -> Range<usize> {
        0..self.solution.algorithm.n_correctors
    }

    /// 非正交修正循环（至少一次）
    pub fn non_orthogonal_correctors(&self) -> Range<usize> {
        0..self.solution.algorithm.n_non_orthogonal_correctors + 1
    }

    /// 是否为最后一次非正交修正
    pub fn is_final_non_orthogonal(&self, corr: usize) -> bool {
        corr == self.solution.algorithm.n_non_orthogonal_correctors
    }

    /// 是否求解动量预测
    pub fn momentum_predictor(&self) -> bool {
        self.solution.algorithm.momentum_predictor
    }

    /// 参考单元与参考值
    pub fn reference(&self) -> (usize, f64) {
        (self.solution.algorithm.p_ref_cell, self.solution.algorithm.p_ref_value)
    }

    /// 当前迭代使用的线性求解器控制，最后一次迭代优先 `<field>Final`
    pub fn solver_controls(&self, field: &str) -> FvResult<&LinearSolverControls> {
        self.solution.solver_controls(field, self.is_final_iteration())
    }

    /// 当前迭代的方程松弛因子，未配置时为 1
    pub fn equation_relaxation(&self, field: &str) -> f64 {
        self.solution
            .relaxation_factors
            .equation_factor(field, self.is_final_iteration())
            .unwrap_or(1.0)
    }

    /// 场松弛因子，最后一次迭代不松弛
    pub fn field_relaxation(&self, field: &str) -> Option<f64> {
        if self.is_final_iteration() {
            return None;
        }
        self.solution.relaxation_factors.field_factor(field)
    }
}
