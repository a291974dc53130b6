// crates/fv_config/src/solution.rs

//! 求解控制配置 (fvSolution)
//!
//! 包含三部分：
//!
//! - `solvers`: 每个场的线性求解器控制，键可以是场名、`(U|k|epsilon)` 形式的
//!   备选组或通配 `.*`；最后一次外迭代先查 `<field>Final`
//! - `PIMPLE`（或 `SIMPLE`）: 外迭代控制与残差收敛判据
//! - `relaxationFactors`: 场和方程的欠松弛因子
//!
//! ```text
//! {
//!   "solvers": {
//!     "p":     { "solver": "PCG", "preconditioner": "DIC", "tolerance": 1e-6, "relTol": 0.05 },
//!     "(U|T)": { "solver": "smoothSolver", "tolerance": 1e-5 }
//!   },
//!   "PIMPLE": { "nOuterCorrectors": 2, "residualControl": { "p": 1e-4 } },
//!   "relaxationFactors": { "fields": { "p": 0.3 }, "equations": { "U": 0.7 } }
//! }
//! ```

use crate::dictionary::Dictionary;
use fv_foundation::error::{FvError, FvResult};
use fv_foundation::float::DEFAULT_MAX_ITERATIONS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// 名称匹配
// ============================================================================

/// 判断配置键是否匹配场名
///
/// 支持精确名、`(a|b|c)` 备选组和 `.*` 通配。
pub fn key_matches(pattern: &str, name: &str) -> bool {
    if pattern == name || pattern == ".*" || pattern == "\".*\"" {
        return true;
    }
    let trimmed = pattern.trim_matches('"');
    match trimmed.strip_prefix('(').and_then(|p| p.strip_suffix(')')) {
        Some(group) => group.split('|').any(|alt| alt.trim() == name),
        None => false,
    }
}

/// 在表中查找匹配项：精确键优先，其次备选组，最后通配
pub fn lookup_pattern<'a, V>(table: &'a BTreeMap<String, V>, name: &str) -> Option<&'a V> {
    if let Some(v) = table.get(name) {
        return Some(v);
    }
    let mut wildcard = None;
    for (key, value) in table {
        if key == ".*" || key == "\".*\"" {
            wildcard = Some(value);
        } else if key_matches(key, name) {
            return Some(value);
        }
    }
    wildcard
}

// ============================================================================
// 线性求解器控制
// ============================================================================

/// 线性求解器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinearSolverKind {
    /// 预条件共轭梯度（对称正定）
    #[serde(rename = "PCG")]
    Pcg,
    /// 预条件双共轭梯度稳定法（一般非对称）
    #[default]
    #[serde(rename = "PBiCGStab")]
    PBiCGStab,
    /// 对称 Gauss-Seidel 光顺迭代
    #[serde(rename = "smoothSolver")]
    SmoothSolver,
    /// 仅对角矩阵（显式方程）
    #[serde(rename = "diagonal")]
    Diagonal,
}

impl LinearSolverKind {
    /// 配置中的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcg => "PCG",
            Self::PBiCGStab => "PBiCGStab",
            Self::SmoothSolver => "smoothSolver",
            Self::Diagonal => "diagonal",
        }
    }
}

impl fmt::Display for LinearSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 预条件器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreconditionerKind {
    /// 无预条件
    #[serde(rename = "none")]
    None,
    /// Jacobi 对角预条件
    #[default]
    #[serde(rename = "diagonal")]
    Diagonal,
    /// 对称矩阵不完全 Cholesky（ILU(0) 实现）
    #[serde(rename = "DIC")]
    Dic,
    /// 非对称矩阵不完全 LU（ILU(0) 实现）
    #[serde(rename = "DILU")]
    Dilu,
}

fn default_tolerance() -> f64 {
    1e-6
}
fn default_max_iter() -> usize {
    DEFAULT_MAX_ITERATIONS
}
fn default_n_sweeps() -> usize {
    1
}

/// 单个场的线性求解器控制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearSolverControls {
    /// 求解器
    #[serde(default)]
    pub solver: LinearSolverKind,
    /// 预条件器
    #[serde(default)]
    pub preconditioner: PreconditionerKind,
    /// 绝对残差容差
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// 相对初始残差的容差，0 表示不用
    #[serde(default)]
    pub rel_tol: f64,
    /// 最大迭代次数
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// 最少迭代次数
    #[serde(default)]
    pub min_iter: usize,
    /// 光顺器每次迭代的扫掠次数
    #[serde(default = "default_n_sweeps")]
    pub n_sweeps: usize,
    /// 不收敛时是否作为致命错误
    #[serde(default)]
    pub fatal_non_convergence: bool,
}

impl Default for LinearSolverControls {
    fn default() -> Self {
        Self {
            solver: LinearSolverKind::default(),
            preconditioner: PreconditionerKind::default(),
            tolerance: default_tolerance(),
            rel_tol: 0.0,
            max_iter: default_max_iter(),
            min_iter: 0,
            n_sweeps: default_n_sweeps(),
            fatal_non_convergence: false,
        }
    }
}

impl LinearSolverControls {
    /// 指定求解器，其余取默认
    pub fn with_solver(solver: LinearSolverKind) -> Self {
        Self {
            solver,
            ..Self::default()
        }
    }

    /// 校验数值范围
    pub fn validate(&self, field: &str) -> FvResult<()> {
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(FvError::invalid_config(
                format!("solvers.{field}.tolerance"),
                self.tolerance,
                "容差不能为负",
            ));
        }
        if !(0.0..1.0).contains(&self.rel_tol) {
            return Err(FvError::invalid_config(
                format!("solvers.{field}.relTol"),
                self.rel_tol,
                "relTol 必须在 [0, 1) 内",
            ));
        }
        if self.min_iter > self.max_iter {
            return Err(FvError::invalid_config(
                format!("solvers.{field}.minIter"),
                self.min_iter,
                "minIter 不能大于 maxIter",
            ));
        }
        Ok(())
    }

    /// 是否已收敛（在 `min_iter` 之后检查）
    pub fn converged(&self, iterations: usize, initial: f64, current: f64) -> bool {
        if iterations < self.min_iter {
            return false;
        }
        current < self.tolerance || (self.rel_tol > 0.0 && current < self.rel_tol * initial)
    }
}

// ============================================================================
// 外迭代控制
// ============================================================================

fn default_one() -> usize {
    1
}
fn default_true() -> bool {
    true
}

/// 外迭代（压力速度耦合）控制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OuterLoopControls {
    /// 每个时间步的外迭代次数
    #[serde(default = "default_one")]
    pub n_outer_correctors: usize,
    /// 压力修正次数
    #[serde(default = "default_one")]
    pub n_correctors: usize,
    /// 非正交修正次数
    #[serde(default)]
    pub n_non_orthogonal_correctors: usize,
    /// 是否求解动量预测
    #[serde(default = "default_true")]
    pub momentum_predictor: bool,
    /// 参考单元
    #[serde(default)]
    pub p_ref_cell: usize,
    /// 参考值
    #[serde(default)]
    pub p_ref_value: f64,
    /// 场名 → 初始残差阈值
    #[serde(default)]
    pub residual_control: BTreeMap<String, f64>,
}

impl Default for OuterLoopControls {
    fn default() -> Self {
        Self {
            n_outer_correctors: 1,
            n_correctors: 1,
            n_non_orthogonal_correctors: 0,
            momentum_predictor: true,
            p_ref_cell: 0,
            p_ref_value: 0.0,
            residual_control: BTreeMap::new(),
        }
    }
}

impl OuterLoopControls {
    /// 某个场的残差阈值
    pub fn residual_threshold(&self, field: &str) -> Option<f64> {
        lookup_pattern(&self.residual_control, field).copied()
    }
}

// ============================================================================
// 欠松弛
// ============================================================================

/// 欠松弛因子
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelaxationFactors {
    /// 场松弛（解出后混合新旧值）
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
    /// 方程松弛（`FvMatrix::relax`）
    #[serde(default)]
    pub equations: BTreeMap<String, f64>,
}

impl RelaxationFactors {
    /// 场松弛因子
    pub fn field_factor(&self, name: &str) -> Option<f64> {
        lookup_pattern(&self.fields, name).copied()
    }

    /// 方程松弛因子，最后一次外迭代先查 `<name>Final`
    pub fn equation_factor(&self, name: &str, final_iter: bool) -> Option<f64> {
        if final_iter {
            if let Some(f) = lookup_pattern(&self.equations, &format!("{name}Final")) {
                return Some(*f);
            }
        }
        lookup_pattern(&self.equations, name).copied()
    }

    fn validate(&self) -> FvResult<()> {
        for (section, table) in [("fields", &self.fields), ("equations", &self.equations)] {
            for (key, &factor) in table {
                if !(factor > 0.0 && factor <= 1.0) {
                    return Err(FvError::invalid_config(
                        format!("relaxationFactors.{section}.{key}"),
                        factor,
                        "松弛因子必须在 (0, 1] 内",
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// 汇总
// ============================================================================

/// 求解控制配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FvSolution {
    /// 场名模式 → 线性求解器控制
    #[serde(default)]
    pub solvers: BTreeMap<String, LinearSolverControls>,
    /// 外迭代控制
    #[serde(default, rename = "PIMPLE", alias = "SIMPLE", alias = "PISO")]
    pub algorithm: OuterLoopControls,
    /// 欠松弛因子
    #[serde(default, rename = "relaxationFactors")]
    pub relaxation_factors: RelaxationFactors,
}

impl FvSolution {
    /// 从字典构造并校验
    pub fn from_dict(dict: &Dictionary) -> FvResult<Self> {
        let solution: Self = serde_json::from_value(dict.to_value())
            .map_err(|e| FvError::invalid_config(dict.scope(), "fvSolution", e.to_string()))?;
        solution.validate()?;
        Ok(solution)
    }

    /// 校验所有条目
    pub fn validate(&self) -> FvResult<()> {
        for (key, controls) in &self.solvers {
            controls.validate(key)?;
        }
        self.relaxation_factors.validate()
    }

    /// 某个场的线性求解器控制
    ///
    /// `final_iter` 为真时先查 `<field>Final`。找不到时返回
    /// [`FvError::MissingConfigurationKey`]。
    pub fn solver_controls(&self, field: &str, final_iter: bool) -> FvResult<&LinearSolverControls> {
        if final_iter {
            if let Some(c) = lookup_pattern(&self.solvers, &format!("{field}Final")) {
                return Ok(c);
            }
        }
        lookup_pattern(&self.solvers, field)
            .ok_or_else(|| FvError::missing_key(field, "fvSolution.solvers"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> FvSolution {
        let dict = Dictionary::from_value(
            "fvSolution",
            json!({
                "solvers": {
                    "p": { "solver": "PCG", "preconditioner": "DIC", "tolerance": 1e-6, "relTol": 0.05 },
                    "pFinal": { "solver": "PCG", "preconditioner": "DIC", "tolerance": 1e-6, "relTol": 0 },
                    "(U|k|epsilon)": { "solver": "smoothSolver", "tolerance": 1e-5, "nSweeps": 2 }
                },
                "PIMPLE": {
                    "nOuterCorrectors": 3,
                    "nCorrectors": 2,
                    "residualControl": { "p": 1e-4, "(U|T)": 1e-5 }
                },
                "relaxationFactors": {
                    "fields": { "p": 0.3 },
                    "equations": { "U": 0.7, ".*": 1 }
                }
            }),
        )
        .unwrap();
        FvSolution::from_dict(&dict).unwrap()
    }

    #[test]
    fn test_key_matches() {
        assert!(key_matches("p", "p"));
        assert!(key_matches("(U|k)", "k"));
        assert!(!key_matches("(U|k)", "p"));
        assert!(key_matches(".*", "anything"));
    }

    #[test]
    fn test_solver_lookup() {
        let s = sample();
        let p = s.solver_controls("p", false).unwrap();
        assert_eq!(p.solver, LinearSolverKind::Pcg);
        assert_eq!(p.preconditioner, PreconditionerKind::Dic);
        assert_eq!(p.rel_tol, 0.05);

        let p_final = s.solver_controls("p", true).unwrap();
        assert_eq!(p_final.rel_tol, 0.0);

        let k = s.solver_controls("k", true).unwrap();
        assert_eq!(k.solver, LinearSolverKind::SmoothSolver);
        assert_eq!(k.n_sweeps, 2);
        assert_eq!(k.max_iter, DEFAULT_MAX_ITERATIONS);

        assert!(matches!(
            s.solver_controls("T", false),
            Err(FvError::MissingConfigurationKey { .. })
        ));
    }

    #[test]
    fn test_outer_loop_controls() {
        let s = sample();
        assert_eq!(s.algorithm.n_outer_correctors, 3);
        assert_eq!(s.algorithm.n_correctors, 2);
        assert_eq!(s.algorithm.n_non_orthogonal_correctors, 0);
        assert_eq!(s.algorithm.residual_threshold("T"), Some(1e-5));
        assert_eq!(s.algorithm.residual_threshold("k"), None);
    }

    #[test]
    fn test_simple_alias() {
        let dict = Dictionary::from_value(
            "fvSolution",
            json!({ "SIMPLE": { "nNonOrthogonalCorrectors": 2 } }),
        )
        .unwrap();
        let s = FvSolution::from_dict(&dict).unwrap();
        assert_eq!(s.algorithm.n_non_orthogonal_correctors, 2);
    }

    #[test]
    fn test_relaxation_lookup() {
        let s = sample();
        assert_eq!(s.relaxation_factors.field_factor("p"), Some(0.3));
        assert_eq!(s.relaxation_factors.field_factor("U"), None);
        assert_eq!(s.relaxation_factors.equation_factor("U", false), Some(0.7));
        assert_eq!(s.relaxation_factors.equation_factor("T", false), Some(1.0));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dict = Dictionary::from_value(
            "fvSolution",
            json!({ "relaxationFactors": { "equations": { "U": 1.5 } } }),
        )
        .unwrap();
        assert!(FvSolution::from_dict(&dict).is_err());

        let dict = Dictionary::from_value(
            "fvSolution",
            json!({ "solvers": { "p": { "minIter": 10, "maxIter": 5 } } }),
        )
        .unwrap();
        assert!(FvSolution::from_dict(&dict).is_err());

        let dict = Dictionary::from_value(
            "fvSolution",
            json!({ "solvers": { "p": { "solver": "GAMG" } } }),
        )
        .unwrap();
        assert!(FvSolution::from_dict(&dict).is_err());
    }

    #[test]
    fn test_converged() {
        let c = LinearSolverControls {
            tolerance: 1e-6,
            rel_tol: 0.1,
            min_iter: 2,
            ..LinearSolverControls::default()
        };
        assert!(!c.converged(1, 1.0, 1e-9));
        assert!(c.converged(2, 1.0, 1e-9));
        assert!(c.converged(3, 1.0, 0.05));
        assert!(!c.converged(3, 1.0, 0.5));
    }
}
