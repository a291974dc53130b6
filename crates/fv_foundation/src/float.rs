// crates/fv_foundation/src/float.rs

//! 数值常量与浮点辅助函数
//!
//! 有限体积离散中反复出现的小量阈值集中在此处定义。

// ============================================================================
// 数值常量
// ============================================================================

/// 小量，用于残差归一化和除零保护
pub const SMALL: f64 = 1e-15;

/// 极小量，用于限制器分母
pub const VSMALL: f64 = 1e-300;

/// 极小量的平方根
pub const ROOT_VSMALL: f64 = 1e-150;

/// 大数，表示“无上界”
pub const GREAT: f64 = 1e15;

/// 迭代求解器的默认最大迭代次数
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

// ============================================================================
// 辅助函数
// ============================================================================

/// 安全除法，分母绝对值小于 `VSMALL` 时返回 `fallback`
#[inline]
pub fn safe_div(a: f64, b: f64, fallback: f64) -> f64 {
    if b.abs() < VSMALL {
        fallback
    } else {
        let result = a / b;
        if result.is_finite() {
            result
        } else {
            fallback
        }
    }
}

/// 分母加符号一致的极小量后相除（限制器常用）
#[inline]
pub fn stabilise(x: f64, small: f64) -> f64 {
    if x >= 0.0 {
        x + small
    } else {
        x - small
    }
}

/// 相对误差意义下近似相等
#[inline]
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * (1.0 + a.abs().max(b.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div(1.0, 2.0, 0.0), 0.5);
        assert_eq!(safe_div(1.0, 0.0, -1.0), -1.0);
    }

    #[test]
    fn test_stabilise_keeps_sign() {
        assert!(stabilise(0.0, SMALL) > 0.0);
        assert!(stabilise(-1e-20, SMALL) < 0.0);
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(1.0, 1.0 + 1e-13, 1e-12));
        assert!(!approx_eq(1.0, 1.1, 1e-12));
    }
}
