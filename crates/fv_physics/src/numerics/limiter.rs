// crates/fv_physics/src/numerics/limiter.rs

//! NVD/TVD 限制器
//!
//! 限制器由面上的梯度比 `r` 给出混合因子 `λ ∈ [0, 1]`，面权重取
//! `λ·w_linear + (1 - λ)·w_upwind`。两组权重之和都为一，
//! 因此混合后的权重之和也为一，均匀场的散度严格为零。
//!
//! # 梯度比
//!
//! ```text
//! gradf  = φ_N - φ_P
//! gradcf = d · (∇φ)_C        C 为迎风单元
//! r      = 2·gradcf/gradf - 1
//! ```
//!
//! `|gradcf| ≥ 1000·|gradf|` 时取 `r = 2000·sign(gradcf)·sign(gradf) - 1`，
//! 避免除以零。`sign(0) = 1`。

use fv_config::ConvectionScheme;
use fv_foundation::float::SMALL;
use std::fmt::Debug;

/// 零通量时视为正向
#[inline]
pub fn pos0(flux: f64) -> f64 {
    if flux >= 0.0 {
        1.0
    } else {
        0.0
    }
}

#[inline]
fn sign(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// 面上的梯度比 `r`
///
/// - `face_flux`: 面通量，决定迎风单元
/// - `phi_p`, `phi_n`: owner 和 neighbour 单元值
/// - `dgrad_p`, `dgrad_n`: `d·(∇φ)_P` 和 `d·(∇φ)_N`，`d = C_N - C_P`
pub fn nvd_r(face_flux: f64, phi_p: f64, phi_n: f64, dgrad_p: f64, dgrad_n: f64) -> f64 {
    let gradf = phi_n - phi_p;
    let gradcf = if face_flux >= 0.0 { dgrad_p } else { dgrad_n };

    if gradcf.abs() >= 1000.0 * gradf.abs() {
        2.0 * 1000.0 * sign(gradcf) * sign(gradf) - 1.0
    } else {
        2.0 * (gradcf / gradf) - 1.0
    }
}

/// 限制器 trait
pub trait Limiter: Debug + Send + Sync {
    /// 由梯度比计算混合因子，结果在 `[0, 1]` 内
    fn limiter(&self, r: f64) -> f64;

    /// 名称
    fn name(&self) -> &'static str;
}

// ============================================================
// 具体限制器
// ============================================================

/// limitedLinear：`λ = max(min(2r/k', 1), 0)`，`k' = max(k/2, SMALL)`
///
/// `k = 0` 退化为线性插值，`k = 1` 最强限制。
#[derive(Debug, Clone, Copy)]
pub struct LimitedLinear {
    two_by_k: f64,
}

impl LimitedLinear {
    /// 以系数 `k ∈ [0, 1]` 创建
    pub fn new(k: f64) -> Self {
        let k = (k / 2.0).max(SMALL);
        Self { two_by_k: 2.0 / k }
    }
}

impl Limiter for LimitedLinear {
    #[inline]
    fn limiter(&self, r: f64) -> f64 {
        (self.two_by_k * r).min(1.0).max(0.0)
    }

    fn name(&self) -> &'static str {
        "limitedLinear"
    }
}

/// van Leer：`λ = (r + |r|)/(1 + |r|)`
#[derive(Debug, Clone, Copy, Default)]
pub struct VanLeer;

impl Limiter for VanLeer {
    #[inline]
    fn limiter(&self, r: f64) -> f64 {
        (r + r.abs()) / (1.0 + r.abs())
    }

    fn name(&self) -> &'static str {
        "vanLeer"
    }
}

/// Minmod：`λ = max(min(r, 1), 0)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Minmod;

impl Limiter for Minmod {
    #[inline]
    fn limiter(&self, r: f64) -> f64 {
        r.min(1.0).max(0.0)
    }

    fn name(&self) -> &'static str {
        "Minmod"
    }
}

/// SuperBee：`λ = max(max(min(2r, 1), min(r, 2)), 0)`
///
/// 结果可超过 1，在 [`limited_weight`] 中截断。
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperBee;

impl Limiter for SuperBee {
    #[inline]
    fn limiter(&self, r: f64) -> f64 {
        (2.0 * r).min(1.0).max(r.min(2.0)).max(0.0)
    }

    fn name(&self) -> &'static str {
        "SuperBee"
    }
}

/// 限制型格式对应的限制器，非限制型格式返回 None
pub fn limiter_for(scheme: ConvectionScheme) -> Option<Box<dyn Limiter>> {
    match scheme {
        ConvectionScheme::LimitedLinear(k) => Some(Box::new(LimitedLinear::new(k))),
        ConvectionScheme::VanLeer => Some(Box::new(VanLeer)),
        ConvectionScheme::Minmod => Some(Box::new(Minmod)),
        ConvectionScheme::SuperBee => Some(Box::new(SuperBee)),
        _ => None,
    }
}

/// 混合后的面权重 `λ·w_linear + (1 - λ)·pos0(φ)`
///
/// `λ` 截断到 `[0, 1]`，保证结果位于迎风和线性权重之间。
#[inline]
pub fn limited_weight(lambda: f64, linear_weight: f64, face_flux: f64) -> f64 {
    let lambda = lambda.clamp(0.0, 1.0);
    lambda * linear_weight + (1.0 - lambda) * pos0(face_flux)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiters_are_tvd() {
        let limiters: Vec<Box<dyn Limiter>> = vec![
            Box::new(LimitedLinear::new(1.0)),
            Box::new(VanLeer),
            Box::new(Minmod),
            Box::new(SuperBee),
        ];
        for lim in &limiters {
            // 极值处退化为迎风
            assert_eq!(lim.limiter(-1.0), 0.0, "{}", lim.name());
            assert_eq!(lim.limiter(0.0), 0.0, "{}", lim.name());
            // 光滑区恢复线性
            assert!((lim.limiter(1.0) - 1.0).abs() < 1e-12, "{}", lim.name());
            for i in 0..50 {
                let r = i as f64 * 0.2;
                let l = lim.limiter(r);
                assert!(l >= 0.0 && l <= 2.0, "{} r={r} l={l}", lim.name());
            }
        }
    }

    #[test]
    fn test_limited_linear_coefficient() {
        // k = 1 时 2/k' = 4
        assert!((LimitedLinear::new(1.0).limiter(0.1) - 0.4).abs() < 1e-12);
        // k → 0 退化为线性
        assert_eq!(LimitedLinear::new(0.0).limiter(1e-6), 1.0);
    }

    #[test]
    fn test_nvd_r() {
        // 线性分布：d·∇φ = φ_N - φ_P，r = 1
        assert!((nvd_r(1.0, 0.0, 1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
        // 逆流取 neighbour 梯度
        assert!((nvd_r(-1.0, 0.0, 1.0, 5.0, 0.5) - 0.0).abs() < 1e-12);
        // 面差为零时不除零
        assert_eq!(nvd_r(1.0, 1.0, 1.0, 0.0, 0.0), 1999.0);
        assert_eq!(nvd_r(1.0, 1.0, 1.0, -1.0, 0.0), -2001.0);
    }

    #[test]
    fn test_limited_weight_bounds() {
        assert_eq!(limited_weight(0.0, 0.5, 1.0), 1.0);
        assert_eq!(limited_weight(0.0, 0.5, -1.0), 0.0);
        assert_eq!(limited_weight(1.0, 0.5, -1.0), 0.5);
        assert_eq!(limited_weight(2.0, 0.5, 1.0), 0.5);
        assert!(limiter_for(ConvectionScheme::Linear).is_none());
        assert_eq!(limiter_for(ConvectionScheme::VanLeer).unwrap().name(), "vanLeer");
    }
}
