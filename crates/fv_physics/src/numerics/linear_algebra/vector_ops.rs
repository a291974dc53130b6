// crates/fv_physics/src/numerics/linear_algebra/vector_ops.rs

//! 稠密向量运算
//!
//! 迭代求解器使用的 BLAS-1 风格函数，全部要求长度一致。

/// 点积
#[inline]
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

/// 二范数
#[inline]
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

/// 无穷范数
#[inline]
pub fn norm_inf(x: &[f64]) -> f64 {
    x.iter().fold(0.0, |m, v| m.max(v.abs()))
}

/// 一范数（绝对值之和）
#[inline]
pub fn sum_mag(x: &[f64]) -> f64 {
    x.iter().map(|v| v.abs()).sum()
}

/// 算术平均
#[inline]
pub fn average(x: &[f64]) -> f64 {
    if x.is_empty() {
        0.0
    } else {
        x.iter().sum::<f64>() / x.len() as f64
    }
}

/// `y += alpha·x`
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// `y = x + beta·y`
#[inline]
pub fn xpay(x: &[f64], beta: f64, y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi = xi + beta * *yi;
    }
}

/// `x *= alpha`
#[inline]
pub fn scale(alpha: f64, x: &mut [f64]) {
    for xi in x {
        *xi *= alpha;
    }
}

/// `y = x`
#[inline]
pub fn copy(x: &[f64], y: &mut [f64]) {
    y.copy_from_slice(x);
}

/// 全部置为 `value`
#[inline]
pub fn fill(x: &mut [f64], value: f64) {
    x.fill(value);
}

/// `z = x - y`
#[inline]
pub fn sub(x: &[f64], y: &[f64], z: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), z.len());
    for ((zi, xi), yi) in z.iter_mut().zip(x).zip(y) {
        *zi = xi - yi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norms() {
        let x = [3.0, -4.0];
        assert_eq!(dot(&x, &x), 25.0);
        assert_eq!(norm2(&x), 5.0);
        assert_eq!(norm_inf(&x), 4.0);
        assert_eq!(sum_mag(&x), 7.0);
        assert_eq!(average(&x), -0.5);
        assert_eq!(average(&[]), 0.0);
    }

    #[test]
    fn test_updates() {
        let x = [1.0, 2.0];
        let mut y = [1.0, 1.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, [3.0, 5.0]);
        xpay(&x, 0.5, &mut y);
        assert_eq!(y, [2.5, 4.5]);
        scale(2.0, &mut y);
        assert_eq!(y, [5.0, 9.0]);

        let mut z = [0.0; 2];
        sub(&y, &x, &mut z);
        assert_eq!(z, [4.0, 7.0]);
        copy(&x, &mut z);
        assert_eq!(z, x);
        fill(&mut z, 0.0);
        assert_eq!(z, [0.0, 0.0]);
    }
}
