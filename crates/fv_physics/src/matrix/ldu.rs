// crates/fv_physics/src/matrix/ldu.rs

//! 按面寻址的 LDU 矩阵
//!
//! 对角元按单元存放，非对角元按内部面存放：
//!
//! - `upper[f]`: owner 行、neighbour 列
//! - `lower[f]`: neighbour 行、owner 列
//!
//! 对称矩阵只存 `upper`，第一次写 `lower` 时复制一份变为非对称。
//! 纯对角矩阵两者都不存。

use crate::numerics::linear_algebra::{CsrBuilder, CsrMatrix};
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;

/// LDU 矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct LduMatrix {
    lower_addr: Vec<usize>,
    upper_addr: Vec<usize>,
    diag: Vec<f64>,
    upper: Option<Vec<f64>>,
    lower: Option<Vec<f64>>,
}

impl LduMatrix {
    /// 网格寻址上的零矩阵（纯对角）
    pub fn new(mesh: &FvMesh) -> Self {
        Self::from_addressing(mesh.n_cells(), mesh.lower_addr().to_vec(), mesh.upper_addr().to_vec())
    }

    /// 由寻址构造零矩阵
    pub fn from_addressing(n_cells: usize, lower_addr: Vec<usize>, upper_addr: Vec<usize>) -> Self {
        debug_assert_eq!(lower_addr.len(), upper_addr.len());
        Self {
            lower_addr,
            upper_addr,
            diag: vec![0.0; n_cells],
            upper: None,
            lower: None,
        }
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.diag.len()
    }

    /// 内部面数
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.lower_addr.len()
    }

    /// 面的 owner 单元
    #[inline]
    pub fn lower_addr(&self) -> &[usize] {
        &self.lower_addr
    }

    /// 面的 neighbour 单元
    #[inline]
    pub fn upper_addr(&self) -> &[usize] {
        &self.upper_addr
    }

    /// 对角元
    #[inline]
    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    /// 可变对角元
    #[inline]
    pub fn diag_mut(&mut self) -> &mut [f64] {
        &mut self.diag
    }

    /// 上三角系数，未分配时为 None
    #[inline]
    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    /// 下三角系数，对称时返回上三角
    #[inline]
    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref().or(self.upper.as_deref())
    }

    /// 可变上三角，按需分配
    pub fn upper_mut(&mut self) -> &mut [f64] {
        let n = self.n_faces();
        self.upper.get_or_insert_with(|| vec![0.0; n])
    }

    /// 可变下三角，按需分配；对称矩阵先复制上三角
    pub fn lower_mut(&mut self) -> &mut [f64] {
        if self.lower.is_none() {
            let init = self.upper.clone().unwrap_or_else(|| vec![0.0; self.n_faces()]);
            self.lower = Some(init);
        }
        self.lower.get_or_insert_with(Vec::new)
    }

    /// 同时取可变上、下三角
    pub fn upper_lower_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        self.upper_mut();
        self.lower_mut();
        match (self.upper.as_deref_mut(), self.lower.as_deref_mut()) {
            (Some(u), Some(l)) => (u, l),
            _ => (Default::default(), Default::default()),
        }
    }

    /// 是否只有对角
    #[inline]
    pub fn is_diagonal(&self) -> bool {
        self.upper.is_none() && self.lower.is_none()
    }

    /// 是否对称存储
    #[inline]
    pub fn is_symmetric(&self) -> bool {
        self.upper.is_some() && self.lower.is_none()
    }

    /// 是否非对称存储
    #[inline]
    pub fn is_asymmetric(&self) -> bool {
        self.lower.is_some()
    }

    // ========================================================================
    // 组装
    // ========================================================================

    /// 对角元取非对角元负和：`diag[l] -= lower`，`diag[u] -= upper`
    pub fn neg_sum_diag(&mut self) {
        let (Some(upper), Some(lower)) = (self.upper.clone(), self.lower().map(<[f64]>::to_vec)) else {
            return;
        };
        for f in 0..self.lower_addr.len() {
            self.diag[self.lower_addr[f]] -= lower[f];
            self.diag[self.upper_addr[f]] -= upper[f];
        }
    }

    /// 各行非对角元绝对值之和累加到 `sum_off`
    pub fn sum_mag_off_diag(&self, sum_off: &mut [f64]) {
        let (Some(upper), Some(lower)) = (self.upper(), self.lower()) else {
            return;
        };
        for f in 0..self.lower_addr.len() {
            sum_off[self.upper_addr[f]] += lower[f].abs();
            sum_off[self.lower_addr[f]] += upper[f].abs();
        }
    }

    fn check_addressing(&self, other: &Self) -> FvResult<()> {
        FvError::check_size("LduMatrix 单元数", self.n_cells(), other.n_cells())?;
        FvError::check_size("LduMatrix 面数", self.n_faces(), other.n_faces())
    }

    /// `self += other`
    pub fn add_matrix(&mut self, other: &Self) -> FvResult<()> {
        self.combine(other, 1.0)
    }

    /// `self -= other`
    pub fn sub_matrix(&mut self, other: &Self) -> FvResult<()> {
        self.combine(other, -1.0)
    }

    fn combine(&mut self, other: &Self, sign: f64) -> FvResult<()> {
        self.check_addressing(other)?;
        for (d, o) in self.diag.iter_mut().zip(&other.diag) {
            *d += sign * o;
        }
        if other.is_diagonal() {
            return Ok(());
        }
        if other.is_asymmetric() || self.is_asymmetric() {
            let (upper, lower) = self.upper_lower_mut();
            let o_upper = other.upper.as_deref();
            let o_lower = other.lower();
            for f in 0..upper.len() {
                upper[f] += sign * o_upper.map_or(0.0, |u| u[f]);
                lower[f] += sign * o_lower.map_or(0.0, |l| l[f]);
            }
        } else if let Some(o_upper) = other.upper.as_deref() {
            for (u, o) in self.upper_mut().iter_mut().zip(o_upper) {
                *u += sign * o;
            }
        }
        Ok(())
    }

    /// 所有系数乘 `factor`
    pub fn scale(&mut self, factor: f64) {
        self.diag.iter_mut().for_each(|d| *d *= factor);
        for coeffs in [self.upper.as_mut(), self.lower.as_mut()].into_iter().flatten() {
            coeffs.iter_mut().for_each(|c| *c *= factor);
        }
    }

    /// 所有系数取负
    pub fn negate(&mut self) {
        self.scale(-1.0);
    }

    // ========================================================================
    // 运算
    // ========================================================================

    /// `out = A·x`
    pub fn amul(&self, x: &[f64], out: &mut [f64]) {
        for ((o, &d), &xi) in out.iter_mut().zip(&self.diag).zip(x) {
            *o = d * xi;
        }
        let (Some(upper), Some(lower)) = (self.upper(), self.lower()) else {
            return;
        };
        for f in 0..self.lower_addr.len() {
            let (l, u) = (self.lower_addr[f], self.upper_addr[f]);
            out[u] += lower[f] * x[l];
            out[l] += upper[f] * x[u];
        }
    }

    /// 邻居贡献取负：`out[c] = -Σ a_nb·x_nb`
    pub fn h_mul(&self, x: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        let (Some(upper), Some(lower)) = (self.upper(), self.lower()) else {
            return;
        };
        for f in 0..self.lower_addr.len() {
            let (l, u) = (self.lower_addr[f], self.upper_addr[f]);
            out[u] -= lower[f] * x[l];
            out[l] -= upper[f] * x[u];
        }
    }

    /// 导出 CSR，`extra_diag` 叠加到对角元（边界隐式系数）
    pub fn to_csr(&self, extra_diag: &[f64]) -> CsrMatrix {
        let n = self.n_cells();
        let mut builder = CsrBuilder::new_square(n);
        for c in 0..n {
            builder.set(c, c, self.diag[c] + extra_diag.get(c).copied().unwrap_or(0.0));
        }
        if let (Some(upper), Some(lower)) = (self.upper(), self.lower()) {
            for f in 0..self.lower_addr.len() {
                let (l, u) = (self.lower_addr[f], self.upper_addr[f]);
                builder.add(l, u, upper[f]);
                builder.add(u, l, lower[f]);
            }
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 三个单元串联：0-1, 1-2
    fn chain() -> LduMatrix {
        LduMatrix::from_addressing(3, vec![0, 1], vec![1, 2])
    }

    #[test]
    fn test_symmetric_to_asymmetric() {
        let mut m = chain();
        assert!(m.is_diagonal());
        m.upper_mut().copy_from_slice(&[-1.0, -2.0]);
        assert!(m.is_symmetric());
        assert_eq!(m.lower().unwrap(), &[-1.0, -2.0]);
        m.lower_mut()[0] = -3.0;
        assert!(m.is_asymmetric());
        assert_eq!(m.upper().unwrap(), &[-1.0, -2.0]);
        assert_eq!(m.lower().unwrap(), &[-3.0, -2.0]);
    }

    #[test]
    fn test_neg_sum_diag_conserves_columns() {
        let mut m = chain();
        let (u, l) = m.upper_lower_mut();
        u.copy_from_slice(&[-1.0, -2.0]);
        l.copy_from_slice(&[-0.5, -4.0]);
        m.neg_sum_diag();
        assert_eq!(m.diag(), &[0.5, 5.0, 2.0]);
        // 列和为零：所有行之和为零
        let mut ax = [0.0; 3];
        m.amul(&[1.0; 3], &mut ax);
        assert!(ax.iter().sum::<f64>().abs() < 1e-14);
        let mut sum_off = [0.0; 3];
        m.sum_mag_off_diag(&mut sum_off);
        assert_eq!(sum_off, [1.0, 2.5, 4.0]);
    }

    #[test]
    fn test_amul_matches_csr() {
        let mut m = chain();
        m.diag_mut().copy_from_slice(&[4.0, 5.0, 6.0]);
        let (u, l) = m.upper_lower_mut();
        u.copy_from_slice(&[1.0, 2.0]);
        l.copy_from_slice(&[3.0, 7.0]);
        let csr = m.to_csr(&[0.0, 0.0, 1.0]);
        assert_eq!(csr.get(0, 1), 1.0);
        assert_eq!(csr.get(1, 0), 3.0);
        assert_eq!(csr.get(2, 2), 7.0);

        let x = [1.0, -1.0, 2.0];
        let mut ax = [0.0; 3];
        m.amul(&x, &mut ax);
        assert_eq!(ax, [4.0 - 1.0, 3.0 - 5.0 + 4.0, 7.0 * -1.0 + 12.0]);

        let mut h = [0.0; 3];
        m.h_mul(&x, &mut h);
        assert_eq!(h, [1.0, -7.0, 7.0]);
    }

    #[test]
    fn test_combine_mixed_storage() {
        let mut a = chain();
        a.upper_mut().copy_from_slice(&[1.0, 1.0]);
        let mut b = chain();
        b.diag_mut().fill(2.0);
        let (u, l) = b.upper_lower_mut();
        u.copy_from_slice(&[1.0, 0.0]);
        l.copy_from_slice(&[0.0, 1.0]);
        a.add_matrix(&b).unwrap();
        assert_eq!(a.diag(), &[2.0, 2.0, 2.0]);
        assert_eq!(a.upper().unwrap(), &[2.0, 1.0]);
        assert_eq!(a.lower().unwrap(), &[1.0, 2.0]);
        a.sub_matrix(&b).unwrap();
        assert_eq!(a.lower().unwrap(), &[1.0, 1.0]);
        assert!(a.add_matrix(&LduMatrix::from_addressing(2, vec![0], vec![1])).is_err());
    }
}
