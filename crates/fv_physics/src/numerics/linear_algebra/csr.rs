// crates/fv_physics/src/numerics/linear_algebra/csr.rs

//! 压缩稀疏行 (CSR) 矩阵
//!
//! 方程矩阵的 LDU 存储在交给迭代求解器前导出为 CSR。
//! 每行列索引严格递增，对角元总是显式存储。
//!
//! # 使用示例
//!
//! ```
//! use fv_physics::numerics::linear_algebra::CsrBuilder;
//!
//! let mut builder = CsrBuilder::new_square(2);
//! builder.set(0, 0, 2.0);
//! builder.set(0, 1, -1.0);
//! builder.set(1, 0, -1.0);
//! builder.set(1, 1, 2.0);
//! let matrix = builder.build();
//!
//! let mut y = vec![0.0; 2];
//! matrix.mul_vec(&[1.0, 1.0], &mut y);
//! assert_eq!(y, vec![1.0, 1.0]);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use std::collections::BTreeMap;

// ============================================================
// 稀疏模式
// ============================================================

/// CSR 稀疏模式（不含数值）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrPattern {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl CsrPattern {
    /// 由行指针和列索引构造
    pub fn new(n_rows: usize, n_cols: usize, row_ptr: Vec<usize>, col_idx: Vec<usize>) -> Self {
        debug_assert_eq!(row_ptr.len(), n_rows + 1, "row_ptr 长度必须为 n_rows + 1");
        debug_assert_eq!(row_ptr[n_rows], col_idx.len(), "row_ptr 末尾必须等于 nnz");
        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
        }
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 非零元数
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// 行指针
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// 列索引
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// 某行的列索引
    #[inline]
    pub fn row_indices(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// 查找 `(row, col)` 在值数组中的位置
    pub fn find_index(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        self.row_indices(row)
            .binary_search(&col)
            .ok()
            .map(|local| start + local)
    }
}

// ============================================================
// 矩阵
// ============================================================

/// CSR 矩阵
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    pattern: CsrPattern,
    values: Vec<f64>,
}

/// 行视图
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    /// 列索引
    pub col_idx: &'a [usize],
    /// 数值
    pub values: &'a [f64],
}

impl<'a> RowView<'a> {
    /// 遍历 `(col, value)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.col_idx.iter().copied().zip(self.values.iter().copied())
    }
}

impl CsrMatrix {
    /// 由模式和数值构造
    pub fn from_pattern(pattern: CsrPattern, values: Vec<f64>) -> Self {
        debug_assert_eq!(pattern.nnz(), values.len(), "col_idx 和 values 长度必须相等");
        Self { pattern, values }
    }

    /// 对角矩阵
    pub fn diagonal(diag: &[f64]) -> Self {
        let mut builder = CsrBuilder::new_square(diag.len());
        for (i, &v) in diag.iter().enumerate() {
            builder.set(i, i, v);
        }
        builder.build()
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.pattern.n_rows()
    }

    /// 列数
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.pattern.n_cols()
    }

    /// 非零元数
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 稀疏模式
    #[inline]
    pub fn pattern(&self) -> &CsrPattern {
        &self.pattern
    }

    /// 数值
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 可变数值
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// 行指针
    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        self.pattern.row_ptr()
    }

    /// 列索引
    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        self.pattern.col_idx()
    }

    /// 取元素，不在模式中返回 0
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.pattern
            .find_index(row, col)
            .map_or(0.0, |idx| self.values[idx])
    }

    /// 设置元素，不在模式中返回 false
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> bool {
        match self.pattern.find_index(row, col) {
            Some(idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }

    /// 累加元素，不在模式中返回 false
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> bool {
        match self.pattern.find_index(row, col) {
            Some(idx) => {
                self.values[idx] += value;
                true
            }
            None => false,
        }
    }

    /// 行视图
    #[inline]
    pub fn row(&self, row: usize) -> RowView<'_> {
        let start = self.pattern.row_ptr[row];
        let end = self.pattern.row_ptr[row + 1];
        RowView {
            col_idx: &self.pattern.col_idx[start..end],
            values: &self.values[start..end],
        }
    }

    /// 对角元
    #[inline]
    pub fn diagonal_value(&self, row: usize) -> Option<f64> {
        self.pattern.find_index(row, row).map(|idx| self.values[idx])
    }

    /// 提取对角线
    pub fn extract_diagonal(&self) -> Vec<f64> {
        (0..self.n_rows())
            .map(|i| self.diagonal_value(i).unwrap_or(0.0))
            .collect()
    }

    /// 每行元素之和
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n_rows())
            .map(|i| self.row(i).values.iter().sum())
            .collect()
    }

    /// `y = A·x`
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        for (row, out) in y.iter_mut().enumerate() {
            *out = self.row_dot(row, x);
        }
    }

    /// `y += alpha·A·x`
    pub fn mul_vec_add(&self, alpha: f64, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        for (row, out) in y.iter_mut().enumerate() {
            *out += alpha * self.row_dot(row, x);
        }
    }

    /// 并行 `y = A·x`
    #[cfg(feature = "parallel")]
    pub fn mul_vec_parallel(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        y.par_iter_mut()
            .enumerate()
            .for_each(|(row, out)| *out = self.row_dot(row, x));
    }

    #[inline]
    fn row_dot(&self, row: usize, x: &[f64]) -> f64 {
        let start = self.pattern.row_ptr[row];
        let end = self.pattern.row_ptr[row + 1];
        let mut sum = 0.0;
        for idx in start..end {
            sum += self.values[idx] * x[self.pattern.col_idx[idx]];
        }
        sum
    }

    /// 是否对称（容差 `tol`）
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if self.n_rows() != self.n_cols() {
            return false;
        }
        (0..self.n_rows()).all(|row| {
            self.row(row)
                .iter()
                .all(|(col, v)| (v - self.get(col, row)).abs() <= tol * v.abs().max(1.0))
        })
    }

    /// 所有元素乘以 `s`
    pub fn scale(&mut self, s: f64) {
        for v in &mut self.values {
            *v *= s;
        }
    }
}

// ============================================================
// 构建器
// ============================================================

/// 逐元素组装 CSR 矩阵
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    n_cols: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    /// 方阵构建器
    pub fn new_square(n: usize) -> Self {
        Self::new(n, n)
    }

    /// 一般矩阵构建器
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// 设置元素（覆盖）
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.rows[row].insert(col, value);
    }

    /// 累加元素
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        *self.rows[row].entry(col).or_insert(0.0) += value;
    }

    /// 只生成稀疏模式
    pub fn build_pattern(&self) -> CsrPattern {
        let mut row_ptr = Vec::with_capacity(self.rows.len() + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for row in &self.rows {
            col_idx.extend(row.keys().copied());
            row_ptr.push(col_idx.len());
        }
        CsrPattern::new(self.rows.len(), self.n_cols, row_ptr, col_idx)
    }

    /// 生成矩阵
    pub fn build(self) -> CsrMatrix {
        let pattern = self.build_pattern();
        let values = self
            .rows
            .into_iter()
            .flat_map(|row| row.into_values())
            .collect();
        CsrMatrix::from_pattern(pattern, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiagonal(n: usize) -> CsrMatrix {
        let mut builder = CsrBuilder::new_square(n);
        for i in 0..n {
            builder.set(i, i, 2.0);
            if i > 0 {
                builder.set(i, i - 1, -1.0);
            }
            if i + 1 < n {
                builder.set(i, i + 1, -1.0);
            }
        }
        builder.build()
    }

    #[test]
    fn test_builder_sorted_columns() {
        let mut builder = CsrBuilder::new_square(2);
        builder.set(0, 1, 3.0);
        builder.set(0, 0, 1.0);
        builder.add(0, 1, 1.0);
        let m = builder.build();
        assert_eq!(m.row(0).col_idx, &[0, 1]);
        assert_eq!(m.get(0, 1), 4.0);
        assert_eq!(m.get(1, 0), 0.0);
        assert_eq!(m.nnz(), 2);
    }

    #[test]
    fn test_mul_vec() {
        let m = tridiagonal(4);
        let mut y = vec![0.0; 4];
        m.mul_vec(&[1.0, 2.0, 3.0, 4.0], &mut y);
        assert_eq!(y, vec![0.0, 0.0, 0.0, 5.0]);

        m.mul_vec_add(2.0, &[1.0, 1.0, 1.0, 1.0], &mut y);
        assert_eq!(y, vec![2.0, 0.0, 0.0, 7.0]);
    }

    #[test]
    fn test_diagonal_and_symmetry() {
        let m = tridiagonal(3);
        assert_eq!(m.extract_diagonal(), vec![2.0; 3]);
        assert!(m.is_symmetric(1e-12));
        assert_eq!(m.row_sums(), vec![1.0, 0.0, 1.0]);

        let mut a = m.clone();
        assert!(a.set(0, 1, -2.0));
        assert!(!a.set(0, 2, 1.0));
        assert!(!a.is_symmetric(1e-12));
    }

    #[test]
    fn test_diagonal_matrix() {
        let mut d = CsrMatrix::diagonal(&[1.0, 2.0]);
        d.scale(3.0);
        assert_eq!(d.diagonal_value(1), Some(6.0));
        assert_eq!(d.pattern().find_index(0, 1), None);
    }
}
