// crates/fv_physics/src/matrix/fv_matrix.rs

//! 有限体积方程矩阵
//!
//! [`FvMatrix`] 表示表达式 `A·ψ - b`：
//!
//! - `A` 为 LDU 矩阵加上边界隐式系数 `internal_coeffs`
//! - `b` 为 `source` 加上边界显式系数 `boundary_coeffs`
//!
//! 所有系数都已乘单元体积（面积分形式），方程量纲为 `ψ·体积/时间` 一类。
//!
//! # 符号约定
//!
//! | 项 | 效果 |
//! |----|------|
//! | `A + f` | `source -= V·f` |
//! | `A - f` | `source += V·f` |
//! | `A == f` | `source += V·f` |
//! | `A == B` | `A - B` |

use super::ldu::LduMatrix;
use crate::field::{FieldValue, VolField};
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use std::ops::{Add, Neg, Sub};

/// 方程矩阵
#[derive(Debug, Clone, PartialEq)]
pub struct FvMatrix<T: FieldValue> {
    psi_name: String,
    psi_dimensions: DimensionSet,
    dimensions: DimensionSet,
    ldu: LduMatrix,
    source: Vec<T>,
    internal_coeffs: Vec<Vec<f64>>,
    boundary_coeffs: Vec<Vec<T>>,
    face_cells: Vec<Vec<usize>>,
    coupled: Vec<bool>,
}

impl<T: FieldValue> FvMatrix<T> {
    /// 未知量 `psi` 的零方程，`dimensions` 为方程量纲
    pub fn new(psi: &VolField<T>, mesh: &FvMesh, dimensions: DimensionSet) -> Self {
        let patches = mesh.patches();
        Self {
            psi_name: psi.name().to_string(),
            psi_dimensions: psi.dimensions(),
            dimensions,
            ldu: LduMatrix::new(mesh),
            source: vec![T::ZERO; mesh.n_cells()],
            internal_coeffs: patches.iter().map(|p| vec![0.0; p.size]).collect(),
            boundary_coeffs: patches.iter().map(|p| vec![T::ZERO; p.size]).collect(),
            face_cells: (0..patches.len()).map(|i| mesh.patch_face_cells(i).to_vec()).collect(),
            coupled: psi.boundary().iter().map(|pf| pf.is_coupled()).collect(),
        }
    }

    // ========================================================================
    // 访问
    // ========================================================================

    /// 未知量名称
    #[inline]
    pub fn psi_name(&self) -> &str {
        &self.psi_name
    }

    /// 未知量量纲
    #[inline]
    pub fn psi_dimensions(&self) -> DimensionSet {
        self.psi_dimensions
    }

    /// 方程量纲
    #[inline]
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// 单元数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.source.len()
    }

    /// LDU 部分
    #[inline]
    pub fn ldu(&self) -> &LduMatrix {
        &self.ldu
    }

    /// 可变 LDU 部分
    #[inline]
    pub fn ldu_mut(&mut self) -> &mut LduMatrix {
        &mut self.ldu
    }

    /// 对角元（不含边界系数）
    #[inline]
    pub fn diag(&self) -> &[f64] {
        self.ldu.diag()
    }

    /// 源项
    #[inline]
    pub fn source(&self) -> &[T] {
        &self.source
    }

    /// 可变源项
    #[inline]
    pub fn source_mut(&mut self) -> &mut [T] {
        &mut self.source
    }

    /// 面片的隐式系数
    #[inline]
    pub fn internal_coeffs(&self, patch: usize) -> &[f64] {
        &self.internal_coeffs[patch]
    }

    /// 可变隐式系数
    #[inline]
    pub fn internal_coeffs_mut(&mut self, patch: usize) -> &mut [f64] {
        &mut self.internal_coeffs[patch]
    }

    /// 面片的显式系数
    #[inline]
    pub fn boundary_coeffs(&self, patch: usize) -> &[T] {
        &self.boundary_coeffs[patch]
    }

    /// 可变显式系数
    #[inline]
    pub fn boundary_coeffs_mut(&mut self, patch: usize) -> &mut [T] {
        &mut self.boundary_coeffs[patch]
    }

    /// 面片的相邻单元
    #[inline]
    pub fn face_cells(&self, patch: usize) -> &[usize] {
        &self.face_cells[patch]
    }

    /// 对角元加上边界隐式系数
    pub fn total_diag(&self) -> Vec<f64> {
        let mut diag = self.ldu.diag().to_vec();
        self.add_boundary_diag(&mut diag);
        diag
    }

    fn add_boundary_diag(&self, diag: &mut [f64]) {
        for (cells, coeffs) in self.face_cells.iter().zip(&self.internal_coeffs) {
            for (&c, &ic) in cells.iter().zip(coeffs) {
                diag[c] += ic;
            }
        }
    }

    /// 源项加上边界显式系数
    pub fn total_source(&self) -> Vec<T> {
        let mut source = self.source.clone();
        for (cells, coeffs) in self.face_cells.iter().zip(&self.boundary_coeffs) {
            for (&c, &bc) in cells.iter().zip(coeffs) {
                source[c] = source[c] + bc;
            }
        }
        source
    }

    // ========================================================================
    // 方程代数
    // ========================================================================

    fn check_compatible(&self, other: &Self, operation: &str) -> FvResult<()> {
        if self.psi_name != other.psi_name {
            return Err(FvError::invalid_input(format!(
                "方程 {operation}：未知量不同（{} 与 {}）",
                self.psi_name, other.psi_name
            )));
        }
        self.dimensions.check_same(
            &other.dimensions,
            &format!("fvMatrix<{}> {operation}", self.psi_name),
        )?;
        Ok(())
    }

    fn combine(&mut self, other: &Self, sign: f64) -> FvResult<()> {
        if sign > 0.0 {
            self.ldu.add_matrix(&other.ldu)?;
        } else {
            self.ldu.sub_matrix(&other.ldu)?;
        }
        for (s, &o) in self.source.iter_mut().zip(&other.source) {
            *s = *s + o * sign;
        }
        for (mine, theirs) in self.internal_coeffs.iter_mut().zip(&other.internal_coeffs) {
            for (m, &t) in mine.iter_mut().zip(theirs) {
                *m += t * sign;
            }
        }
        for (mine, theirs) in self.boundary_coeffs.iter_mut().zip(&other.boundary_coeffs) {
            for (m, &t) in mine.iter_mut().zip(theirs) {
                *m = *m + t * sign;
            }
        }
        Ok(())
    }

    /// `self += other`
    pub fn try_add(&mut self, other: &Self) -> FvResult<()> {
        self.check_compatible(other, "+=")?;
        self.combine(other, 1.0)
    }

    /// `self -= other`
    pub fn try_sub(&mut self, other: &Self) -> FvResult<()> {
        self.check_compatible(other, "-=")?;
        self.combine(other, -1.0)
    }

    /// 整个方程取负
    pub fn negate(&mut self) {
        self.scale_coefficients(-1.0);
    }

    fn scale_coefficients(&mut self, factor: f64) {
        self.ldu.scale(factor);
        for s in &mut self.source {
            *s = *s * factor;
        }
        for coeffs in &mut self.internal_coeffs {
            coeffs.iter_mut().for_each(|c| *c *= factor);
        }
        for coeffs in &mut self.boundary_coeffs {
            coeffs.iter_mut().for_each(|c| *c = *c * factor);
        }
    }

    /// 整个方程乘带量纲常数
    pub fn scaled(mut self, factor: f64, dimensions: DimensionSet) -> Self {
        self.scale_coefficients(factor);
        self.dimensions = self.dimensions * dimensions;
        self
    }

    /// `self == other`，即 `self - other`
    pub fn eq_matrix(mut self, other: &Self) -> FvResult<Self> {
        self.check_compatible(other, "==")?;
        self.combine(other, -1.0)?;
        Ok(self)
    }

    fn check_field(&self, field_dims: DimensionSet, field_name: &str, operation: &str) -> FvResult<()> {
        (field_dims * DimensionSet::VOLUME).check_same(
            &self.dimensions,
            &format!("fvMatrix<{}> {operation} {field_name}", self.psi_name),
        )?;
        Ok(())
    }

    fn add_volume_weighted(&mut self, mesh: &FvMesh, values: &[T], sign: f64) -> FvResult<()> {
        FvError::check_size("源项场", self.n_cells(), values.len())?;
        for ((s, &v), &vol) in self.source.iter_mut().zip(values).zip(mesh.v()) {
            *s = *s + v * (vol * sign);
        }
        Ok(())
    }

    /// `self == f`：`source += V·f`
    pub fn eq_field(mut self, mesh: &FvMesh, field: &VolField<T>) -> FvResult<Self> {
        self.check_field(field.dimensions(), field.name(), "==")?;
        self.add_volume_weighted(mesh, field.internal(), 1.0)?;
        Ok(self)
    }

    /// `self == 常量`
    pub fn eq_value(mut self, mesh: &FvMesh, dimensions: DimensionSet, value: T) -> FvResult<Self> {
        self.check_field(dimensions, "常量", "==")?;
        let values = vec![value; self.n_cells()];
        self.add_volume_weighted(mesh, &values, 1.0)?;
        Ok(self)
    }

    /// `self + f`：显式源项移到左侧，`source -= V·f`
    pub fn add_explicit_source(&mut self, mesh: &FvMesh, field: &VolField<T>) -> FvResult<()> {
        self.check_field(field.dimensions(), field.name(), "+")?;
        self.add_volume_weighted(mesh, field.internal(), -1.0)
    }

    /// `self - f`：`source += V·f`
    pub fn sub_explicit_source(&mut self, mesh: &FvMesh, field: &VolField<T>) -> FvResult<()> {
        self.check_field(field.dimensions(), field.name(), "-")?;
        self.add_volume_weighted(mesh, field.internal(), 1.0)
    }

    // ========================================================================
    // 欠松弛与约束
    // ========================================================================

    /// 方程欠松弛，`alpha ∈ (0, 1]`
    ///
    /// 先保证对角占优 `D = max(|D|, Σ|a_nb|)`，再 `D /= alpha`，
    /// 源项补偿 `(D - D_0)·ψ`，`ψ` 为上一迭代值。`alpha = 1` 不改变方程。
    /// 对角符号保持不变，`laplacian` 与 `-laplacian` 松弛后的解相同。
    pub fn relax(&mut self, psi: &VolField<T>, alpha: f64) -> FvResult<()> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(FvError::invalid_config(
                format!("relaxationFactors.equations.{}", self.psi_name),
                alpha,
                "松弛因子必须在 (0, 1] 内",
            ));
        }
        FvError::check_size(psi.name(), self.n_cells(), psi.len())?;
        if alpha == 1.0 {
            return Ok(());
        }

        let d0 = self.ldu.diag().to_vec();

        // 总对角为负的行按 -A 松弛，最后还原符号
        let mut total = d0.clone();
        for (cells, ic) in self.face_cells.iter().zip(&self.internal_coeffs) {
            for (&c, &coeff) in cells.iter().zip(ic) {
                total[c] += coeff;
            }
        }
        let sign: Vec<f64> = total.iter().map(|&t| if t < 0.0 { -1.0 } else { 1.0 }).collect();

        let mut d: Vec<f64> = d0.iter().zip(&sign).map(|(&v, &s)| v * s).collect();
        let mut sum_off = vec![0.0; d.len()];
        self.ldu.sum_mag_off_diag(&mut sum_off);

        for (p, cells) in self.face_cells.iter().enumerate() {
            let ic = &self.internal_coeffs[p];
            for (&c, &coeff) in cells.iter().zip(ic) {
                if self.coupled[p] {
                    d[c] += sign[c] * coeff;
                    sum_off[c] += coeff.abs();
                } else {
                    d[c] += coeff.abs();
                }
            }
        }

        for (di, &off) in d.iter_mut().zip(&sum_off) {
            *di = di.abs().max(off) / alpha;
        }

        for (p, cells) in self.face_cells.iter().enumerate() {
            for (&c, &coeff) in cells.iter().zip(&self.internal_coeffs[p]) {
                d[c] -= sign[c] * coeff;
            }
        }
        for (di, &s) in d.iter_mut().zip(&sign) {
            *di *= s;
        }

        for (c, (s, &prev)) in self.source.iter_mut().zip(psi.internal()).enumerate() {
            *s = *s + prev * (d[c] - d0[c]);
        }
        self.ldu.diag_mut().copy_from_slice(&d);
        log::trace!("{} 方程欠松弛 alpha = {alpha}", self.psi_name);
        Ok(())
    }

    /// 固定若干单元的值
    ///
    /// 单元行只保留对角，列上的贡献移入邻居源项，`ψ` 同时写入给定值。
    /// 应在组装完成后、求解之前调用。
    pub fn set_values(
        &mut self,
        mesh: &FvMesh,
        psi: &mut VolField<T>,
        cells: &[usize],
        values: &[T],
    ) -> FvResult<()> {
        FvError::check_size("setValues 值", cells.len(), values.len())?;
        let n = self.n_cells();
        if let Some(&bad) = cells.iter().find(|&&c| c >= n) {
            return Err(FvError::invalid_input(format!("setValues 单元 {bad} 超出范围 {n}")));
        }
        let own = mesh.owner_addr();
        let nei = mesh.neighbour_addr();
        let n_internal = mesh.n_internal_faces();

        for (&cell, &value) in cells.iter().zip(values) {
            psi.internal_mut()[cell] = value;
            self.source[cell] = value * self.ldu.diag()[cell];

            for &face in mesh.cell_faces(cell) {
                if face < n_internal {
                    if self.ldu.is_diagonal() {
                        continue;
                    }
                    let upper = self.ldu.upper().map_or(0.0, |u| u[face]);
                    let lower = self.ldu.lower().map_or(0.0, |l| l[face]);
                    if cell == own[face] {
                        let nb = nei[face];
                        self.source[nb] = self.source[nb] - value * lower;
                    } else {
                        let o = own[face];
                        self.source[o] = self.source[o] - value * upper;
                    }
                    if self.ldu.is_asymmetric() {
                        let (u, l) = self.ldu.upper_lower_mut();
                        u[face] = 0.0;
                        l[face] = 0.0;
                    } else {
                        self.ldu.upper_mut()[face] = 0.0;
                    }
                } else if let Some(patch) = mesh.patches().iter().find(|p| p.faces().contains(&face)) {
                    let local = face - patch.start;
                    self.internal_coeffs[patch.index][local] = 0.0;
                    self.boundary_coeffs[patch.index][local] = T::ZERO;
                }
            }
        }
        Ok(())
    }

    /// 设置参考值，仅当 `psi` 需要参考（无固定值边界）或 `force` 时生效
    pub fn set_reference(&mut self, psi: &VolField<T>, cell: usize, value: T, force: bool) -> FvResult<()> {
        if cell >= self.n_cells() {
            return Err(FvError::invalid_input(format!(
                "{} 的参考单元 {cell} 超出范围 {}",
                self.psi_name,
                self.n_cells()
            )));
        }
        if force || psi.needs_reference() {
            let d = self.ldu.diag()[cell];
            self.source[cell] = self.source[cell] + value * d;
            self.ldu.diag_mut()[cell] += d;
        }
        Ok(())
    }

    // ========================================================================
    // 压力速度耦合算子
    // ========================================================================

    /// 对角算子 `A = (diag + 边界隐式系数)/V`
    pub fn a(&self, mesh: &FvMesh) -> FvResult<VolField<f64>> {
        let diag = self.total_diag();
        let values = diag.iter().zip(mesh.v()).map(|(d, v)| d / v).collect();
        VolField::from_values(
            format!("A({})", self.psi_name),
            mesh,
            self.dimensions / self.psi_dimensions / DimensionSet::VOLUME,
            values,
        )
    }

    /// 非对角算子 `H = (b - Σ a_nb·ψ_nb)/V`
    pub fn h(&self, mesh: &FvMesh, psi: &VolField<T>) -> FvResult<VolField<T>> {
        FvError::check_size(psi.name(), self.n_cells(), psi.len())?;
        let mut h = self.total_source();
        let mut cmpt = vec![0.0; self.n_cells()];
        let mut h_cmpt = vec![0.0; self.n_cells()];
        for d in 0..T::N_COMPONENTS {
            for (x, v) in cmpt.iter_mut().zip(psi.internal()) {
                *x = v.component(d);
            }
            self.ldu.h_mul(&cmpt, &mut h_cmpt);
            for (hv, &extra) in h.iter_mut().zip(&h_cmpt) {
                hv.set_component(d, hv.component(d) + extra);
            }
        }
        for (hv, &v) in h.iter_mut().zip(mesh.v()) {
            *hv = *hv * (1.0 / v);
        }
        VolField::from_values(
            format!("H({})", self.psi_name),
            mesh,
            self.dimensions / DimensionSet::VOLUME,
            h,
        )
    }
}

impl FvMatrix<f64> {
    /// `self == 带量纲常数`
    pub fn eq_dimensioned(self, mesh: &FvMesh, value: &DimensionedScalar) -> FvResult<Self> {
        self.eq_value(mesh, value.dimensions, value.value)
    }
}

impl<T: FieldValue> Add for FvMatrix<T> {
    type Output = FvResult<FvMatrix<T>>;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.try_add(&rhs)?;
        Ok(self)
    }
}

impl<T: FieldValue> Sub for FvMatrix<T> {
    type Output = FvResult<FvMatrix<T>>;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self.try_sub(&rhs)?;
        Ok(self)
    }
}

impl<T: FieldValue> Neg for FvMatrix<T> {
    type Output = FvMatrix<T>;

    fn neg(mut self) -> Self::Output {
        self.negate();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;

    /// 三单元一维扩散：内部面系数 -1，左端固定值 0、右端固定值 1
    fn diffusion(mesh: &FvMesh, psi: &VolField<f64>) -> FvMatrix<f64> {
        let mut m = FvMatrix::new(psi, mesh, psi.dimensions() * DimensionSet::VOLUME);
        m.ldu_mut().upper_mut().fill(-1.0);
        m.ldu_mut().neg_sum_diag();
        let left = mesh.patch_index("left").unwrap();
        let right = mesh.patch_index("right").unwrap();
        m.internal_coeffs_mut(left)[0] = 2.0;
        m.internal_coeffs_mut(right)[0] = 2.0;
        m.boundary_coeffs_mut(right)[0] = 2.0;
        m
    }

    fn setup() -> (FvMesh, VolField<f64>) {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let psi = VolField::from_values("T", &mesh, DimensionSet::DIMLESS, vec![0.2, 0.4, 0.9]).unwrap();
        (mesh, psi)
    }

    #[test]
    fn test_algebra_checks_unknown_and_dimensions() {
        let (mesh, psi) = setup();
        let a = diffusion(&mesh, &psi);
        let b = diffusion(&mesh, &psi);
        let sum = (a.clone() + b).unwrap();
        assert_eq!(sum.diag(), &[2.0, 4.0, 2.0]);
        assert_eq!(sum.internal_coeffs(0)[0], 4.0);

        let other = VolField::uniform("p", &mesh, DimensionSet::DIMLESS, 0.0).unwrap();
        assert!(matches!(
            a.clone() + diffusion(&mesh, &other),
            Err(FvError::InvalidInput { .. })
        ));
        let wrong = FvMatrix::new(&psi, &mesh, DimensionSet::DIMLESS);
        assert!(matches!(a.clone() - wrong, Err(FvError::DimensionMismatch { .. })));

        let neg = -a.clone();
        assert_eq!(neg.diag(), &[-1.0, -2.0, -1.0]);
        let zero = a.clone().eq_matrix(&a).unwrap();
        assert!(zero.diag().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_source_sign_conventions() {
        let (mesh, psi) = setup();
        let f = VolField::uniform("f", &mesh, DimensionSet::DIMLESS, 2.0).unwrap();
        let mut m = diffusion(&mesh, &psi);
        m.add_explicit_source(&mesh, &f).unwrap();
        assert_eq!(m.source()[0], -2.0);
        m.sub_explicit_source(&mesh, &f).unwrap();
        assert_eq!(m.source()[0], 0.0);
        let m = m.eq_field(&mesh, &f).unwrap();
        assert_eq!(m.source()[1], 2.0);
        let m = m
            .eq_dimensioned(&mesh, &DimensionedScalar::dimless("one", 1.0))
            .unwrap();
        assert_eq!(m.source()[1], 3.0);

        let bad = VolField::uniform("g", &mesh, DimensionSet::LENGTH, 1.0).unwrap();
        assert!(m.eq_field(&mesh, &bad).is_err());
    }

    #[test]
    fn test_relax_unit_factor_is_identity() {
        let (mesh, psi) = setup();
        let mut m = diffusion(&mesh, &psi);
        let before = m.clone();
        m.relax(&psi, 1.0).unwrap();
        assert_eq!(m, before);
        assert!(matches!(m.relax(&psi, 0.0), Err(FvError::InvalidConfig { .. })));
        assert!(m.relax(&psi, 1.5).is_err());
    }

    #[test]
    fn test_relax_keeps_solution_and_strengthens_diagonal() {
        let (mesh, psi) = setup();
        let mut m = diffusion(&mesh, &psi);
        let before = m.clone();
        m.relax(&psi, 0.5).unwrap();
        for (c, (&d, &d0)) in m.diag().iter().zip(before.diag()).enumerate() {
            assert!(d > d0, "cell {c}");
        }
        // 上一迭代值满足松弛前的方程时也满足松弛后的方程
        let x = [0.25, 0.5, 0.75];
        let r0 = residual_vector(&before, &x);
        let r1 = residual_vector(&m, &x);
        let shift: Vec<f64> = m
            .diag()
            .iter()
            .zip(before.diag())
            .zip(psi.internal().iter().zip(&x))
            .map(|((d, d0), (p, xi))| (d - d0) * (p - xi))
            .collect();
        for c in 0..3 {
            assert!((r1[c] - r0[c] - shift[c]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_relax_preserves_diagonal_sign() {
        let (mesh, psi) = setup();
        let mut positive = diffusion(&mesh, &psi);
        let mut negative = -diffusion(&mesh, &psi);
        positive.relax(&psi, 0.7).unwrap();
        negative.relax(&psi, 0.7).unwrap();
        assert!(negative.diag().iter().all(|&d| d < 0.0));

        // 两种符号约定松弛后描述同一方程
        let mirrored = -negative;
        assert_eq!(mirrored.diag(), positive.diag());
        assert_eq!(mirrored.source(), positive.source());
    }

    fn residual_vector(m: &FvMatrix<f64>, x: &[f64]) -> Vec<f64> {
        let mut ax = vec![0.0; x.len()];
        m.ldu().amul(x, &mut ax);
        let diag_extra: Vec<f64> = m.total_diag().iter().zip(m.diag()).map(|(t, d)| t - d).collect();
        m.total_source()
            .iter()
            .zip(&ax)
            .zip(diag_extra.iter().zip(x))
            .map(|((b, a), (e, xi))| b - a - e * xi)
            .collect()
    }

    #[test]
    fn test_set_values_moves_column_to_source() {
        let (mesh, mut psi) = setup();
        let mut m = diffusion(&mesh, &psi);
        m.set_values(&mesh, &mut psi, &[1], &[0.5]).unwrap();
        assert_eq!(psi.value(1), 0.5);
        assert_eq!(m.source()[1], 0.5 * 2.0);
        assert_eq!(m.source()[0], 0.5);
        assert_eq!(m.source()[2], 0.5);
        assert_eq!(m.ldu().upper().unwrap(), &[0.0, 0.0]);
        assert!(m.set_values(&mesh, &mut psi, &[7], &[0.0]).is_err());
    }

    #[test]
    fn test_set_reference_only_when_needed() {
        let (mesh, psi) = setup();
        let mut m = diffusion(&mesh, &psi);
        m.set_reference(&psi, 0, 3.0, false).unwrap();
        // 默认边界 zeroGradient，需要参考
        assert_eq!(m.diag()[0], 2.0);
        assert_eq!(m.source()[0], 3.0);

        let mut fixed = psi.clone();
        fixed.fix_value(&mesh, "left", 0.0).unwrap();
        let mut m = diffusion(&mesh, &fixed);
        m.set_reference(&fixed, 0, 3.0, false).unwrap();
        assert_eq!(m.diag()[0], 1.0);
        m.set_reference(&fixed, 0, 3.0, true).unwrap();
        assert_eq!(m.diag()[0], 2.0);
        assert!(m.set_reference(&fixed, 9, 0.0, true).is_err());
    }

    #[test]
    fn test_a_and_h_reproduce_residual() {
        let (mesh, psi) = setup();
        let m = diffusion(&mesh, &psi);
        let a = m.a(&mesh).unwrap();
        let h = m.h(&mesh, &psi).unwrap();
        let r = residual_vector(&m, psi.internal());
        for c in 0..3 {
            let v = mesh.v()[c];
            assert!((a.value(c) * psi.value(c) - h.value(c) + r[c] / v).abs() < 1e-12);
        }
        assert_eq!(a.name(), "A(T)");
        assert_eq!(a.dimensions(), DimensionSet::DIMLESS);
    }
}
