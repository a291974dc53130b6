// crates/fv_physics/src/fvm/source.rs

//! 源项
//!
//! - `sp`：隐式线性源 `Sp·ψ`，进入对角
//! - `su`：显式源，进入右端项
//! - `su_sp`：按符号拆分，正的部分隐式，负的部分显式，保持对角占优

use crate::field::{FieldValue, VolField};
use crate::matrix::FvMatrix;
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;

/// 源项系数：常数或单元场
#[derive(Debug, Clone, Copy)]
pub enum SourceCoeff<'a> {
    /// 常数
    Uniform(&'a DimensionedScalar),
    /// 单元标量场
    Field(&'a VolField<f64>),
}

impl<'a> From<&'a DimensionedScalar> for SourceCoeff<'a> {
    fn from(value: &'a DimensionedScalar) -> Self {
        Self::Uniform(value)
    }
}

impl<'a> From<&'a VolField<f64>> for SourceCoeff<'a> {
    fn from(value: &'a VolField<f64>) -> Self {
        Self::Field(value)
    }
}

impl SourceCoeff<'_> {
    fn dimensions(&self) -> DimensionSet {
        match self {
            Self::Uniform(s) => s.dimensions,
            Self::Field(f) => f.dimensions(),
        }
    }

    fn values(&self, mesh: &FvMesh) -> FvResult<Vec<f64>> {
        match self {
            Self::Uniform(s) => Ok(vec![s.value; mesh.n_cells()]),
            Self::Field(f) => {
                FvError::check_size(f.name(), mesh.n_cells(), f.len())?;
                Ok(f.internal().to_vec())
            }
        }
    }
}

/// 隐式源 `Sp·ψ`
pub fn sp<'s, T: FieldValue>(
    mesh: &FvMesh,
    coeff: impl Into<SourceCoeff<'s>>,
    psi: &VolField<T>,
) -> FvResult<FvMatrix<T>> {
    let coeff = coeff.into();
    let values = coeff.values(mesh)?;
    let mut m = FvMatrix::new(psi, mesh, coeff.dimensions() * psi.dimensions() * DimensionSet::VOLUME);
    let v = mesh.v();
    for (c, d) in m.ldu_mut().diag_mut().iter_mut().enumerate() {
        *d += v[c] * values[c];
    }
    Ok(m)
}

/// 显式源 `Su`，对 ψ 无依赖
pub fn su<T: FieldValue>(mesh: &FvMesh, source: &VolField<T>, psi: &VolField<T>) -> FvResult<FvMatrix<T>> {
    FvError::check_size(source.name(), mesh.n_cells(), source.len())?;
    let mut m = FvMatrix::new(psi, mesh, source.dimensions() * DimensionSet::VOLUME);
    let v = mesh.v();
    for (c, s) in m.source_mut().iter_mut().enumerate() {
        *s = *s - source.value(c) * v[c];
    }
    Ok(m)
}

/// 按符号拆分的线性源
///
/// `sp > 0` 部分隐式，`sp < 0` 部分以当前 ψ 显式处理。
pub fn su_sp<'s, T: FieldValue>(
    mesh: &FvMesh,
    coeff: impl Into<SourceCoeff<'s>>,
    psi: &VolField<T>,
) -> FvResult<FvMatrix<T>> {
    let coeff = coeff.into();
    let values = coeff.values(mesh)?;
    let mut m = FvMatrix::new(psi, mesh, coeff.dimensions() * psi.dimensions() * DimensionSet::VOLUME);
    let v = mesh.v();
    for (c, d) in m.ldu_mut().diag_mut().iter_mut().enumerate() {
        *d += v[c] * values[c].max(0.0);
    }
    for (c, s) in m.source_mut().iter_mut().enumerate() {
        *s = *s - psi.value(c) * (v[c] * values[c].min(0.0));
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;

    #[test]
    fn test_sp_and_su() {
        let mesh = StructuredBlock::line(2, 2.0).build().unwrap();
        // V = 1·1·1
        let psi = VolField::uniform("T", &mesh, DimensionSet::TEMPERATURE, 3.0).unwrap();
        let rate = DimensionedScalar::new("k", DimensionSet::TIME.inv(), 2.0);
        let m = sp(&mesh, &rate, &psi).unwrap();
        assert_eq!(m.diag(), &[2.0, 2.0]);
        assert_eq!(
            m.dimensions(),
            DimensionSet::TEMPERATURE * DimensionSet::VOLUME / DimensionSet::TIME
        );

        let q = VolField::from_values(
            "q",
            &mesh,
            DimensionSet::TEMPERATURE / DimensionSet::TIME,
            vec![1.0, -1.0],
        )
        .unwrap();
        let m = su(&mesh, &q, &psi).unwrap();
        assert_eq!(m.diag(), &[0.0, 0.0]);
        assert_eq!(m.source(), &[-1.0, 1.0]);
    }

    #[test]
    fn test_su_sp_splits_by_sign() {
        let mesh = StructuredBlock::line(2, 2.0).build().unwrap();
        let psi = VolField::from_values("T", &mesh, DimensionSet::DIMLESS, vec![2.0, 5.0]).unwrap();
        let k = VolField::from_values("k", &mesh, DimensionSet::TIME.inv(), vec![3.0, -4.0]).unwrap();
        let m = su_sp(&mesh, &k, &psi).unwrap();
        assert_eq!(m.diag(), &[3.0, 0.0]);
        assert_eq!(m.source(), &[0.0, 20.0]);
        assert!(m.diag().iter().all(|&d| d >= 0.0));
    }
}
