// crates/fv_physics/src/field/surface_field.rs

//! 面场
//!
//! 每个内部面一个值，每个面片一组边界面值。典型用途是体积通量 `φ`
//! 和插值到面上的扩散系数。

use super::value::FieldValue;
use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::FvMesh;
use std::ops::{Add, Mul, Sub};

/// 面场
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceField<T: FieldValue> {
    name: String,
    dimensions: DimensionSet,
    internal: Vec<T>,
    boundary: Vec<Vec<T>>,
}

impl<T: FieldValue> SurfaceField<T> {
    /// 由内部面值和各面片面值构造
    pub fn new(
        name: impl Into<String>,
        mesh: &FvMesh,
        dimensions: DimensionSet,
        internal: Vec<T>,
        boundary: Vec<Vec<T>>,
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&name, mesh.n_internal_faces(), internal.len())?;
        FvError::check_size(&format!("{name}.boundaryField"), mesh.patches().len(), boundary.len())?;
        for (patch, values) in mesh.patches().iter().zip(&boundary) {
            FvError::check_size(&format!("{name}.{}", patch.name), patch.size, values.len())?;
        }
        Ok(Self {
            name,
            dimensions,
            internal,
            boundary,
        })
    }

    /// 均匀面场
    pub fn uniform(name: impl Into<String>, mesh: &FvMesh, dimensions: DimensionSet, value: T) -> Self {
        Self::from_fn(name, mesh, dimensions, |_| value)
    }

    /// 按全局面号生成
    pub fn from_fn(
        name: impl Into<String>,
        mesh: &FvMesh,
        dimensions: DimensionSet,
        f: impl Fn(usize) -> T,
    ) -> Self {
        Self {
            name: name.into(),
            dimensions,
            internal: (0..mesh.n_internal_faces()).map(&f).collect(),
            boundary: mesh.patches().iter().map(|p| p.faces().map(&f).collect()).collect(),
        }
    }

    /// 由按全局面号排列的值构造
    pub fn from_face_values(
        name: impl Into<String>,
        mesh: &FvMesh,
        dimensions: DimensionSet,
        values: &[T],
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&name, mesh.n_faces(), values.len())?;
        Ok(Self::from_fn(name, mesh, dimensions, |f| values[f]))
    }

    /// 名称
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 重命名后返回
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 量纲
    #[inline]
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// 内部面值
    #[inline]
    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    /// 可变内部面值
    #[inline]
    pub fn internal_mut(&mut self) -> &mut [T] {
        &mut self.internal
    }

    /// 所有面片面值
    #[inline]
    pub fn boundary(&self) -> &[Vec<T>] {
        &self.boundary
    }

    /// 面片面值
    #[inline]
    pub fn boundary_values(&self, patch: usize) -> &[T] {
        &self.boundary[patch]
    }

    /// 可变面片面值
    #[inline]
    pub fn boundary_values_mut(&mut self, patch: usize) -> &mut [T] {
        &mut self.boundary[patch]
    }

    /// 全局面号对应的值
    pub fn face_value(&self, mesh: &FvMesh, face: usize) -> T {
        if face < self.internal.len() {
            return self.internal[face];
        }
        for (patch, values) in mesh.patches().iter().zip(&self.boundary) {
            if patch.faces().contains(&face) {
                return values[face - patch.start];
            }
        }
        T::ZERO
    }

    /// 逐面映射
    pub fn map<V: FieldValue>(
        &self,
        name: impl Into<String>,
        dimensions: DimensionSet,
        f: impl Fn(T) -> V,
    ) -> SurfaceField<V> {
        SurfaceField {
            name: name.into(),
            dimensions,
            internal: self.internal.iter().map(|&v| f(v)).collect(),
            boundary: self
                .boundary
                .iter()
                .map(|vals| vals.iter().map(|&v| f(v)).collect())
                .collect(),
        }
    }

    /// 两个面场逐面组合
    pub fn zip_with<U: FieldValue, V: FieldValue>(
        &self,
        other: &SurfaceField<U>,
        name: impl Into<String>,
        dimensions: DimensionSet,
        f: impl Fn(T, U) -> V,
    ) -> FvResult<SurfaceField<V>> {
        FvError::check_size(&other.name, self.internal.len(), other.internal.len())?;
        FvError::check_size(&other.name, self.boundary.len(), other.boundary.len())?;
        let boundary = self
            .boundary
            .iter()
            .zip(&other.boundary)
            .map(|(a, b)| {
                FvError::check_size(&other.name, a.len(), b.len())?;
                Ok(a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect())
            })
            .collect::<FvResult<Vec<Vec<V>>>>()?;
        Ok(SurfaceField {
            name: name.into(),
            dimensions,
            internal: self
                .internal
                .iter()
                .zip(&other.internal)
                .map(|(&x, &y)| f(x, y))
                .collect(),
            boundary,
        })
    }

    /// 加法，量纲必须相同
    pub fn try_add(&self, other: &Self) -> FvResult<Self> {
        let name = format!("({}+{})", self.name, other.name);
        let dims = self.dimensions.check_same(&other.dimensions, &name)?;
        self.zip_with(other, name, dims, |a, b| a + b)
    }

    /// 减法，量纲必须相同
    pub fn try_sub(&self, other: &Self) -> FvResult<Self> {
        let name = format!("({}-{})", self.name, other.name);
        let dims = self.dimensions.check_same(&other.dimensions, &name)?;
        self.zip_with(other, name, dims, |a, b| a - b)
    }

    /// 乘面标量场
    pub fn mul_scalar_field(&self, other: &SurfaceField<f64>) -> FvResult<Self> {
        let name = format!("({}*{})", self.name, other.name);
        self.zip_with(other, name, self.dimensions * other.dimensions, |a, b| a * b)
    }

    /// 乘带量纲常数
    pub fn scale(&self, factor: &DimensionedScalar) -> Self {
        self.map(
            format!("({}*{})", factor.name, self.name),
            factor.dimensions * self.dimensions,
            |v| v * factor.value,
        )
    }
}

impl<T: FieldValue> Add for &SurfaceField<T> {
    type Output = FvResult<SurfaceField<T>>;

    fn add(self, rhs: Self) -> Self::Output {
        self.try_add(rhs)
    }
}

impl<T: FieldValue> Sub for &SurfaceField<T> {
    type Output = FvResult<SurfaceField<T>>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.try_sub(rhs)
    }
}

impl<T: FieldValue> Mul<&SurfaceField<f64>> for &SurfaceField<T> {
    type Output = FvResult<SurfaceField<T>>;

    fn mul(self, rhs: &SurfaceField<f64>) -> Self::Output {
        self.mul_scalar_field(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;

    #[test]
    fn test_layout_follows_mesh() {
        let mesh = StructuredBlock::line(3, 1.0).build().unwrap();
        let phi = SurfaceField::from_fn("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, |f| f as f64);
        assert_eq!(phi.internal().len(), 2);
        assert_eq!(phi.boundary().len(), mesh.patches().len());
        let right = &mesh.patches()[1];
        assert_eq!(phi.boundary_values(1)[0], right.start as f64);
        assert_eq!(phi.face_value(&mesh, right.start), right.start as f64);
        assert_eq!(phi.face_value(&mesh, 1), 1.0);
    }

    #[test]
    fn test_arithmetic_checks_dimensions() {
        let mesh = StructuredBlock::line(3, 1.0).build().unwrap();
        let phi = SurfaceField::uniform("phi", &mesh, DimensionSet::VOLUMETRIC_FLUX, 1.0);
        let gamma = SurfaceField::uniform("gamma", &mesh, DimensionSet::KINEMATIC_VISCOSITY, 2.0);
        assert!((&phi + &gamma).is_err());
        let prod = (&phi * &gamma).unwrap();
        assert_eq!(prod.internal(), &[2.0, 2.0]);
        assert_eq!(
            prod.dimensions(),
            DimensionSet::VOLUMETRIC_FLUX * DimensionSet::KINEMATIC_VISCOSITY
        );
        assert!(SurfaceField::new("bad", &mesh, DimensionSet::DIMLESS, vec![0.0], vec![]).is_err());
    }
}
