// crates/fv_physics/src/boundary/coupled.rs

//! 分区交界边界条件
//!
//! 邻侧单元值由外部交换写入（[`BoundaryCondition::set_neighbour_values`]），
//! 面值按几何权重插值。隐式离散只耦合本侧单元，邻侧值以显式源项进入方程。

use super::{BoundaryCondition, PatchGeometry};
use crate::field::value::FieldValue;
use crate::registry::ModelContext;
use fv_config::Dictionary;
use fv_foundation::error::{FvError, FvResult};

/// 分区交界（processor）
#[derive(Debug, Clone, PartialEq)]
pub struct Processor<T> {
    neighbour: Vec<T>,
    exchanged: bool,
}

impl<T: FieldValue> Processor<T> {
    /// 注册名
    pub const TYPE_NAME: &'static str = "processor";

    /// 以初始邻侧值创建
    pub fn new(neighbour: Vec<T>) -> Self {
        Self {
            neighbour,
            exchanged: false,
        }
    }

    /// 最近一次交换的邻侧值
    pub fn neighbour_values(&self) -> &[T] {
        &self.neighbour
    }

    /// 是否已经收到过交换值
    pub fn has_exchanged(&self) -> bool {
        self.exchanged
    }

    /// 从字典构造，只能用于耦合面片
    ///
    /// 可选的 `neighbourValue` 给出交换前的邻侧值，缺省为零。
    pub fn construct(dict: &Dictionary, ctx: &ModelContext<'_>) -> FvResult<Box<dyn BoundaryCondition<T>>> {
        dict.check_keys(&["type", "neighbourValue", "value", "values"])?;
        let patch = ctx.patch()?;
        if !patch.kind.is_coupled() {
            return Err(FvError::mesh_consistency(format!(
                "processor 边界条件只能用于耦合面片，面片 {} 的类型为 {}",
                patch.name, patch.kind
            )));
        }
        let neighbour = super::lookup_patch_values(dict, "neighbourValue", patch.size)?
            .unwrap_or_else(|| vec![T::ZERO; patch.size]);
        Ok(Box::new(Self::new(neighbour)))
    }
}

impl<T: FieldValue> BoundaryCondition<T> for Processor<T> {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn evaluate(&self, geo: &PatchGeometry<'_>, internal: &[T], values: &mut [T]) {
        for (((v, &c), &w), &n) in values
            .iter_mut()
            .zip(geo.face_cells())
            .zip(geo.weights())
            .zip(&self.neighbour)
        {
            *v = internal[c] * w + n * (1.0 - w);
        }
    }

    fn sn_grad(&self, geo: &PatchGeometry<'_>, internal: &[T], _values: &[T]) -> Vec<T> {
        geo.face_cells()
            .iter()
            .zip(&self.neighbour)
            .zip(geo.delta_coeffs())
            .map(|((&c, &n), &dc)| (n - internal[c]) * dc)
            .collect()
    }

    fn value_internal_coeffs(&self, _geo: &PatchGeometry<'_>, weights: &[f64]) -> Vec<f64> {
        weights.to_vec()
    }

    fn value_boundary_coeffs(&self, _geo: &PatchGeometry<'_>, weights: &[f64], _values: &[T]) -> Vec<T> {
        self.neighbour
            .iter()
            .zip(weights)
            .map(|(&n, &w)| n * (1.0 - w))
            .collect()
    }

    fn gradient_internal_coeffs(&self, geo: &PatchGeometry<'_>) -> Vec<f64> {
        geo.delta_coeffs().iter().map(|dc| -dc).collect()
    }

    fn gradient_boundary_coeffs(&self, geo: &PatchGeometry<'_>, _values: &[T]) -> Vec<T> {
        self.neighbour
            .iter()
            .zip(geo.delta_coeffs())
            .map(|(&n, &dc)| n * dc)
            .collect()
    }

    fn is_coupled(&self) -> bool {
        true
    }

    fn set_neighbour_values(&mut self, values: &[T]) -> FvResult<()> {
        FvError::check_size("neighbourValues", self.neighbour.len(), values.len())?;
        self.neighbour.copy_from_slice(values);
        self.exchanged = true;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn BoundaryCondition<T>> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::{FvMesh, PatchKind, StructuredBlock};

    fn mesh() -> FvMesh {
        StructuredBlock::line(2, 1.0)
            .with_patch_kind("right", PatchKind::Processor)
            .build()
            .unwrap()
    }

    #[test]
    fn test_interpolates_with_neighbour() {
        let mesh = mesh();
        let geo = PatchGeometry::new(&mesh, 1).unwrap();
        let mut bc = Processor::new(vec![0.0]);
        bc.set_neighbour_values(&[4.0]).unwrap();
        assert!(bc.has_exchanged());

        // 镜像邻侧单元，权重 0.5
        let mut values = [0.0];
        bc.evaluate(&geo, &[0.0, 2.0], &mut values);
        assert!((values[0] - 3.0).abs() < 1e-12);

        let w = geo.weights();
        let vic = bc.value_internal_coeffs(&geo, w);
        let vbc = bc.value_boundary_coeffs(&geo, w, &values);
        assert!((vic[0] * 2.0 + vbc[0] - values[0]).abs() < 1e-12);

        let sn = bc.sn_grad(&geo, &[0.0, 2.0], &values);
        let (gic, gbc) = (bc.gradient_internal_coeffs(&geo), bc.gradient_boundary_coeffs(&geo, &values));
        assert!((gic[0] * 2.0 + gbc[0] - sn[0]).abs() < 1e-12);
        assert!(bc.set_neighbour_values(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_requires_coupled_patch() {
        let mesh = mesh();
        let dict = Dictionary::new("boundaryField");
        assert!(Processor::<f64>::construct(&dict, &ModelContext::for_patch(&mesh, 1)).is_ok());
        assert!(matches!(
            Processor::<f64>::construct(&dict, &ModelContext::for_patch(&mesh, 0)),
            Err(FvError::MeshConsistency { .. })
        ));
    }
}
