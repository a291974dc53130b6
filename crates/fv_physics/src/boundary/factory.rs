// crates/fv_physics/src/boundary/factory.rs

//! 边界条件注册与构造
//!
//! 每种场值类型一个注册类别（`scalarBoundaryCondition` 等），
//! 字典的 `type` 键选择实现。

use super::basic::{Calculated, Empty, FixedGradient, FixedValue, Mixed, ZeroGradient};
use super::coupled::Processor;
use super::inlet_outlet::InletOutlet;
use super::{lookup_initial_values, BoundaryCondition, PatchField, PatchGeometry};
use crate::field::value::FieldValue;
use crate::registry::{ModelCategory, ModelContext, ModelRegistry};
use fv_config::Dictionary;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::{BoundaryPatch, FvMesh, PatchKind};
use std::marker::PhantomData;

/// 值类型为 `T` 的边界条件类别
pub struct BoundaryConditions<T>(PhantomData<T>);

impl<T: FieldValue> ModelCategory for BoundaryConditions<T> {
    const NAME: &'static str = T::BOUNDARY_CATEGORY;
    type Model = dyn BoundaryCondition<T>;
}

/// 注册值类型 `T` 的全部内置边界条件
pub fn register_boundary_conditions<T: FieldValue>(registry: &mut ModelRegistry) -> FvResult<()> {
    registry.register::<BoundaryConditions<T>>(FixedValue::TYPE_NAME, FixedValue::construct::<T>)?;
    registry.register::<BoundaryConditions<T>>(ZeroGradient::TYPE_NAME, ZeroGradient::construct::<T>)?;
    registry.register::<BoundaryConditions<T>>(
        FixedGradient::<T>::TYPE_NAME,
        FixedGradient::<T>::construct,
    )?;
    registry.register::<BoundaryConditions<T>>(Mixed::<T>::TYPE_NAME, Mixed::<T>::construct)?;
    registry.register::<BoundaryConditions<T>>(InletOutlet::<T>::TYPE_NAME, InletOutlet::<T>::construct)?;
    registry.register::<BoundaryConditions<T>>(Calculated::TYPE_NAME, Calculated::construct::<T>)?;
    registry.register::<BoundaryConditions<T>>(Empty::TYPE_NAME, Empty::construct::<T>)?;
    registry.register::<BoundaryConditions<T>>(Processor::<T>::TYPE_NAME, Processor::<T>::construct)?;
    Ok(())
}

/// 面片类型对应的默认条件：空面片 empty，耦合面片 processor，其余 zeroGradient
pub fn default_condition<T: FieldValue>(patch: &BoundaryPatch) -> Box<dyn BoundaryCondition<T>> {
    match patch.kind {
        PatchKind::Empty => Box::new(Empty),
        kind if kind.is_coupled() => Box::new(Processor::new(vec![T::ZERO; patch.size])),
        _ => Box::new(ZeroGradient),
    }
}

/// 运算结果使用的条件：空面片、耦合面片保持原类型，其余 calculated
pub fn calculated_condition<T: FieldValue>(patch: &BoundaryPatch) -> Box<dyn BoundaryCondition<T>> {
    match patch.kind {
        PatchKind::Empty => Box::new(Empty),
        kind if kind.is_coupled() => Box::new(Processor::new(vec![T::ZERO; patch.size])),
        _ => Box::new(Calculated),
    }
}

/// 检查条件与面片类型相容
pub fn check_patch_kind<T: FieldValue>(
    patch: &BoundaryPatch,
    condition: &dyn BoundaryCondition<T>,
) -> FvResult<()> {
    if patch.kind == PatchKind::Empty && condition.contributes() {
        return Err(FvError::mesh_consistency(format!(
            "空面片 {} 只能使用 empty 边界条件，给出的是 {}",
            patch.name,
            condition.type_name()
        )));
    }
    if patch.kind.is_coupled() && !condition.is_coupled() {
        return Err(FvError::mesh_consistency(format!(
            "耦合面片 {} 需要耦合边界条件，给出的是 {}",
            patch.name,
            condition.type_name()
        )));
    }
    Ok(())
}

/// 按字典构造面片场，并由内部场计算初始面值
///
/// 初始面值取字典的 `value`/`values`，缺省时取相邻单元值。
pub fn new_patch_field<T: FieldValue>(
    registry: &ModelRegistry,
    mesh: &FvMesh,
    patch: usize,
    dict: &Dictionary,
    internal: &[T],
) -> FvResult<PatchField<T>> {
    let geo = PatchGeometry::new(mesh, patch)?;
    let ctx = ModelContext::for_patch(mesh, patch);
    let condition = registry.new_model_from_dict::<BoundaryConditions<T>>(dict, &ctx)?;
    check_patch_kind(geo.patch(), condition.as_ref())?;

    let values = match lookup_initial_values(dict, geo.size())? {
        Some(values) => values,
        None => geo.internal_values(internal),
    };
    let mut field = PatchField::new(&geo, condition, values)?;
    field.evaluate(&geo, internal)?;
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;
    use glam::{DMat3, DVec3};
    use serde_json::json;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        register_boundary_conditions::<f64>(&mut registry).unwrap();
        register_boundary_conditions::<DVec3>(&mut registry).unwrap();
        register_boundary_conditions::<DMat3>(&mut registry).unwrap();
        registry.seal();
        registry
    }

    #[test]
    fn test_all_builtin_names_registered() {
        let registry = registry();
        let names = registry.names::<BoundaryConditions<DVec3>>();
        for name in [
            "calculated",
            "empty",
            "fixedGradient",
            "fixedValue",
            "inletOutlet",
            "mixed",
            "processor",
            "zeroGradient",
        ] {
            assert!(names.iter().any(|n| n == name), "{name}");
        }
        assert_eq!(registry.categories().len(), 3);
    }

    #[test]
    fn test_new_patch_field_from_dict() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let registry = registry();
        let internal = [1.0, 2.0, 3.0];

        let dict = Dictionary::from_value("left", json!({ "type": "fixedValue", "value": 10.0 })).unwrap();
        let pf = new_patch_field(&registry, &mesh, 0, &dict, &internal).unwrap();
        assert_eq!(pf.values(), &[10.0]);
        assert_eq!(pf.type_name(), "fixedValue");

        let dict = Dictionary::from_value("right", json!({ "type": "zeroGradient" })).unwrap();
        let pf = new_patch_field(&registry, &mesh, 1, &dict, &internal).unwrap();
        assert_eq!(pf.values(), &[3.0]);
    }

    #[test]
    fn test_unknown_condition_lists_names() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let registry = registry();
        let dict = Dictionary::from_value("left", json!({ "type": "slip" })).unwrap();
        match new_patch_field::<f64>(&registry, &mesh, 0, &dict, &[0.0; 3]) {
            Err(FvError::UnknownModelType { category, valid, .. }) => {
                assert_eq!(category, "scalarBoundaryCondition");
                assert_eq!(valid.len(), 8);
            }
            other => panic!("unexpected {:?}", other.map(|pf| pf.type_name())),
        }
    }

    #[test]
    fn test_patch_kind_checked() {
        let mesh = StructuredBlock::line(3, 3.0).build().unwrap();
        let registry = registry();
        let dict = Dictionary::from_value("bottom", json!({ "type": "zeroGradient" })).unwrap();
        assert!(matches!(
            new_patch_field::<f64>(&registry, &mesh, 2, &dict, &[0.0; 3]),
            Err(FvError::MeshConsistency { .. })
        ));
        assert_eq!(default_condition::<f64>(&mesh.patches()[2]).type_name(), "empty");
        assert_eq!(default_condition::<f64>(&mesh.patches()[0]).type_name(), "zeroGradient");
    }
}
