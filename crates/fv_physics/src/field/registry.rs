// crates/fv_physics/src/field/registry.rs

//! 场注册表
//!
//! 算例按名称持有所有场，其他组件借用。同类场内名称唯一。

use super::surface_field::SurfaceField;
use super::vol_field::VolField;
use fv_foundation::error::{FvError, FvResult};
use glam::{DMat3, DVec3};
use std::collections::BTreeMap;

/// 可放入 [`FieldRegistry`] 的场类型
pub trait Registrable: Sized {
    /// 类别名，用于错误信息
    const KIND: &'static str;

    /// 场名
    fn field_name(&self) -> &str;

    /// 对应的存储表
    fn table(registry: &FieldRegistry) -> &BTreeMap<String, Self>;

    /// 对应的可变存储表
    fn table_mut(registry: &mut FieldRegistry) -> &mut BTreeMap<String, Self>;
}

/// 场注册表
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    scalars: BTreeMap<String, VolField<f64>>,
    vectors: BTreeMap<String, VolField<DVec3>>,
    tensors: BTreeMap<String, VolField<DMat3>>,
    surface_scalars: BTreeMap<String, SurfaceField<f64>>,
}

macro_rules! impl_registrable {
    ($ty:ty, $kind:literal, $slot:ident) => {
        impl Registrable for $ty {
            const KIND: &'static str = $kind;

            fn field_name(&self) -> &str {
                self.name()
            }

            fn table(registry: &FieldRegistry) -> &BTreeMap<String, Self> {
                &registry.$slot
            }

            fn table_mut(registry: &mut FieldRegistry) -> &mut BTreeMap<String, Self> {
                &mut registry.$slot
            }
        }
    };
}

impl_registrable!(VolField<f64>, "volScalarField", scalars);
impl_registrable!(VolField<DVec3>, "volVectorField", vectors);
impl_registrable!(VolField<DMat3>, "volTensorField", tensors);
impl_registrable!(SurfaceField<f64>, "surfaceScalarField", surface_scalars);

impl FieldRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册场，同类重名报错
    pub fn insert<F: Registrable>(&mut self, field: F) -> FvResult<()> {
        let name = field.field_name().to_string();
        let table = F::table_mut(self);
        if table.contains_key(&name) {
            return Err(FvError::DuplicateModel {
                category: F::KIND.to_string(),
                name,
            });
        }
        table.insert(name, field);
        Ok(())
    }

    /// 是否存在
    pub fn contains<F: Registrable>(&self, name: &str) -> bool {
        F::table(self).contains_key(name)
    }

    /// 借用场
    pub fn get<F: Registrable>(&self, name: &str) -> FvResult<&F> {
        F::table(self)
            .get(name)
            .ok_or_else(|| FvError::missing_key(name, F::KIND))
    }

    /// 可变借用场
    pub fn get_mut<F: Registrable>(&mut self, name: &str) -> FvResult<&mut F> {
        F::table_mut(self)
            .get_mut(name)
            .ok_or_else(|| FvError::missing_key(name, F::KIND))
    }

    /// 取出场
    pub fn take<F: Registrable>(&mut self, name: &str) -> FvResult<F> {
        F::table_mut(self)
            .remove(name)
            .ok_or_else(|| FvError::missing_key(name, F::KIND))
    }

    /// 取出后放回（或替换）
    pub fn replace<F: Registrable>(&mut self, field: F) -> Option<F> {
        let name = field.field_name().to_string();
        F::table_mut(self).insert(name, field)
    }

    /// 同类场名（已排序）
    pub fn names<F: Registrable>(&self) -> Vec<String> {
        F::table(self).keys().cloned().collect()
    }

    /// 场总数
    pub fn len(&self) -> usize {
        self.scalars.len() + self.vectors.len() + self.tensors.len() + self.surface_scalars.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 所有单元场保存旧时间层
    pub fn store_old_times(&mut self) {
        self.scalars.values_mut().for_each(VolField::store_old_time);
        self.vectors.values_mut().for_each(VolField::store_old_time);
        self.tensors.values_mut().for_each(VolField::store_old_time);
    }
}
