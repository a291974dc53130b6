// crates/fv_physics/src/registry/mod.rs

//! 运行时模型选择
//!
//! 按 `(类别, 名称)` 保存构造函数，配置中的类型名在运行时映射到具体实现。
//!
//! # 生命周期
//!
//! ```text
//! Open ──register()*──> Open ──seal()──> Sealed
//! ```
//!
//! 注册是显式调用（见 [`crate::models::register_builtin_models`]），
//! 在确定的启动阶段完成后封存。封存后再注册返回
//! [`FvError::RegistrySealed`]，同一类别内重名返回 [`FvError::DuplicateModel`]。
//! 查找失败返回 [`FvError::UnknownModelType`]，附带该类别全部可用名称（已排序）。
//!
//! # 使用示例
//!
//! ```
//! use fv_config::Dictionary;
//! use fv_mesh::StructuredBlock;
//! use fv_physics::models::{register_builtin_models, ViscosityModels};
//! use fv_physics::registry::{ModelContext, ModelRegistry};
//! use serde_json::json;
//!
//! let mesh = StructuredBlock::line(4, 1.0).build().unwrap();
//! let mut registry = ModelRegistry::new();
//! register_builtin_models(&mut registry).unwrap();
//! registry.seal();
//!
//! let dict = Dictionary::from_value("transport", json!({ "type": "Newtonian", "nu": 1e-5 })).unwrap();
//! let model = registry
//!     .new_model_from_dict::<ViscosityModels>(&dict, &ModelContext::new(&mesh))
//!     .unwrap();
//! assert_eq!(model.type_name(), "Newtonian");
//! ```

mod global;

pub use global::{global, install_global, teardown_global};

use fv_config::Dictionary;
use fv_foundation::error::{FvError, FvResult};
use fv_mesh::{BoundaryPatch, FvMesh};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ============================================================
// 类别与构造上下文
// ============================================================

/// 模型类别
///
/// 每个类别对应一个能力 trait（`Model` 通常是 `dyn Trait`）。
pub trait ModelCategory: 'static {
    /// 类别名，用于错误信息
    const NAME: &'static str;
    /// 该类别构造出的对象类型
    type Model: ?Sized + 'static;
}

/// 构造函数
pub type Constructor<C> =
    fn(&Dictionary, &ModelContext<'_>) -> FvResult<Box<<C as ModelCategory>::Model>>;

/// 构造上下文：模型依赖的网格，以及边界条件所在的面片
#[derive(Debug, Clone, Copy)]
pub struct ModelContext<'a> {
    mesh: &'a FvMesh,
    patch: Option<usize>,
}

impl<'a> ModelContext<'a> {
    /// 网格级上下文
    pub fn new(mesh: &'a FvMesh) -> Self {
        Self { mesh, patch: None }
    }

    /// 面片级上下文（边界条件）
    pub fn for_patch(mesh: &'a FvMesh, patch: usize) -> Self {
        Self {
            mesh,
            patch: Some(patch),
        }
    }

    /// 网格
    #[inline]
    pub fn mesh(&self) -> &'a FvMesh {
        self.mesh
    }

    /// 面片，网格级上下文返回错误
    pub fn patch(&self) -> FvResult<&'a BoundaryPatch> {
        self.patch
            .and_then(|i| self.mesh.patches().get(i))
            .ok_or_else(|| FvError::internal("边界条件构造缺少面片上下文"))
    }
}

// ============================================================
// 注册表
// ============================================================

/// 注册表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// 可以注册
    Open,
    /// 已封存，只能查找
    Sealed,
}

struct CategoryTable<C: ModelCategory> {
    entries: BTreeMap<String, Constructor<C>>,
}

trait ErasedTable: Send + Sync {
    fn category(&self) -> &'static str;
    fn names(&self) -> Vec<String>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: ModelCategory> ErasedTable for CategoryTable<C> {
    fn category(&self) -> &'static str {
        C::NAME
    }

    fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 模型注册表
pub struct ModelRegistry {
    state: RegistryState,
    tables: HashMap<TypeId, Box<dyn ErasedTable>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self {
            state: RegistryState::Open,
            tables: HashMap::new(),
        }
    }

    /// 当前状态
    #[inline]
    pub fn state(&self) -> RegistryState {
        self.state
    }

    /// 是否已封存
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.state == RegistryState::Sealed
    }

    /// 封存，之后不能再注册
    pub fn seal(&mut self) {
        if self.state == RegistryState::Open {
            log::debug!("模型注册表封存: {}", self);
        }
        self.state = RegistryState::Sealed;
    }

    /// 注册构造函数
    pub fn register<C: ModelCategory>(&mut self, name: &str, ctor: Constructor<C>) -> FvResult<()> {
        if self.is_sealed() {
            return Err(FvError::RegistrySealed {
                category: C::NAME.to_string(),
                name: name.to_string(),
            });
        }
        let table = self
            .tables
            .entry(TypeId::of::<C>())
            .or_insert_with(|| {
                Box::new(CategoryTable::<C> {
                    entries: BTreeMap::new(),
                }) as Box<dyn ErasedTable>
            })
            .as_any_mut()
            .downcast_mut::<CategoryTable<C>>()
            .ok_or_else(|| FvError::internal(format!("{} 类别表类型不符", C::NAME)))?;
        if table.entries.contains_key(name) {
            return Err(FvError::DuplicateModel {
                category: C::NAME.to_string(),
                name: name.to_string(),
            });
        }
        table.entries.insert(name.to_string(), ctor);
        Ok(())
    }

    fn table<C: ModelCategory>(&self) -> Option<&CategoryTable<C>> {
        self.tables
            .get(&TypeId::of::<C>())
            .and_then(|t| t.as_any().downcast_ref::<CategoryTable<C>>())
    }

    /// 是否注册了该名称
    pub fn contains<C: ModelCategory>(&self, name: &str) -> bool {
        self.table::<C>()
            .is_some_and(|t| t.entries.contains_key(name))
    }

    /// 类别中所有名称（已排序）
    pub fn names<C: ModelCategory>(&self) -> Vec<String> {
        self.table::<C>().map(|t| t.names()).unwrap_or_default()
    }

    /// 查找构造函数
    pub fn lookup<C: ModelCategory>(&self, name: &str) -> FvResult<Constructor<C>> {
        self.table::<C>()
            .and_then(|t| t.entries.get(name).copied())
            .ok_or_else(|| FvError::unknown_model(C::NAME, name, self.names::<C>()))
    }

    /// 按名称构造
    pub fn new_model<C: ModelCategory>(
        &self,
        name: &str,
        dict: &Dictionary,
        ctx: &ModelContext<'_>,
    ) -> FvResult<Box<C::Model>> {
        let ctor = self.lookup::<C>(name)?;
        log::debug!("构造 {} '{}' ({})", C::NAME, name, dict.scope());
        ctor(dict, ctx)
    }

    /// 按字典中的 `type` 键构造
    pub fn new_model_from_dict<C: ModelCategory>(
        &self,
        dict: &Dictionary,
        ctx: &ModelContext<'_>,
    ) -> FvResult<Box<C::Model>> {
        let name = dict.lookup_type()?;
        self.new_model::<C>(&name, dict, ctx)
    }

    /// 所有类别及其名称，按类别名排序
    pub fn categories(&self) -> Vec<(&'static str, Vec<String>)> {
        let mut out: Vec<_> = self
            .tables
            .values()
            .map(|t| (t.category(), t.names()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("state", &self.state)
            .field("categories", &self.categories())
            .finish()
    }
}

impl fmt::Display for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let categories = self.categories();
        let parts: Vec<String> = categories
            .iter()
            .map(|(c, names)| format!("{c}({})", names.len()))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::StructuredBlock;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Hello(String);

    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello {}", self.0)
        }
    }

    struct Greeters;

    impl ModelCategory for Greeters {
        const NAME: &'static str = "greeter";
        type Model = dyn Greeter;
    }

    struct Others;

    impl ModelCategory for Others {
        const NAME: &'static str = "other";
        type Model = dyn Greeter;
    }

    fn hello(dict: &Dictionary, _ctx: &ModelContext<'_>) -> FvResult<Box<dyn Greeter>> {
        Ok(Box::new(Hello(dict.lookup("who")?)))
    }

    fn mesh() -> FvMesh {
        StructuredBlock::line(2, 1.0).build().unwrap()
    }

    #[test]
    fn test_register_and_construct() {
        let mesh = mesh();
        let mut registry = ModelRegistry::new();
        registry.register::<Greeters>("hello", hello).unwrap();
        registry.seal();

        let mut dict = Dictionary::new("greeting");
        dict.set("who", "world").unwrap();
        let g = registry
            .new_model::<Greeters>("hello", &dict, &ModelContext::new(&mesh))
            .unwrap();
        assert_eq!(g.greet(), "hello world");
        assert!(registry.contains::<Greeters>("hello"));
        assert!(!registry.contains::<Others>("hello"));
    }

    #[test]
    fn test_duplicate_and_sealed() {
        let mut registry = ModelRegistry::new();
        registry.register::<Greeters>("hello", hello).unwrap();
        // 不同类别允许同名
        registry.register::<Others>("hello", hello).unwrap();
        assert!(matches!(
            registry.register::<Greeters>("hello", hello),
            Err(FvError::DuplicateModel { .. })
        ));

        registry.seal();
        assert_eq!(registry.state(), RegistryState::Sealed);
        assert!(matches!(
            registry.register::<Greeters>("bye", hello),
            Err(FvError::RegistrySealed { .. })
        ));
    }

    #[test]
    fn test_unknown_lists_sorted_names() {
        let mesh = mesh();
        let mut registry = ModelRegistry::new();
        for name in ["zeta", "alpha", "Mid"] {
            registry.register::<Greeters>(name, hello).unwrap();
        }
        let err = registry
            .new_model::<Greeters>("beta", &Dictionary::new("x"), &ModelContext::new(&mesh))
            .err()
            .unwrap();
        match err {
            FvError::UnknownModelType {
                category,
                name,
                valid,
            } => {
                assert_eq!(category, "greeter");
                assert_eq!(name, "beta");
                assert_eq!(valid, vec!["Mid", "alpha", "zeta"]);
            }
            other => panic!("unexpected {other}"),
        }

        // 空类别也给出 UnknownModelType
        assert!(matches!(
            registry.lookup::<Others>("x"),
            Err(FvError::UnknownModelType { .. })
        ));
    }

    #[test]
    fn test_constructor_errors_propagate() {
        let mesh = mesh();
        let mut registry = ModelRegistry::new();
        registry.register::<Greeters>("hello", hello).unwrap();
        let mut dict = Dictionary::new("greeting");
        dict.set("type", "hello").unwrap();
        let err = registry
            .new_model_from_dict::<Greeters>(&dict, &ModelContext::new(&mesh))
            .err()
            .unwrap();
        assert!(matches!(err, FvError::MissingConfigurationKey { ref key, .. } if key == "who"));
    }

    #[test]
    fn test_patch_context() {
        let mesh = mesh();
        assert!(ModelContext::new(&mesh).patch().is_err());
        let ctx = ModelContext::for_patch(&mesh, 1);
        assert_eq!(ctx.patch().unwrap().name, "right");
    }
}
