// crates/fv_config/src/dictionary.rs

//! 键值配置字典
//!
//! 每个模型和边界条件都从一个 `Dictionary` 构造。字典记录自己的作用域
//! （例如 `transportProperties.BirdCarreauCoeffs`），缺失键的错误会带上
//! 该作用域。
//!
//! # 未知键策略
//!
//! 默认忽略未识别的键，只输出 `debug` 日志；开启严格模式后，未识别的键
//! 会导致 [`FvError::InvalidConfig`]。
//!
//! # 示例
//!
//! ```
//! use fv_config::Dictionary;
//!
//! let dict = Dictionary::from_json_str(
//!     "transportProperties",
//!     r#"{ "transportModel": "Newtonian", "nu": 1e-5 }"#,
//! ).unwrap();
//! let nu: f64 = dict.lookup("nu").unwrap();
//! assert_eq!(nu, 1e-5);
//! assert!(dict.lookup::<f64>("rho").is_err());
//! ```

use fv_foundation::dimension::{DimensionSet, DimensionedScalar};
use fv_foundation::error::{FvError, FvResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// 键值配置字典
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    scope: String,
    entries: Map<String, Value>,
    strict: bool,
}

impl Dictionary {
    /// 创建空字典
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            entries: Map::new(),
            strict: false,
        }
    }

    /// 从 JSON 值创建，值必须是对象
    pub fn from_value(scope: impl Into<String>, value: Value) -> FvResult<Self> {
        let scope = scope.into();
        match value {
            Value::Object(entries) => Ok(Self {
                scope,
                entries,
                strict: false,
            }),
            other => Err(FvError::invalid_config(
                scope,
                other,
                "字典必须是 JSON 对象",
            )),
        }
    }

    /// 从 JSON 文本创建
    pub fn from_json_str(scope: impl Into<String>, text: &str) -> FvResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| FvError::parse(e.line(), e.to_string()))?;
        Self::from_value(scope, value)
    }

    /// 从 JSON 文件创建，作用域取文件名
    pub fn from_file(path: impl AsRef<Path>) -> FvResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| FvError::parse_file(path, e.line(), e.to_string()))?;
        let scope = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_value(scope, value)
    }

    /// 开启或关闭严格模式，返回自身便于链式调用
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// 设置严格模式
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// 是否严格模式
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// 作用域名称
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// 键是否存在
    pub fn found(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 所有键（按插入顺序或字典序，取决于 serde_json 配置）
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 原始 JSON 值
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// 整个字典转为 JSON 值
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone())
    }

    /// 写入一个条目
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> FvResult<()> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| FvError::invalid_config(&key, "?", e.to_string()))?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// 删除一个条目
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    // ========================================================================
    // 查找
    // ========================================================================

    /// 查找必需键
    ///
    /// 缺失时返回 [`FvError::MissingConfigurationKey`]，类型不符时返回
    /// [`FvError::InvalidConfig`]。
    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> FvResult<T> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| FvError::missing_key(key, &self.scope))?;
        self.convert(key, value)
    }

    /// 查找可选键，缺失时返回默认值
    pub fn lookup_or_default<T: DeserializeOwned>(&self, key: &str, default: T) -> FvResult<T> {
        match self.entries.get(key) {
            Some(value) => self.convert(key, value),
            None => Ok(default),
        }
    }

    /// 查找可选键
    pub fn lookup_optional<T: DeserializeOwned>(&self, key: &str) -> FvResult<Option<T>> {
        self.entries
            .get(key)
            .map(|value| self.convert(key, value))
            .transpose()
    }

    /// 查找 `type` 键（模型或边界条件的类型名）
    pub fn lookup_type(&self) -> FvResult<String> {
        self.lookup("type")
    }

    /// 子字典，作用域为 `父作用域.键`，继承严格模式
    pub fn sub_dict(&self, key: &str) -> FvResult<Dictionary> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| FvError::missing_key(key, &self.scope))?;
        let mut dict = Self::from_value(self.child_scope(key), value.clone())?;
        dict.strict = self.strict;
        Ok(dict)
    }

    /// 子字典，不存在时返回空字典
    pub fn sub_dict_or_empty(&self, key: &str) -> FvResult<Dictionary> {
        if self.found(key) {
            self.sub_dict(key)
        } else {
            Ok(Self::new(self.child_scope(key)).with_strict(self.strict))
        }
    }

    /// 查找带量纲标量
    ///
    /// 接受纯数值（采用期望量纲），或 `{ "dimensions": "[..]", "value": x }`
    /// 形式（量纲必须与期望一致）。
    pub fn lookup_dimensioned(
        &self,
        key: &str,
        expected: DimensionSet,
    ) -> FvResult<DimensionedScalar> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| FvError::missing_key(key, &self.scope))?;
        self.dimensioned_from_value(key, value, expected)
    }

    /// 查找带量纲标量，缺失时使用默认数值
    pub fn lookup_dimensioned_or_default(
        &self,
        key: &str,
        expected: DimensionSet,
        default: f64,
    ) -> FvResult<DimensionedScalar> {
        match self.entries.get(key) {
            Some(value) => self.dimensioned_from_value(key, value, expected),
            None => Ok(DimensionedScalar::new(key, expected, default)),
        }
    }

    /// 检查所有键都在识别列表中
    ///
    /// 非严格模式下只记录 `debug` 日志。
    pub fn check_keys(&self, recognised: &[&str]) -> FvResult<()> {
        for key in self.entries.keys() {
            if recognised.contains(&key.as_str()) {
                continue;
            }
            if self.strict {
                return Err(FvError::invalid_config(
                    format!("{}.{}", self.scope, key),
                    &self.entries[key],
                    format!("未识别的配置项，可用: {}", recognised.join(", ")),
                ));
            }
            log::debug!("{}: 忽略未识别的配置项 '{}'", self.scope, key);
        }
        Ok(())
    }

    // ========================================================================
    // 内部辅助
    // ========================================================================

    fn child_scope(&self, key: &str) -> String {
        if self.scope.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.scope, key)
        }
    }

    fn convert<T: DeserializeOwned>(&self, key: &str, value: &Value) -> FvResult<T> {
        T::deserialize(value).map_err(|e| {
            FvError::invalid_config(format!("{}.{}", self.scope, key), value, e.to_string())
        })
    }

    fn dimensioned_from_value(
        &self,
        key: &str,
        value: &Value,
        expected: DimensionSet,
    ) -> FvResult<DimensionedScalar> {
        match value {
            Value::Object(map) => {
                let dims_text = map
                    .get("dimensions")
                    .and_then(Value::as_str)
                    .ok_or_else(|| FvError::missing_key("dimensions", self.child_scope(key)))?;
                let dims: DimensionSet = dims_text.parse()?;
                dims.check_same(&expected, &format!("{}.{}", self.scope, key))?;
                let v = map
                    .get("value")
                    .ok_or_else(|| FvError::missing_key("value", self.child_scope(key)))?;
                let v: f64 = self.convert(key, v)?;
                Ok(DimensionedScalar::new(key, dims, v))
            }
            _ => {
                let v: f64 = self.convert(key, value)?;
                Ok(DimensionedScalar::new(key, expected, v))
            }
        }
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.scope, Value::Object(self.entries.clone()))
    }
}
