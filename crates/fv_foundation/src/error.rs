// crates/fv_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `FvError` 枚举和 `FvResult` 类型别名，用于整个工作区的错误处理。
//!
//! # 错误分类
//!
//! 1. **量纲不匹配**: 不同物理量纲的场做加减，总是致命错误
//! 2. **未知模型类型**: 配置引用了未注册的模型，列出排序后的可选名称
//! 3. **缺少配置项**: 必需键缺失，报告键名与所在字典
//! 4. **线性求解不收敛**: 默认仅警告，可通过配置升级为致命错误
//! 5. **网格一致性**: 模型对网格的假设被违反
//!
//! 所有错误信息都必须指明出错实体（场名、模型名、边界名）。
//!
//! # 示例
//!
//! ```
//! use fv_foundation::error::{FvError, FvResult};
//!
//! fn read_coeff() -> FvResult<f64> {
//!     Err(FvError::missing_key("nu", "transportProperties"))
//! }
//! assert!(read_coeff().is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type FvResult<T> = Result<T, FvError>;

/// 有限体积核心错误类型
#[derive(Error, Debug)]
pub enum FvError {
    // ========================================================================
    // 物理与配置错误（致命）
    // ========================================================================
    /// 量纲不匹配
    #[error("量纲不匹配: {operation} 的操作数量纲不一致 (左: {lhs}, 右: {rhs})")]
    DimensionMismatch {
        /// 操作描述，例如 `U + p`
        operation: String,
        /// 左操作数量纲
        lhs: String,
        /// 右操作数量纲
        rhs: String,
    },

    /// 未知模型类型
    #[error(
        "未知的 {category} 类型 '{name}'，可用类型 ({count} 个): {list}",
        count = .valid.len(),
        list = .valid.join(", ")
    )]
    UnknownModelType {
        /// 模型类别
        category: String,
        /// 请求的名称
        name: String,
        /// 已注册名称（已排序）
        valid: Vec<String>,
    },

    /// 缺少必需的配置项
    #[error("缺少必需的配置项 '{key}' (位于 {context})")]
    MissingConfigurationKey {
        /// 配置键名
        key: String,
        /// 所在字典或模型
        context: String,
    },

    /// 配置值无效
    #[error("配置值无效: {key}={value}, 原因: {reason}")]
    InvalidConfig {
        /// 配置键名
        key: String,
        /// 配置值
        value: String,
        /// 无效原因说明
        reason: String,
    },

    /// 线性求解器不收敛
    #[error(
        "线性求解不收敛: 场 {field} 使用 {solver} 迭代 {iterations} 次, 初始残差 {initial_residual:.6e}, 最终残差 {final_residual:.6e}"
    )]
    LinearSolverNonConvergence {
        /// 场名
        field: String,
        /// 求解器名称
        solver: String,
        /// 已执行迭代次数
        iterations: usize,
        /// 初始残差
        initial_residual: f64,
        /// 最终残差
        final_residual: f64,
    },

    /// 网格一致性违反
    #[error("网格一致性违反: {assumption}")]
    MeshConsistency {
        /// 被违反的假设
        assumption: String,
    },

    // ========================================================================
    // 注册表错误
    // ========================================================================
    /// 同一类别中重复注册
    #[error("重复注册: {category} 类别中已存在 '{name}'")]
    DuplicateModel {
        /// 模型类别
        category: String,
        /// 重复的名称
        name: String,
    },

    /// 注册表已封存
    #[error("注册表已封存，无法再注册 {category}::{name}")]
    RegistrySealed {
        /// 模型类别
        category: String,
        /// 模型名称
        name: String,
    },

    // ========================================================================
    // 网格与场错误
    // ========================================================================
    /// 未知边界
    #[error("场 {field} 没有名为 '{patch}' 的边界")]
    UnknownPatch {
        /// 场名
        field: String,
        /// 边界名
        patch: String,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: String,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 无效网格拓扑
    #[error("无效的网格拓扑: {message}")]
    InvalidMesh {
        /// 具体错误信息
        message: String,
    },

    // ========================================================================
    // IO 相关错误
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        /// 可选的底层 IO 错误
        #[source]
        source: Option<std::io::Error>,
    },

    /// 文件解析错误
    #[error("解析错误: {file} 第{line}行: {message}")]
    Parse {
        /// 文件路径（内存数据时为 `<memory>`）
        file: PathBuf,
        /// 行号
        line: usize,
        /// 错误信息
        message: String,
    },

    /// 无效输入
    #[error("无效的输入数据: {message}")]
    InvalidInput {
        /// 说明无效原因
        message: String,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl FvError {
    /// 量纲不匹配
    pub fn dimension_mismatch(
        operation: impl Into<String>,
        lhs: impl ToString,
        rhs: impl ToString,
    ) -> Self {
        Self::DimensionMismatch {
            operation: operation.into(),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }

    /// 未知模型类型，`valid` 会被排序
    pub fn unknown_model(
        category: impl Into<String>,
        name: impl Into<String>,
        mut valid: Vec<String>,
    ) -> Self {
        valid.sort();
        Self::UnknownModelType {
            category: category.into(),
            name: name.into(),
            valid,
        }
    }

    /// 缺少配置项
    pub fn missing_key(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingConfigurationKey {
            key: key.into(),
            context: context.into(),
        }
    }

    /// 配置值无效
    pub fn invalid_config(
        key: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 网格一致性违反
    pub fn mesh_consistency(assumption: impl Into<String>) -> Self {
        Self::MeshConsistency {
            assumption: assumption.into(),
        }
    }

    /// 未知边界
    pub fn unknown_patch(field: impl Into<String>, patch: impl Into<String>) -> Self {
        Self::UnknownPatch {
            field: field.into(),
            patch: patch.into(),
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// 无效网格
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// 从内存文本解析失败
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: PathBuf::from("<memory>"),
            line,
            message: message.into(),
        }
    }

    /// 文件解析失败
    pub fn parse_file(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    /// IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// 无效输入
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 是否为可恢复的数值错误
    ///
    /// 只有线性求解不收敛属于此类，调用方可选择继续运行。
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LinearSolverNonConvergence { .. })
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl FvError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &str, expected: usize, actual: usize) -> FvResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }
}

impl From<std::io::Error> for FvError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// 条件不满足时提前返回错误
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

/// 从 `Option` 取值，为 `None` 时提前返回错误
#[macro_export]
macro_rules! require {
    ($opt:expr, $err:expr $(,)?) => {
        match $opt {
            Some(v) => v,
            None => return Err($err.into()),
        }
    };
}

// ========================================================================
// 测试
// ========================================================================
