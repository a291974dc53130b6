// crates/fv_mesh/src/patch.rs

//! 边界面片
//!
//! 边界面按面片连续存放在所有内部面之后，每个面片记录起始面号和面数。

use fv_foundation::error::{FvError, FvResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// 面片几何类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PatchKind {
    /// 普通边界（入口、出口等）
    #[default]
    Patch,
    /// 固壁
    Wall,
    /// 对称面
    Symmetry,
    /// 降维方向的空面片，不参与离散
    Empty,
    /// 并行分区交界，邻侧值由外部交换
    Processor,
}

impl PatchKind {
    /// 类型名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Wall => "wall",
            Self::Symmetry => "symmetryPlane",
            Self::Empty => "empty",
            Self::Processor => "processor",
        }
    }

    /// 是否为耦合面片
    #[inline]
    pub fn is_coupled(&self) -> bool {
        matches!(self, Self::Processor)
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchKind {
    type Err = FvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patch" => Ok(Self::Patch),
            "wall" => Ok(Self::Wall),
            "symmetryPlane" | "symmetry" => Ok(Self::Symmetry),
            "empty" => Ok(Self::Empty),
            "processor" => Ok(Self::Processor),
            _ => Err(FvError::unknown_model(
                "patchKind",
                s,
                ["patch", "wall", "symmetryPlane", "empty", "processor"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )),
        }
    }
}

/// 边界面片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPatch {
    /// 面片名
    pub name: String,
    /// 几何类型
    pub kind: PatchKind,
    /// 第一个面的全局面号
    pub start: usize,
    /// 面数
    pub size: usize,
    /// 在面片列表中的序号
    pub index: usize,
}

impl BoundaryPatch {
    /// 创建面片
    pub fn new(name: impl Into<String>, kind: PatchKind, start: usize, size: usize, index: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start,
            size,
            index,
        }
    }

    /// 全局面号范围
    #[inline]
    pub fn faces(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    /// 局部面号转全局面号
    #[inline]
    pub fn global_face(&self, local: usize) -> usize {
        self.start + local
    }

    /// 是否为空面片
    #[inline]
    pub fn is_empty_kind(&self) -> bool {
        self.kind == PatchKind::Empty
    }

    /// 校验局部面号
    pub fn check_local(&self, local: usize) -> FvResult<()> {
        if local < self.size {
            Ok(())
        } else {
            Err(FvError::invalid_input(format!(
                "面片 {} 只有 {} 个面，无法访问第 {} 个",
                self.name, self.size, local
            )))
        }
    }
}
