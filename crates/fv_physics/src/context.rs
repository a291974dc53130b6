// crates/fv_physics/src/context.rs

//! 离散上下文
//!
//! 算子需要的网格、格式表和时间状态打包在 [`FvContext`] 里借用传递。
//! 时间格式在构造时从 `ddtSchemes.default` 读取一次，整个进程共用。

use crate::control::TimeState;
use fv_config::{DdtScheme, DivScheme, FvSchemes, SnGradScheme};
use fv_foundation::error::FvResult;
use fv_mesh::FvMesh;

/// 离散上下文
#[derive(Debug, Clone, Copy)]
pub struct FvContext<'a> {
    /// 网格
    pub mesh: &'a FvMesh,
    /// 离散格式
    pub schemes: &'a FvSchemes,
    /// 时间状态
    pub time: &'a TimeState,
    /// 时间格式
    pub ddt_scheme: DdtScheme,
}

impl<'a> FvContext<'a> {
    /// 构造并解析时间格式
    pub fn new(mesh: &'a FvMesh, schemes: &'a FvSchemes, time: &'a TimeState) -> FvResult<Self> {
        Ok(Self {
            mesh,
            schemes,
            time,
            ddt_scheme: schemes.ddt_scheme()?,
        })
    }

    /// 替换时间格式
    pub fn with_ddt_scheme(mut self, scheme: DdtScheme) -> Self {
        self.ddt_scheme = scheme;
        self
    }

    /// 散度项格式
    pub fn div_scheme(&self, term: &str) -> FvResult<DivScheme> {
        self.schemes.div_scheme(term)
    }

    /// 拉普拉斯项格式
    pub fn laplacian_scheme(&self, term: &str) -> FvResult<SnGradScheme> {
        self.schemes.laplacian_scheme(term)
    }

    /// 面法向梯度格式
    pub fn sn_grad_scheme(&self, term: &str) -> FvResult<SnGradScheme> {
        self.schemes.sn_grad_scheme(term)
    }
}
