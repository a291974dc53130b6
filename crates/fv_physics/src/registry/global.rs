// crates/fv_physics/src/registry/global.rs

//! 进程级注册表槽位
//!
//! 安装一次后只读共享；测试或嵌入场景可以卸下后重新安装。
//! 库内部从不隐式读取此槽位，[`crate::case::Case`] 持有自己的注册表句柄。

use super::ModelRegistry;
use fv_foundation::error::{FvError, FvResult};
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL: RwLock<Option<Arc<ModelRegistry>>> = parking_lot::const_rwlock(None);

/// 安装进程级注册表（自动封存）
pub fn install_global(mut registry: ModelRegistry) -> FvResult<Arc<ModelRegistry>> {
    let mut slot = GLOBAL.write();
    if slot.is_some() {
        return Err(FvError::internal("进程级模型注册表已安装"));
    }
    registry.seal();
    let shared = Arc::new(registry);
    *slot = Some(Arc::clone(&shared));
    log::info!("安装进程级模型注册表: {}", shared);
    Ok(shared)
}

/// 进程级注册表
pub fn global() -> FvResult<Arc<ModelRegistry>> {
    GLOBAL
        .read()
        .clone()
        .ok_or_else(|| FvError::internal("进程级模型注册表未安装"))
}

/// 卸下进程级注册表，已持有的句柄仍然有效
pub fn teardown_global() -> Option<Arc<ModelRegistry>> {
    GLOBAL.write().take()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_and_teardown() {
        // 同一进程只有这一个测试使用全局槽位
        let _ = teardown_global();
        assert!(global().is_err());

        let installed = install_global(ModelRegistry::new()).unwrap();
        assert!(installed.is_sealed());
        assert!(install_global(ModelRegistry::new()).is_err());
        assert!(Arc::ptr_eq(&installed, &global().unwrap()));

        let taken = teardown_global().unwrap();
        assert!(Arc::ptr_eq(&installed, &taken));
        assert!(global().is_err());
    }
}
