//! # 文件系统后端 (FS)
//!
//! 每个后端实现 [`vfs::FsDriver`] 和 [`vfs::FileSystem`]，由 monitor 的
//! 注册表按固定顺序探测。
//!
//! ## 支持的文件系统
//!
//! - **[fat]**: FAT12/16/32，只读
//! - **[ext4]**: ext4，基于 `ext4_rs`
//! - **[sandbox]**: 不需要块设备的内存目录树

#![no_std]
#![doc = "文件系统后端"]

extern crate alloc;

#[cfg(feature = "ext4")]
pub mod ext4;
#[cfg(feature = "fat")]
pub mod fat;
#[cfg(feature = "sandbox")]
pub mod sandbox;

use alloc::sync::Arc;
use alloc::vec::Vec;

use vfs::FsDriver;

#[cfg(feature = "ext4")]
pub use ext4::Ext4Driver;
#[cfg(feature = "fat")]
pub use fat::FatDriver;
#[cfg(feature = "sandbox")]
pub use sandbox::{SandboxDriver, SandboxFs};

/// 按探测顺序排列的内置文件系统类型
///
/// 顺序固定为 fat、ext4、sandbox，未启用的特性不出现。
pub fn builtin_drivers() -> Vec<Arc<dyn FsDriver>> {
    let mut drivers: Vec<Arc<dyn FsDriver>> = Vec::new();
    #[cfg(feature = "fat")]
    drivers.push(Arc::new(FatDriver::new()));
    #[cfg(feature = "ext4")]
    drivers.push(Arc::new(Ext4Driver::new()));
    #[cfg(feature = "sandbox")]
    drivers.push(Arc::new(SandboxDriver::default()));
    drivers
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfs::FsType;

    #[test]
    fn test_builtin_order() {
        let types: Vec<FsType> = builtin_drivers().iter().map(|d| d.fs_type()).collect();
        assert_eq!(types, [FsType::Fat, FsType::Ext4, FsType::Sandbox]);
    }
}
