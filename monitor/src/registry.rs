//! 文件系统类型注册表

use alloc::sync::Arc;
use alloc::vec::Vec;

use vfs::{FsDriver, FsType};

/// 按探测顺序排列的文件系统类型描述符
///
/// 没有哨兵项：没有活动会话由 `Option<Session>` 表示。
#[derive(Clone, Default)]
pub struct FsRegistry {
    drivers: Vec<Arc<dyn FsDriver>>,
}

impl FsRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置后端，顺序为 fat、ext4、sandbox
    pub fn builtin() -> Self {
        Self {
            drivers: fs::builtin_drivers(),
        }
    }

    /// 追加一个类型，排在已有类型之后
    pub fn register(&mut self, driver: Arc<dyn FsDriver>) {
        self.drivers.push(driver);
    }

    /// 链式追加
    pub fn with(mut self, driver: Arc<dyn FsDriver>) -> Self {
        self.register(driver);
        self
    }

    /// 按探测顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FsDriver>> {
        self.drivers.iter()
    }

    /// 按类型查找
    pub fn find(&self, fs_type: FsType) -> Option<&Arc<dyn FsDriver>> {
        self.drivers.iter().find(|d| d.fs_type() == fs_type)
    }

    /// 类型个数
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order_and_find() {
        let reg = FsRegistry::builtin();
        let names: Vec<&str> = reg.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["fat", "ext4", "sandbox"]);
        assert!(reg.find(FsType::Sandbox).unwrap().allows_null_device());
        assert!(FsRegistry::new().find(FsType::Fat).is_none());
    }
}
