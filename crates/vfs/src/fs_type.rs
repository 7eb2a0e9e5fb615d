//! 文件系统类型标签与能力位

use core::fmt;

/// 没有活动会话时报告的类型名
pub const UNSUPPORTED_NAME: &str = "unsupported";

/// 已知的文件系统类型
///
/// "任意类型" 用 `Option<FsType>` 的 `None` 表示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsType {
    /// FAT12/16/32
    Fat,
    /// ext2/3/4
    Ext4,
    /// 内存中的 sandbox 文件系统
    Sandbox,
}

impl FsType {
    /// 全部类型，按注册顺序
    pub const ALL: [FsType; 3] = [FsType::Fat, FsType::Ext4, FsType::Sandbox];

    /// 类型名
    pub const fn name(self) -> &'static str {
        match self {
            FsType::Fat => "fat",
            FsType::Ext4 => "ext4",
            FsType::Sandbox => "sandbox",
        }
    }

    /// 按名称查找
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// 文件系统提供的可选能力
    ///
    /// 探测、读取、大小查询和存在性检查是所有类型都具备的，不在此列。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FsCaps: u32 {
        /// 写文件
        const WRITE   = 1 << 0;
        /// 删除文件
        const UNLINK  = 1 << 1;
        /// 创建目录
        const MKDIR   = 1 << 2;
        /// 创建符号链接
        const LINK    = 1 << 3;
        /// 读取卷 UUID
        const UUID    = 1 << 4;
        /// 目录流
        const OPENDIR = 1 << 5;
        /// 自带列目录实现
        const LIST    = 1 << 6;
    }
}
