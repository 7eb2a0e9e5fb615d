//! 目录项与目录遍历游标

use alloc::string::String;

/// 目录项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirEntryKind {
    /// 目录
    Directory,
    /// 普通文件
    Regular,
    /// 符号链接
    Symlink,
    /// 其他（设备节点等）
    Other,
}

/// 目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// 名称，不含路径
    pub name: String,
    /// 逻辑大小，仅对非目录有意义
    pub size: u64,
    /// 类型
    pub kind: DirEntryKind,
}

impl DirEntry {
    /// 构造目录项
    pub fn new(name: impl Into<String>, size: u64, kind: DirEntryKind) -> Self {
        Self {
            name: name.into(),
            size,
            kind,
        }
    }

    /// 是否为目录
    pub fn is_dir(&self) -> bool {
        self.kind == DirEntryKind::Directory
    }
}

/// 后端私有的目录遍历游标
///
/// `dir` 标识被遍历的目录（簇号、inode 号等），`pos` 是下一个待返回的位置。
/// 两者的含义完全由后端决定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirCursor {
    /// 目录标识
    pub dir: u64,
    /// 下一个位置
    pub pos: u64,
}

impl DirCursor {
    /// 指向目录开头的游标
    pub const fn new(dir: u64) -> Self {
        Self { dir, pos: 0 }
    }
}

/// 列目录统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSummary {
    /// 非目录项个数
    pub files: u32,
    /// 目录个数
    pub dirs: u32,
}
