//! 文件系统能力接口
//!
//! 监控程序同一时刻只操作一个文件系统，不存在挂载树。此 crate 定义
//! 各后端共享的词汇：
//!
//! - [`FsDriver`] trait - 文件系统类型描述符，负责探测
//! - [`FileSystem`] trait - 探测成功后得到的能力集合
//! - [`FsType`] / [`FsCaps`] - 类型标签与能力位
//! - [`DirEntry`] / [`DirCursor`] - 目录项与后端私有的遍历游标
//! - [`FsError`] - 错误类型
//! - 路径工具

#![no_std]

extern crate alloc;

pub mod error;

mod dirent;
mod file_system;
mod fs_type;
mod path;

pub use dirent::{DirCursor, DirEntry, DirEntryKind, ListSummary};
pub use error::FsError;
pub use file_system::{FileSystem, FsDriver};
pub use fs_type::{FsCaps, FsType, UNSUPPORTED_NAME};
pub use path::{components, normalize_path, split_path};
