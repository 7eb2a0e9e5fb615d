//! 文件系统错误类型
//!
//! 可通过 [`FsError::to_errno()`] 转换为负的 errno，便于命令层按数值打印。

use core::fmt;

/// 文件系统错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 解析相关
    /// 文件、设备、分区或文件系统类型不存在 (-ENOENT)
    NotFound,
    /// 文件已存在 (-EEXIST)
    AlreadyExists,
    /// 不是目录 (-ENOTDIR)
    NotDirectory,
    /// 是目录 (-EISDIR)
    IsDirectory,
    /// 目录非空 (-ENOTEMPTY)
    DirectoryNotEmpty,

    // 参数相关
    /// 无效参数 (-EINVAL)
    InvalidArgument,
    /// 文件名过长 (-ENAMETOOLONG)
    NameTooLong,

    // 文件系统相关
    /// 只读文件系统 (-EROFS)
    ReadOnlyFs,
    /// 空间不足，或加载目标与已保留内存重叠 (-ENOSPC)
    NoSpace,
    /// 后端 I/O 错误 (-EIO)
    IoError,
    /// 设备不存在 (-ENODEV)
    NoDevice,
    /// 后端实际写入的长度与请求不符 (-EIO)
    ShortWrite,

    // 其他
    /// 当前文件系统不提供该能力，或没有活动会话 (-ENOTSUP)
    NotSupported,
}

impl FsError {
    /// 转换为错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            FsError::NotFound => -2,
            FsError::IoError | FsError::ShortWrite => -5,
            FsError::AlreadyExists => -17,
            FsError::NoDevice => -19,
            FsError::NotDirectory => -20,
            FsError::IsDirectory => -21,
            FsError::InvalidArgument => -22,
            FsError::NoSpace => -28,
            FsError::ReadOnlyFs => -30,
            FsError::NameTooLong => -36,
            FsError::DirectoryNotEmpty => -39,
            FsError::NotSupported => -95,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::NotFound => "not found",
            FsError::AlreadyExists => "already exists",
            FsError::NotDirectory => "not a directory",
            FsError::IsDirectory => "is a directory",
            FsError::DirectoryNotEmpty => "directory not empty",
            FsError::InvalidArgument => "invalid argument",
            FsError::NameTooLong => "name too long",
            FsError::ReadOnlyFs => "read-only filesystem",
            FsError::NoSpace => "no space",
            FsError::IoError => "I/O error",
            FsError::NoDevice => "no device",
            FsError::ShortWrite => "short write",
            FsError::NotSupported => "not supported",
        };
        write!(f, "{} ({})", msg, self.to_errno())
    }
}

impl From<device::BlockError> for FsError {
    fn from(e: device::BlockError) -> Self {
        match e {
            device::BlockError::OutOfRange => FsError::InvalidArgument,
            device::BlockError::BadBuffer | device::BlockError::Io => FsError::IoError,
        }
    }
}
