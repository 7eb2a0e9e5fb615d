//! 文件系统描述符与能力接口
//!
//! 每种文件系统类型实现一个 [`FsDriver`]，由它检查块范围上的磁盘结构；
//! 识别成功时返回一个 [`FileSystem`]，之后的所有操作都经由它完成。
//!
//! [`FileSystem`] 的可选能力都有默认实现，直接返回
//! [`FsError::NotSupported`]，后端只需覆盖自己支持的部分。

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use device::BlockRange;

use crate::{DirCursor, DirEntry, FsCaps, FsError, FsType, ListSummary};

/// 文件系统类型描述符
pub trait FsDriver {
    /// 类型标签
    fn fs_type(&self) -> FsType;

    /// 类型名
    fn name(&self) -> &'static str {
        self.fs_type().name()
    }

    /// 是否可以在没有块设备的情况下工作
    fn allows_null_device(&self) -> bool {
        false
    }

    /// 可选能力
    fn caps(&self) -> FsCaps;

    /// 探测 `volume` 上是否为本类型的文件系统
    ///
    /// `volume` 为 `None` 表示解析结果没有块设备，只有
    /// [`allows_null_device`](Self::allows_null_device) 为真的类型会收到 `None`。
    fn probe(&self, volume: Option<&BlockRange>) -> Result<Box<dyn FileSystem>, FsError>;
}

/// 探测成功后的文件系统实例
///
/// 路径均相对于文件系统根目录，开头的 `/` 可有可无。
pub trait FileSystem {
    /// 类型标签
    fn fs_type(&self) -> FsType;

    /// 路径是否存在
    fn exists(&mut self, path: &str) -> bool {
        let _ = path;
        false
    }

    /// 文件大小（字节）
    fn size(&mut self, path: &str) -> Result<u64, FsError>;

    /// 从 `offset` 开始读取，最多读满 `buf`，返回实际读取的字节数
    ///
    /// `offset` 位于文件末尾或之后时返回 0。
    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<u64, FsError>;

    /// 从 `offset` 开始写入 `buf`，返回实际写入的字节数
    fn write(&mut self, path: &str, offset: u64, buf: &[u8]) -> Result<u64, FsError> {
        let _ = (path, offset, buf);
        Err(FsError::NotSupported)
    }

    /// 打开目录，返回指向第一项的游标
    fn open_dir(&mut self, path: &str) -> Result<DirCursor, FsError> {
        let _ = path;
        Err(FsError::NotSupported)
    }

    /// 读取游标处的目录项并前移游标
    ///
    /// 遍历结束时返回 [`FsError::NotFound`]。
    fn read_dir(&mut self, cursor: &mut DirCursor) -> Result<DirEntry, FsError> {
        let _ = cursor;
        Err(FsError::NotSupported)
    }

    /// 释放游标关联的后端资源
    fn close_dir(&mut self, cursor: DirCursor) {
        let _ = cursor;
    }

    /// 后端自带的列目录实现
    ///
    /// 返回 `None` 表示使用通用实现（基于目录流）。
    fn list(
        &mut self,
        path: &str,
        out: &mut dyn fmt::Write,
    ) -> Option<Result<ListSummary, FsError>> {
        let _ = (path, out);
        None
    }

    /// 删除文件或空目录
    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        let _ = path;
        Err(FsError::NotSupported)
    }

    /// 创建目录
    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        let _ = path;
        Err(FsError::NotSupported)
    }

    /// 在 `path` 处创建指向 `target` 的符号链接
    fn link(&mut self, path: &str, target: &str) -> Result<(), FsError> {
        let _ = (path, target);
        Err(FsError::NotSupported)
    }

    /// 卷 UUID，36 字符的规范格式
    fn uuid(&mut self) -> Result<String, FsError> {
        Err(FsError::NotSupported)
    }

    /// 关闭钩子，会话结束时调用一次
    fn close(&mut self) {}
}
