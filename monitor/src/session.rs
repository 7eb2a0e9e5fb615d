//! 活动会话
//!
//! [`Session`] 由 [`detect`](crate::detect) 创建，拥有探测得到的文件系统。
//! 单次操作以值接收会话，操作结束时会话随之析构，析构时调用后端的关闭钩子，
//! 因此任何路径都不会把打开的文件系统留给下一次操作。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use log::debug;

use device::{BlockDriver, PartitionInfo};
use vfs::{FileSystem, FsCaps, FsDriver, FsError, FsType, ListSummary};

use crate::DirStream;
use crate::listing::list_generic;

/// 绑定到某个设备分区上的文件系统
pub struct Session {
    fs: Box<dyn FileSystem>,
    driver: Arc<dyn FsDriver>,
    device: Option<Arc<dyn BlockDriver>>,
    info: PartitionInfo,
    index: u32,
}

impl Session {
    pub(crate) fn new(
        fs: Box<dyn FileSystem>,
        driver: Arc<dyn FsDriver>,
        device: Option<Arc<dyn BlockDriver>>,
        info: PartitionInfo,
        index: u32,
    ) -> Self {
        Self {
            fs,
            driver,
            device,
            info,
            index,
        }
    }

    /// 文件系统类型
    pub fn fs_type(&self) -> FsType {
        self.driver.fs_type()
    }

    /// 类型名
    pub fn type_name(&self) -> &'static str {
        self.driver.name()
    }

    /// 类型支持的可选能力
    pub fn caps(&self) -> FsCaps {
        self.driver.caps()
    }

    /// 块设备，无设备后端为 `None`
    pub fn device(&self) -> Option<&Arc<dyn BlockDriver>> {
        self.device.as_ref()
    }

    /// 分区描述
    pub fn partition(&self) -> &PartitionInfo {
        &self.info
    }

    /// 分区号
    pub fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn fs_mut(&mut self) -> &mut dyn FileSystem {
        self.fs.as_mut()
    }

    pub(crate) fn require(&self, cap: FsCaps) -> Result<(), FsError> {
        if self.caps().contains(cap) {
            Ok(())
        } else {
            debug!("[FS] {} lacks {:?}", self.type_name(), cap);
            Err(FsError::NotSupported)
        }
    }

    /// 路径是否存在
    pub fn exists(mut self, path: &str) -> bool {
        self.fs.exists(path)
    }

    /// 文件大小
    pub fn size(mut self, path: &str) -> Result<u64, FsError> {
        self.fs.size(path)
    }

    /// 读入内存缓冲区
    pub fn read(mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<u64, FsError> {
        self.fs.read(path, offset, buf)
    }

    /// 从内存缓冲区写入
    pub fn write(mut self, path: &str, offset: u64, buf: &[u8]) -> Result<u64, FsError> {
        self.require(FsCaps::WRITE)?;
        self.fs.write(path, offset, buf)
    }

    /// 列目录
    ///
    /// 后端有自带实现时使用它，否则经由目录流输出通用格式。
    pub fn list(mut self, path: &str, out: &mut dyn fmt::Write) -> Result<ListSummary, FsError> {
        if self.caps().contains(FsCaps::LIST)
            && let Some(result) = self.fs.list(path, out)
        {
            return result;
        }
        list_generic(self.open_dir(path)?, out)
    }

    /// 打开目录流，会话转交给流
    pub fn open_dir(self, path: &str) -> Result<DirStream, FsError> {
        self.require(FsCaps::OPENDIR)?;
        DirStream::open(self, path)
    }

    /// 删除文件或空目录
    pub fn unlink(mut self, path: &str) -> Result<(), FsError> {
        self.require(FsCaps::UNLINK)?;
        self.fs.unlink(path)
    }

    /// 创建目录
    pub fn mkdir(mut self, path: &str) -> Result<(), FsError> {
        self.require(FsCaps::MKDIR)?;
        self.fs.mkdir(path)
    }

    /// 创建符号链接 `path -> target`
    pub fn link(mut self, path: &str, target: &str) -> Result<(), FsError> {
        self.require(FsCaps::LINK)?;
        self.fs.link(path, target)
    }

    /// 卷 UUID
    pub fn uuid(mut self) -> Result<String, FsError> {
        self.require(FsCaps::UUID)?;
        self.fs.uuid()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.fs.close();
        debug!("[FS] {} session closed", self.type_name());
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("fs_type", &self.fs_type())
            .field("device", &self.device.as_ref().map(|d| d.get_id()))
            .field("index", &self.index)
            .finish()
    }
}
