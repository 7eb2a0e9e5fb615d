//! 公共文件系统接口
//!
//! [`FsDispatch`] 保存至多一个活动会话。每个操作取走会话、执行、
//! 然后让会话析构，因此操作之后总是没有活动会话，调用方需要重新绑定。

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use log::{debug, error};

use device::{BlockDriver, PartitionResolver};
use mm::{PhysMemory, ReservationSource};
use vfs::{FsError, FsType, ListSummary, UNSUPPORTED_NAME};

use crate::loader::{self, ReadRequest};
use crate::detect;
use crate::{DirStream, FsRegistry, Session};

/// 文件系统分发器
pub struct FsDispatch {
    registry: FsRegistry,
    resolver: Box<dyn PartitionResolver>,
    memory: Box<dyn PhysMemory>,
    reservations: Box<dyn ReservationSource>,
    active: Option<Session>,
}

impl FsDispatch {
    /// 组装分发器
    pub fn new(
        registry: FsRegistry,
        resolver: Box<dyn PartitionResolver>,
        memory: Box<dyn PhysMemory>,
        reservations: Box<dyn ReservationSource>,
    ) -> Self {
        Self {
            registry,
            resolver,
            memory,
            reservations,
            active: None,
        }
    }

    /// 注册表
    pub fn registry(&self) -> &FsRegistry {
        &self.registry
    }

    /// 物理内存
    pub fn memory_mut(&mut self) -> &mut dyn PhysMemory {
        self.memory.as_mut()
    }

    /// 绑定 `ifname` 上的 `dev_part`，替换当前会话
    pub fn bind(
        &mut self,
        ifname: &str,
        dev_part: Option<&str>,
        filter: Option<FsType>,
    ) -> Result<(), FsError> {
        self.close();
        let session = detect::bind(
            &self.registry,
            self.resolver.as_ref(),
            ifname,
            dev_part,
            filter,
        )?;
        self.active = Some(session);
        Ok(())
    }

    /// 在已知设备和分区号上绑定
    pub fn bind_resolved(
        &mut self,
        device: Option<Arc<dyn BlockDriver>>,
        index: u32,
    ) -> Result<(), FsError> {
        self.close();
        self.active = Some(detect::bind_resolved(&self.registry, device, index, None)?);
        Ok(())
    }

    /// 活动会话的类型
    pub fn active_type(&self) -> Option<FsType> {
        self.active.as_ref().map(Session::fs_type)
    }

    /// 活动会话的类型名，没有会话时为 `"unsupported"`
    pub fn active_type_name(&self) -> &'static str {
        self.active
            .as_ref()
            .map_or(UNSUPPORTED_NAME, Session::type_name)
    }

    /// 关闭活动会话
    pub fn close(&mut self) {
        self.active = None;
    }

    /// 取走活动会话，交给调用方自行管理
    pub fn take_session(&mut self) -> Option<Session> {
        self.active.take()
    }

    fn take(&mut self) -> Result<Session, FsError> {
        self.active.take().ok_or_else(|| {
            debug!("[FS] no filesystem bound");
            FsError::NotSupported
        })
    }

    /// 列目录，输出写到 `out`
    pub fn list(&mut self, path: &str, out: &mut dyn fmt::Write) -> Result<ListSummary, FsError> {
        self.take()?.list(path, out)
    }

    /// 路径是否存在；没有会话时为假
    pub fn exists(&mut self, path: &str) -> bool {
        self.active.take().is_some_and(|s| s.exists(path))
    }

    /// 文件大小
    pub fn size(&mut self, path: &str) -> Result<u64, FsError> {
        self.take()?.size(path)
    }

    /// 读到物理地址 `dest`，参见 [`loader::bounded_read`]
    pub fn read(
        &mut self,
        path: &str,
        dest: u64,
        offset: u64,
        len: u64,
        enforce_bounds: bool,
    ) -> Result<u64, FsError> {
        let session = self.take()?;
        loader::bounded_read(
            session,
            self.memory.as_mut(),
            self.reservations.as_ref(),
            ReadRequest {
                path,
                dest,
                offset,
                len,
                enforce_bounds,
            },
        )
    }

    /// 从物理地址 `src` 写入，参见 [`loader::write_from_memory`]
    pub fn write(&mut self, path: &str, src: u64, offset: u64, len: u64) -> Result<u64, FsError> {
        let session = self.take()?;
        loader::write_from_memory(session, self.memory.as_mut(), path, src, offset, len)
    }

    /// 打开目录流；流持有会话，此后分发器没有活动会话
    pub fn open_dir(&mut self, path: &str) -> Result<DirStream, FsError> {
        self.take()?.open_dir(path)
    }

    /// 删除文件或空目录
    pub fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        self.take()?.unlink(path)
    }

    /// 创建目录
    pub fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        self.take()?.mkdir(path)
    }

    /// 创建符号链接 `path -> target`
    pub fn link(&mut self, path: &str, target: &str) -> Result<(), FsError> {
        let result = self.take()?.link(path, target);
        if result.is_err() {
            error!("** Unable to create link {} -> {} **", path, target);
        }
        result
    }

    /// 卷 UUID
    pub fn uuid(&mut self) -> Result<String, FsError> {
        self.take()?.uuid()
    }
}
