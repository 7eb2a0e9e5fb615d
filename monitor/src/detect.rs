//! 探测：把设备分区绑定到文件系统类型
//!
//! 按注册顺序逐个尝试候选类型，第一个成功者得到会话。
//! 不依赖文件扩展名或集中的签名表，新增类型只需注册一个描述符。

use alloc::sync::Arc;
use log::{debug, error};

use device::{BlockDriver, BlockRange, PartitionInfo, PartitionResolver, partition_info};
use vfs::{FsError, FsType};

use crate::{FsRegistry, Session};

/// 解析 `ifname` + `dev_part` 并探测
///
/// `filter` 为 `None` 时接受任意类型。解析失败与没有类型识别都返回
/// [`FsError::NotFound`]。
pub fn bind(
    registry: &FsRegistry,
    resolver: &dyn PartitionResolver,
    ifname: &str,
    dev_part: Option<&str>,
    filter: Option<FsType>,
) -> Result<Session, FsError> {
    let resolved = resolver.resolve(ifname, dev_part).map_err(|e| {
        debug!(
            "[FS] cannot resolve {} {}: {}",
            ifname,
            dev_part.unwrap_or("-"),
            e
        );
        FsError::NotFound
    })?;
    detect_volume(
        registry,
        resolved.device,
        resolved.info,
        resolved.index,
        filter,
    )
}

/// 在已知设备和分区号上探测，跳过说明符解析
pub fn bind_resolved(
    registry: &FsRegistry,
    device: Option<Arc<dyn BlockDriver>>,
    index: u32,
    filter: Option<FsType>,
) -> Result<Session, FsError> {
    let info = match &device {
        Some(dev) => partition_info(&**dev, index).map_err(|e| {
            debug!("[FS] {} partition {}: {}", dev.get_id(), index, e);
            FsError::NotFound
        })?,
        None => PartitionInfo::default(),
    };
    detect_volume(registry, device, info, index, filter)
}

fn detect_volume(
    registry: &FsRegistry,
    device: Option<Arc<dyn BlockDriver>>,
    info: PartitionInfo,
    index: u32,
    filter: Option<FsType>,
) -> Result<Session, FsError> {
    let volume = device
        .as_ref()
        .map(|dev| BlockRange::new(dev.clone(), info.clone()));

    for driver in registry.iter() {
        if filter.is_some_and(|f| f != driver.fs_type()) {
            continue;
        }
        if volume.is_none() && !driver.allows_null_device() {
            continue;
        }
        match driver.probe(volume.as_ref()) {
            Ok(fs) => {
                debug!("[FS] partition {} is {}", index, driver.name());
                return Ok(Session::new(fs, driver.clone(), device, info, index));
            }
            Err(e) => debug!("[FS] {} not recognised: {}", driver.name(), e),
        }
    }

    error!("** Unrecognized filesystem type **");
    Err(FsError::NotFound)
}
