//! 分区描述与分区内按字节读写

mod mbr;

use alloc::sync::Arc;
use alloc::vec;

use crate::block::BlockDriver;
use crate::error::{BlockError, DeviceError};

pub use mbr::{MBR_ENTRY_COUNT, MbrTable, read_mbr};

/// 分区描述
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionInfo {
    /// 起始块号（以设备块为单位）
    pub start: u64,
    /// 块数
    pub size: u64,
    /// 块大小（字节）
    pub block_size: usize,
    /// MBR 分区类型字节，整盘时为 0
    pub sys_ind: u8,
    /// 可引导标志
    pub bootable: bool,
}

impl PartitionInfo {
    /// 把整个设备当作一个分区
    pub fn whole_disk(dev: &dyn BlockDriver) -> Self {
        Self {
            start: 0,
            size: dev.total_blocks(),
            block_size: dev.block_size(),
            sys_ind: 0,
            bootable: false,
        }
    }

    /// 分区字节长度
    pub fn byte_len(&self) -> u64 {
        self.size * self.block_size as u64
    }
}

/// 按分区号取分区描述
///
/// `index == 0` 表示整盘；`index >= 1` 从 MBR 分区表中取对应槽位。
pub fn partition_info(dev: &dyn BlockDriver, index: u32) -> Result<PartitionInfo, DeviceError> {
    if index == 0 {
        return Ok(PartitionInfo::whole_disk(dev));
    }
    let table = read_mbr(dev)?.ok_or(DeviceError::NoPartitionTable)?;
    table.get(index).cloned().ok_or(DeviceError::NoSuchPartition)
}

/// 分区内按字节寻址的读写视图
///
/// 文件系统后端只通过它访问介质，越过分区末尾的访问一律失败。
#[derive(Clone)]
pub struct BlockRange {
    device: Arc<dyn BlockDriver>,
    info: PartitionInfo,
}

impl BlockRange {
    /// 创建分区视图
    pub fn new(device: Arc<dyn BlockDriver>, info: PartitionInfo) -> Self {
        Self { device, info }
    }

    /// 底层设备
    pub fn device(&self) -> &Arc<dyn BlockDriver> {
        &self.device
    }

    /// 分区描述
    pub fn info(&self) -> &PartitionInfo {
        &self.info
    }

    /// 分区字节长度
    pub fn len(&self) -> u64 {
        self.info.byte_len()
    }

    /// 分区是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_span(&self, offset: u64, len: usize) -> Result<(), BlockError> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(BlockError::OutOfRange),
        }
    }

    /// 从分区内偏移 `offset` 处读满 `buf`
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        self.check_span(offset, buf.len())?;
        let bs = self.info.block_size;
        let mut block = vec![0u8; bs];
        let mut done = 0usize;
        while done < buf.len() {
            let pos = offset + done as u64;
            let lba = self.info.start + pos / bs as u64;
            let in_block = (pos % bs as u64) as usize;
            let n = (bs - in_block).min(buf.len() - done);
            self.device.read_block(lba, &mut block)?;
            buf[done..done + n].copy_from_slice(&block[in_block..in_block + n]);
            done += n;
        }
        Ok(())
    }

    /// 向分区内偏移 `offset` 处写入 `buf`，非整块部分先读后写
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> Result<(), BlockError> {
        self.check_span(offset, buf.len())?;
        let bs = self.info.block_size;
        let mut block = vec![0u8; bs];
        let mut done = 0usize;
        while done < buf.len() {
            let pos = offset + done as u64;
            let lba = self.info.start + pos / bs as u64;
            let in_block = (pos % bs as u64) as usize;
            let n = (bs - in_block).min(buf.len() - done);
            if n != bs {
                self.device.read_block(lba, &mut block)?;
            }
            block[in_block..in_block + n].copy_from_slice(&buf[done..done + n]);
            self.device.write_block(lba, &block)?;
            done += n;
        }
        Ok(())
    }

    /// 刷新底层设备
    pub fn flush(&self) -> Result<(), BlockError> {
        self.device.flush()
    }
}
