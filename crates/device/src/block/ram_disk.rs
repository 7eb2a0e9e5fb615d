//! 内存模拟块设备

use super::BlockDriver;
use crate::error::BlockError;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use sync::SpinLock;

/// 内存模拟的块设备
///
/// 用于测试以及 sandbox 构建中挂载磁盘镜像
pub struct RamDisk {
    /// 存储数据
    data: SpinLock<Vec<u8>>,

    /// 块大小
    block_size: usize,

    /// 设备 ID
    device_id: usize,
}

impl RamDisk {
    /// 创建指定大小的内存磁盘
    pub fn new(size: usize, block_size: usize, device_id: usize) -> Arc<Self> {
        Self::from_bytes(vec![0u8; size], block_size, device_id)
    }

    /// 从磁盘镜像创建，长度向上补齐到块大小的整数倍
    pub fn from_bytes(mut data: Vec<u8>, block_size: usize, device_id: usize) -> Arc<Self> {
        let rem = data.len() % block_size;
        if rem != 0 {
            data.resize(data.len() + block_size - rem, 0);
        }
        Arc::new(Self {
            data: SpinLock::new(data),
            block_size,
            device_id,
        })
    }

    /// 获取原始数据（用于调试和测试断言）
    pub fn raw_data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// 获取设备 ID
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    fn block_span(&self, block_id: u64, len: usize, total: usize) -> Result<usize, BlockError> {
        if len != self.block_size {
            return Err(BlockError::BadBuffer);
        }
        let offset = usize::try_from(block_id)
            .ok()
            .and_then(|b| b.checked_mul(self.block_size))
            .ok_or(BlockError::OutOfRange)?;
        if offset + self.block_size > total {
            return Err(BlockError::OutOfRange);
        }
        Ok(offset)
    }
}

impl BlockDriver for RamDisk {
    fn get_id(&self) -> String {
        format!("ramdisk_{}", self.device_id)
    }

    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        let data = self.data.lock();
        let offset = self.block_span(block_id, buf.len(), data.len())?;
        buf.copy_from_slice(&data[offset..offset + self.block_size]);
        Ok(())
    }

    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<(), BlockError> {
        let mut data = self.data.lock();
        let offset = self.block_span(block_id, buf.len(), data.len())?;
        data[offset..offset + self.block_size].copy_from_slice(buf);
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn total_blocks(&self) -> u64 {
        (self.data.lock().len() / self.block_size) as u64
    }
}
