//! 把分区视图适配为 `ext4_rs::BlockDevice`

use alloc::vec;
use alloc::vec::Vec;
use log::error;

use device::BlockRange;

/// `ext4_rs` 每次 I/O 的字节数
pub const EXT4_IO_SIZE: usize = 4096;

/// 块设备适配器
pub struct BlockDeviceAdapter {
    range: BlockRange,
}

impl BlockDeviceAdapter {
    /// 包装分区视图
    pub fn new(range: BlockRange) -> Self {
        Self { range }
    }
}

impl ext4_rs::BlockDevice for BlockDeviceAdapter {
    fn read_offset(&self, offset: usize) -> Vec<u8> {
        let mut buf = vec![0u8; EXT4_IO_SIZE];
        let avail = self.range.len().saturating_sub(offset as u64);
        let n = (EXT4_IO_SIZE as u64).min(avail) as usize;
        if let Err(e) = self.range.read_at(offset as u64, &mut buf[..n]) {
            error!("[Ext4] read at {:#x} failed: {}", offset, e);
        }
        buf
    }

    fn write_offset(&self, offset: usize, data: &[u8]) {
        if let Err(e) = self.range.write_at(offset as u64, data) {
            error!("[Ext4] write at {:#x} failed: {}", offset, e);
        }
    }
}
