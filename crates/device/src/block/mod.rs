//! 块设备模块
//!
//! 包含块设备驱动接口和内存模拟实现

mod ram_disk;

use alloc::string::String;

use crate::error::BlockError;

pub use ram_disk::RamDisk;

/// 块设备驱动程序接口
///
/// 所有方法都只需要 `&self`，实现者自行负责内部可变性。
pub trait BlockDriver: Send + Sync {
    /// 设备标识，用于日志
    fn get_id(&self) -> String;

    /// 读取一个块
    /// # 参数：
    /// * `block_id` - 块号
    /// * `buf` - 长度必须等于 [`block_size`](Self::block_size)
    fn read_block(&self, block_id: u64, buf: &mut [u8]) -> Result<(), BlockError>;

    /// 写入一个块
    /// # 参数：
    /// * `block_id` - 块号
    /// * `buf` - 长度必须等于 [`block_size`](Self::block_size)
    fn write_block(&self, block_id: u64, buf: &[u8]) -> Result<(), BlockError>;

    /// 刷新到介质
    fn flush(&self) -> Result<(), BlockError> {
        Ok(())
    }

    /// 获取块大小（字节）
    fn block_size(&self) -> usize;

    /// 获取总块数
    fn total_blocks(&self) -> u64;
}
