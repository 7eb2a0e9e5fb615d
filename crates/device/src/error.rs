//! 块设备错误类型

use core::fmt;

/// 块设备 I/O 错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// 块号或偏移超出设备/分区范围
    OutOfRange,
    /// 缓冲区长度与块大小不匹配
    BadBuffer,
    /// 设备报告的 I/O 错误
    Io,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::OutOfRange => f.write_str("block out of range"),
            BlockError::BadBuffer => f.write_str("bad buffer length"),
            BlockError::Io => f.write_str("I/O error"),
        }
    }
}

/// 设备/分区解析错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 未登记的接口名
    NoSuchInterface,
    /// 接口下不存在该设备号
    NoSuchDevice,
    /// 分区号无效
    NoSuchPartition,
    /// 指定了分区号但设备上没有分区表
    NoPartitionTable,
    /// 设备大小为 0
    BadDeviceSize,
    /// 说明符语法错误
    BadSpec,
    /// 没有给出说明符
    NoDeviceSpecified,
    /// 读取分区表时发生 I/O 错误
    Io(BlockError),
}

impl From<BlockError> for DeviceError {
    fn from(e: BlockError) -> Self {
        DeviceError::Io(e)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NoSuchInterface => f.write_str("unknown interface"),
            DeviceError::NoSuchDevice => f.write_str("bad device"),
            DeviceError::NoSuchPartition => f.write_str("invalid partition"),
            DeviceError::NoPartitionTable => f.write_str("no partition table"),
            DeviceError::BadDeviceSize => f.write_str("bad device size"),
            DeviceError::BadSpec => f.write_str("bad device specification"),
            DeviceError::NoDeviceSpecified => f.write_str("no device specified"),
            DeviceError::Io(e) => write!(f, "{}", e),
        }
    }
}
