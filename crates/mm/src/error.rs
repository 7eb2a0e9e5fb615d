//! 内存相关错误

use core::fmt;

/// 内存保留与映射错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    /// 请求的区间与已保留区间重叠
    Overlap,
    /// 请求的区间不在任何内存 bank 内，或地址溢出
    OutOfRange,
    /// 设备树格式错误
    InvalidFdt,
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemError::Overlap => f.write_str("overlaps reserved region"),
            MemError::OutOfRange => f.write_str("outside of memory"),
            MemError::InvalidFdt => f.write_str("invalid device tree"),
        }
    }
}
