//! 块设备与分区解析
//!
//! 此 crate 提供监控程序访问存储介质所需的最小抽象：
//!
//! - [`BlockDriver`] trait - 块设备驱动接口
//! - [`RamDisk`] - 内存模拟块设备
//! - [`PartitionInfo`] / [`BlockRange`] - 分区描述与按字节寻址的分区读写
//! - [`BlockDeviceTable`] - 按接口名登记设备，实现 [`PartitionResolver`]
//!
//! 设备/分区说明符的语法为 `dev[:part]`，数字均为十六进制，
//! `part` 可以是 `auto`。

#![no_std]

extern crate alloc;

pub mod block;
pub mod error;
pub mod partition;
pub mod table;

pub use block::{BlockDriver, RamDisk};
pub use error::{BlockError, DeviceError};
pub use partition::{BlockRange, PartitionInfo, partition_info};
pub use table::{BlockDeviceTable, PartitionResolver, ResolvedPartition};
