//! 物理内存保留与映射
//!
//! 监控程序把文件直接读进物理内存，此时没有操作系统替它检查地址是否安全。
//! 此 crate 提供两件事：
//!
//! - [`ReservationTracker`] / [`Lmb`]：记录固件自身占用的物理区间
//!   （镜像、栈、设备树等），新的保留请求与之重叠时拒绝
//! - [`PhysMemory`] / [`MemWindow`]：按需映射物理区间，离开作用域自动解除映射
//!
//! [`MemoryLayout`] 描述板级内存布局，每次需要检查时用它构造一个新的 [`Lmb`]。

#![no_std]

extern crate alloc;

mod dtb;
mod error;
mod layout;
mod lmb;
mod sysmem;

pub use dtb::fdt_reservations;
pub use error::MemError;
pub use layout::{FdtBlob, MemoryLayout, ReservationSource};
pub use lmb::{Lmb, Region, RegionList, ReservationTracker};
pub use sysmem::{DirectMap, MemWindow, PhysMemory, RamImage};
