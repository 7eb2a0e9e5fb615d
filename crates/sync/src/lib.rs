//! 同步原语
//!
//! 监控程序在单核、关中断的环境下运行，这里只提供最基本的自旋锁，
//! 用于块设备和内存文件系统中的内部可变性。
//!
//! 锁的外层接口由 `lock_api` 提供，本 crate 只实现底层的 [`RawSpinLock`]。

#![no_std]

mod raw_spin_lock;
mod spin_lock;

pub use raw_spin_lock::RawSpinLock;
pub use spin_lock::{SpinLock, SpinLockGuard};
