//! 测试支持 crate
//!
//! 提供不依赖任何工作区 crate 的磁盘镜像与设备树构造工具，
//! 供各 crate 的测试构造输入数据。

#![no_std]

extern crate alloc;

pub mod image;

pub use image::dtb::DtbBuilder;
pub use image::ext4::{EXT4_FIXTURE_KERNEL_LEN, EXT4_FIXTURE_UUID, ext4_fixture, ext4_fixture_kernel};
pub use image::fat::{FatImageBuilder, FatKind};
pub use image::mbr::{MbrPart, mbr_disk};
