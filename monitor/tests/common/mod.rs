//! 集成测试共用的设备与内存夹具。

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use device::{BlockDeviceTable, RamDisk};
use fs::{Ext4Driver, FatDriver, SandboxDriver};
use mm::{MemError, MemoryLayout, RamImage, ReservationSource, ReservationTracker};
use monitor::{FsDispatch, FsRegistry};
use test_support::{FatImageBuilder, MbrPart, ext4_fixture, mbr_disk};

pub const RAM_BASE: u64 = 0;
pub const RAM_SIZE: usize = 0x10_0000;
/// 固件占用区间
pub const FW_BASE: u64 = 0x8_0000;
pub const FW_SIZE: u64 = 0x1_0000;

pub const EXT4_UUID: [u8; 16] = [
    0x3e, 0x5f, 0x1b, 0x22, 0x90, 0x0d, 0x4c, 0x1a, 0x8f, 0x6b, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
];

/// 记录 tracker() 调用次数的保留来源
pub struct CountingSource {
    layout: MemoryLayout,
    calls: Rc<Cell<usize>>,
}

impl ReservationSource for CountingSource {
    fn tracker(&self) -> Result<Box<dyn ReservationTracker>, MemError> {
        self.calls.set(self.calls.get() + 1);
        self.layout.tracker()
    }
}

pub struct Fixture {
    pub dispatch: FsDispatch,
    pub sandbox: SandboxDriver,
    pub tracker_calls: Rc<Cell<usize>>,
}

pub fn fat_image() -> Vec<u8> {
    FatImageBuilder::fat12()
        .file("/boot.scr", &[0x42; 128])
        .file("/EFI/BOOT/bootmips.efi", &[0x11; 700])
        .dir("/EFI")
        .build()
}

pub fn ext4_like_image() -> Vec<u8> {
    let mut img = vec![0u8; 64 * 1024];
    img[1024 + 0x18] = 2;
    img[1024 + 0x38..1024 + 0x3a].copy_from_slice(&0xEF53u16.to_le_bytes());
    img[1024 + 0x68..1024 + 0x78].copy_from_slice(&EXT4_UUID);
    img
}

/// mmc 0：MBR 磁盘，分区 1 为 FAT12
/// mmc 1：空白磁盘
/// mmc 2：只有 ext4 超级块的整盘
/// mmc 3：MBR 磁盘，分区 1 为 4 KiB 块的 ext4 卷
/// hostfs：无设备接口，对应沙盒
pub fn fixture() -> Fixture {
    let mut table = BlockDeviceTable::new();
    let disk = mbr_disk(&[MbrPart {
        sys_ind: 0x01,
        bootable: false,
        image: fat_image(),
    }]);
    table.register("mmc", 0, RamDisk::from_bytes(disk, 512, 0));
    table.register("mmc", 1, RamDisk::new(64 * 512, 512, 1));
    table.register("mmc", 2, RamDisk::from_bytes(ext4_like_image(), 512, 2));
    let disk = mbr_disk(&[MbrPart {
        sys_ind: 0x83,
        bootable: true,
        image: ext4_fixture(),
    }]);
    table.register("mmc", 3, RamDisk::from_bytes(disk, 512, 3));
    table.register_device_less("hostfs");

    let sandbox = SandboxDriver::default();
    {
        let mut seed = sandbox.session();
        seed.create_dir_all("/tftpboot").unwrap();
        use vfs::FileSystem;
        seed.write("/tftpboot/vmlinux", 0, &[0x7f; 300]).unwrap();
        seed.write("/uEnv.txt", 0, b"bootcmd=boot\n").unwrap();
        seed.link("/kernel", "tftpboot/vmlinux").unwrap();
    }

    let registry = FsRegistry::new()
        .with(Arc::new(FatDriver::new()))
        .with(Arc::new(Ext4Driver::new()))
        .with(Arc::new(sandbox.clone()));

    let tracker_calls = Rc::new(Cell::new(0));
    let layout = MemoryLayout::new()
        .with_bank(RAM_BASE, RAM_SIZE as u64)
        .with_firmware_region(FW_BASE, FW_SIZE);

    let dispatch = FsDispatch::new(
        registry,
        Box::new(table),
        Box::new(RamImage::new(RAM_BASE, RAM_SIZE)),
        Box::new(CountingSource {
            layout,
            calls: tracker_calls.clone(),
        }),
    );

    Fixture {
        dispatch,
        sandbox,
        tracker_calls,
    }
}

/// 解析通用列目录输出，返回 (名字, 是否目录)
pub fn parse_generic_listing(out: &str) -> Vec<(String, bool)> {
    let mut entries = Vec::new();
    for line in out.lines() {
        if let Some(name) = line
            .strip_prefix("            ")
            .and_then(|l| l.strip_suffix('/'))
        {
            entries.push((name.to_string(), true));
        } else if let Some((_, name)) = line.trim_start().split_once("   ") {
            entries.push((name.to_string(), false));
        }
    }
    entries
}
