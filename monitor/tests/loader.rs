//! 加载器在后端出错时的行为：短写、读错误与保留区拒绝。

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use device::{BlockDeviceTable, BlockRange};
use mm::{MemError, MemoryLayout, PhysMemory, RamImage};
use monitor::{FsDispatch, FsRegistry};
use vfs::{FileSystem, FsCaps, FsDriver, FsError, FsType};

const FW_BASE: u64 = 0x8_0000;

/// 总是少写一个字节的文件系统
///
/// `/data` 读出 64 字节 0x5a，`/broken` 读取时报 I/O 错误，
/// 写 `/full` 报空间不足。
struct LossyFs {
    closes: Arc<AtomicUsize>,
}

impl FileSystem for LossyFs {
    fn fs_type(&self) -> FsType {
        FsType::Sandbox
    }

    fn size(&mut self, path: &str) -> Result<u64, FsError> {
        match path {
            "/data" | "/broken" => Ok(64),
            _ => Err(FsError::NotFound),
        }
    }

    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<u64, FsError> {
        if path == "/broken" {
            return Err(FsError::IoError);
        }
        let n = buf.len().min(64usize.saturating_sub(offset as usize));
        buf[..n].fill(0x5a);
        Ok(n as u64)
    }

    fn write(&mut self, path: &str, _offset: u64, buf: &[u8]) -> Result<u64, FsError> {
        if path == "/full" {
            return Err(FsError::NoSpace);
        }
        Ok(buf.len().saturating_sub(1) as u64)
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }
}

struct LossyDriver {
    closes: Arc<AtomicUsize>,
}

impl FsDriver for LossyDriver {
    fn fs_type(&self) -> FsType {
        FsType::Sandbox
    }

    fn allows_null_device(&self) -> bool {
        true
    }

    fn caps(&self) -> FsCaps {
        FsCaps::WRITE
    }

    fn probe(&self, _volume: Option<&BlockRange>) -> Result<Box<dyn FileSystem>, FsError> {
        Ok(Box::new(LossyFs {
            closes: self.closes.clone(),
        }))
    }
}

/// 把 RamImage 的活动映射数同步给测试
struct WatchedRam {
    ram: RamImage,
    active: Rc<Cell<usize>>,
}

impl PhysMemory for WatchedRam {
    fn map(&mut self, paddr: u64, len: usize) -> Result<(), MemError> {
        self.ram.map(paddr, len)?;
        self.active.set(self.ram.active_maps());
        Ok(())
    }

    fn bytes_mut(&mut self, paddr: u64, len: usize) -> Result<&mut [u8], MemError> {
        self.ram.bytes_mut(paddr, len)
    }

    fn unmap(&mut self, paddr: u64, len: usize) {
        self.ram.unmap(paddr, len);
        self.active.set(self.ram.active_maps());
    }
}

struct Rig {
    dispatch: FsDispatch,
    closes: Arc<AtomicUsize>,
    active_maps: Rc<Cell<usize>>,
}

impl Rig {
    fn new() -> Self {
        let closes = Arc::new(AtomicUsize::new(0));
        let active_maps = Rc::new(Cell::new(0));

        let mut table = BlockDeviceTable::new();
        table.register_device_less("stub");
        let registry = FsRegistry::new().with(Arc::new(LossyDriver {
            closes: closes.clone(),
        }));
        let layout = MemoryLayout::new()
            .with_bank(0, 0x10_0000)
            .with_firmware_region(FW_BASE, 0x1_0000);
        let dispatch = FsDispatch::new(
            registry,
            Box::new(table),
            Box::new(WatchedRam {
                ram: RamImage::new(0, 0x10_0000),
                active: active_maps.clone(),
            }),
            Box::new(layout),
        );
        Self {
            dispatch,
            closes,
            active_maps,
        }
    }

    fn bind(&mut self) {
        self.dispatch.bind("stub", None, None).unwrap();
    }

    fn closes(&self) -> usize {
        self.closes.load(Ordering::Relaxed)
    }
}

#[test]
fn test_short_write_is_reported() {
    let mut rig = Rig::new();
    rig.bind();
    assert_eq!(
        rig.dispatch.write("/data", 0x1000, 0, 16),
        Err(FsError::ShortWrite)
    );
    assert_eq!(rig.closes(), 1);
    assert_eq!(rig.active_maps.get(), 0);
    assert_eq!(rig.dispatch.active_type_name(), "unsupported");
}

#[test]
fn test_write_error_passes_through() {
    let mut rig = Rig::new();
    rig.bind();
    assert_eq!(
        rig.dispatch.write("/full", 0x1000, 0, 16),
        Err(FsError::NoSpace)
    );
    assert_eq!(rig.closes(), 1);
    assert_eq!(rig.active_maps.get(), 0);
}

#[test]
fn test_read_error_releases_window() {
    let mut rig = Rig::new();
    rig.bind();
    assert_eq!(
        rig.dispatch.read("/broken", 0x1000, 0, 0, true),
        Err(FsError::IoError)
    );
    assert_eq!(rig.active_maps.get(), 0);
    assert_eq!(rig.closes(), 1);

    rig.bind();
    assert_eq!(
        rig.dispatch.read("/broken", 0x1000, 0, 16, false),
        Err(FsError::IoError)
    );
    assert_eq!(rig.active_maps.get(), 0);
    assert_eq!(rig.closes(), 2);
}

#[test]
fn test_reserved_destination_is_rejected() {
    let mut rig = Rig::new();
    rig.bind();
    assert_eq!(
        rig.dispatch.read("/data", FW_BASE - 0x20, 0, 0, true),
        Err(FsError::NoSpace)
    );
    assert_eq!(rig.active_maps.get(), 0);
    assert_eq!(rig.closes(), 1);
    let mem = rig.dispatch.memory_mut().bytes_mut(FW_BASE - 0x20, 0x20).unwrap();
    assert!(mem.iter().all(|&b| b == 0));
}

#[test]
fn test_successful_read_releases_window() {
    let mut rig = Rig::new();
    rig.bind();
    assert_eq!(rig.dispatch.read("/data", 0x1000, 0, 0, true), Ok(64));
    assert_eq!(rig.active_maps.get(), 0);
    assert_eq!(rig.closes(), 1);
    let mem = rig.dispatch.memory_mut().bytes_mut(0x1000, 64).unwrap();
    assert!(mem.iter().all(|&b| b == 0x5a));
}
