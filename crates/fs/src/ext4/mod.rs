//! ext4 读写后端
//!
//! 底层由 `ext4_rs` 完成，探测与 UUID 只读取原始超级块，
//! `ext4_rs` 实例在第一次文件操作时才创建。

mod adapter;
mod superblock;
mod volume;

use alloc::boxed::Box;
use log::debug;

use device::BlockRange;
use vfs::{FileSystem, FsCaps, FsDriver, FsError, FsType};

pub use adapter::{BlockDeviceAdapter, EXT4_IO_SIZE};
pub use superblock::{EXT4_MAGIC, SuperBlock};
pub use volume::Ext4Volume;

/// ext4 文件系统类型描述符
#[derive(Debug, Default)]
pub struct Ext4Driver;

impl Ext4Driver {
    /// 创建描述符
    pub const fn new() -> Self {
        Self
    }
}

impl FsDriver for Ext4Driver {
    fn fs_type(&self) -> FsType {
        FsType::Ext4
    }

    fn caps(&self) -> FsCaps {
        FsCaps::WRITE | FsCaps::UNLINK | FsCaps::MKDIR | FsCaps::LINK | FsCaps::UUID | FsCaps::OPENDIR
    }

    fn probe(&self, volume: Option<&BlockRange>) -> Result<Box<dyn FileSystem>, FsError> {
        let volume = volume.ok_or(FsError::NoDevice)?;
        let sb = SuperBlock::read(volume)?;
        debug!(
            "[Ext4] mounted on {}: block size {}, label {:?}",
            volume.device().get_id(),
            sb.block_size,
            sb.volume_name
        );
        Ok(Box::new(Ext4Volume::new(volume.clone(), sb)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use device::{PartitionInfo, RamDisk};

    const OFF_MAGIC: usize = 1024 + 0x38;
    const OFF_UUID: usize = 1024 + 0x68;

    fn ext4_like_disk() -> BlockRange {
        let mut img = vec![0u8; 64 * 1024];
        img[1024 + 0x18] = 2;
        img[OFF_MAGIC..OFF_MAGIC + 2].copy_from_slice(&EXT4_MAGIC.to_le_bytes());
        img[OFF_UUID..OFF_UUID + 16].copy_from_slice(&[
            0x3e, 0x5f, 0x1b, 0x22, 0x90, 0x0d, 0x4c, 0x1a, 0x8f, 0x6b, 0x11, 0x22, 0x33, 0x44,
            0x55, 0x66,
        ]);
        let disk = RamDisk::from_bytes(img, 512, 0);
        let info = PartitionInfo::whole_disk(&*disk);
        BlockRange::new(disk, info)
    }

    #[test]
    fn test_detect_and_uuid() {
        let mut fs = Ext4Driver::new().probe(Some(&ext4_like_disk())).unwrap();
        assert_eq!(fs.fs_type(), FsType::Ext4);
        assert_eq!(fs.uuid().unwrap(), "3e5f1b22-900d-4c1a-8f6b-112233445566");
    }

    #[test]
    fn test_detect_rejects_other_media() {
        let disk = RamDisk::new(64 * 1024, 512, 1);
        let info = PartitionInfo::whole_disk(&*disk);
        assert!(
            Ext4Driver::new()
                .probe(Some(&BlockRange::new(disk, info)))
                .is_err()
        );
        assert_eq!(Ext4Driver::new().probe(None).err(), Some(FsError::NoDevice));

        let tiny = RamDisk::new(1024, 512, 2);
        let info = PartitionInfo::whole_disk(&*tiny);
        assert!(
            Ext4Driver::new()
                .probe(Some(&BlockRange::new(tiny, info)))
                .is_err()
        );
    }

    #[test]
    fn test_adapter_reads_past_end_as_zero() {
        use ext4_rs::BlockDevice;
        let range = ext4_like_disk();
        let adapter = BlockDeviceAdapter::new(range);
        let block = adapter.read_offset(62 * 1024);
        assert_eq!(block.len(), EXT4_IO_SIZE);
        let first = adapter.read_offset(0);
        assert_eq!(&first[0x438..0x43a], &EXT4_MAGIC.to_le_bytes());
    }

    fn fixture_volume() -> Box<dyn FileSystem> {
        let disk = RamDisk::from_bytes(test_support::ext4_fixture(), 512, 4);
        let info = PartitionInfo::whole_disk(&*disk);
        Ext4Driver::new()
            .probe(Some(&BlockRange::new(disk, info)))
            .unwrap()
    }

    #[test]
    fn test_fixture_read_and_stream() {
        let mut fs = fixture_volume();
        assert_eq!(fs.uuid().unwrap(), test_support::EXT4_FIXTURE_UUID);

        let mut buf = [0u8; 32];
        assert_eq!(fs.read("/uEnv.txt", 0, &mut buf), Ok(13));
        assert_eq!(&buf[..13], b"bootcmd=boot\n");
        assert_eq!(fs.read("/uEnv.txt", 8, &mut buf), Ok(5));
        assert_eq!(fs.read("/uEnv.txt", 13, &mut buf), Ok(0));
        assert_eq!(fs.size("/kernel"), Ok(10000));
        assert!(!fs.exists("/missing"));

        let mut cursor = fs.open_dir("/extlinux").unwrap();
        let entry = fs.read_dir(&mut cursor).unwrap();
        assert_eq!(entry.name, "extlinux.conf");
        assert_eq!(entry.kind, vfs::DirEntryKind::Regular);
        assert_eq!(fs.read_dir(&mut cursor), Err(FsError::NotFound));
        fs.close_dir(cursor);

        assert_eq!(fs.open_dir("/uEnv.txt").err(), Some(FsError::NotDirectory));
        fs.close();
    }

    #[test]
    fn test_fixture_write_then_reopen() {
        let disk = RamDisk::from_bytes(test_support::ext4_fixture(), 512, 5);
        let info = PartitionInfo::whole_disk(&*disk);
        let range = BlockRange::new(disk, info);

        let mut fs = Ext4Driver::new().probe(Some(&range)).unwrap();
        assert_eq!(fs.write("/boot/cmdline", 0, b"console=ttyS0"), Ok(13));
        fs.close();

        // 新会话重新从磁盘打开
        let mut fs = Ext4Driver::new().probe(Some(&range)).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(fs.read("/boot/cmdline", 0, &mut buf), Ok(13));
        assert_eq!(&buf[..13], b"console=ttyS0");
    }
}
