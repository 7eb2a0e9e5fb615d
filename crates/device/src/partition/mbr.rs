//! DOS 分区表（MBR）解析
//!
//! 只处理四个主分区槽位，扩展分区不展开。

use alloc::vec;
use log::debug;

use super::PartitionInfo;
use crate::block::BlockDriver;
use crate::error::BlockError;

/// 主分区槽位数
pub const MBR_ENTRY_COUNT: usize = 4;

const PART_TABLE_OFFSET: usize = 446;
const PART_ENTRY_SIZE: usize = 16;
const SIGNATURE_OFFSET: usize = 510;
/// FAT12/16 引导扇区中 "FAT" 字样的偏移
const FAT_MAGIC_OFFSET: usize = 0x36;
/// FAT32 引导扇区中 "FAT32" 字样的偏移
const FAT32_MAGIC_OFFSET: usize = 0x52;

const DOS_EXTENDED: u8 = 0x05;
const WIN98_EXTENDED: u8 = 0x0f;
const LINUX_EXTENDED: u8 = 0x85;

/// 解析后的主分区表，槽位号从 1 开始
#[derive(Debug, Clone, Default)]
pub struct MbrTable {
    entries: [Option<PartitionInfo>; MBR_ENTRY_COUNT],
}

impl MbrTable {
    /// 取第 `index` 号分区（1 起）
    pub fn get(&self, index: u32) -> Option<&PartitionInfo> {
        let slot = (index as usize).checked_sub(1)?;
        self.entries.get(slot)?.as_ref()
    }

    /// 按槽位顺序遍历有效分区，返回 `(分区号, 描述)`
    pub fn iter(&self) -> impl Iterator<Item = (u32, &PartitionInfo)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|p| (i as u32 + 1, p)))
    }

    /// 自动选择：第一个可引导分区，否则第一个有效分区
    pub fn auto_select(&self) -> Option<(u32, &PartitionInfo)> {
        self.iter()
            .find(|(_, p)| p.bootable)
            .or_else(|| self.iter().next())
    }
}

fn is_extended(sys_ind: u8) -> bool {
    matches!(sys_ind, DOS_EXTENDED | WIN98_EXTENDED | LINUX_EXTENDED)
}

fn le32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// 读取设备 0 号块上的 MBR
///
/// 没有签名、看起来是 FAT 引导扇区或者引导标志非法时返回 `Ok(None)`。
pub fn read_mbr(dev: &dyn BlockDriver) -> Result<Option<MbrTable>, BlockError> {
    let bs = dev.block_size();
    if bs < 512 || dev.total_blocks() == 0 {
        return Ok(None);
    }
    let mut sector = vec![0u8; bs];
    dev.read_block(0, &mut sector)?;

    if sector[SIGNATURE_OFFSET] != 0x55 || sector[SIGNATURE_OFFSET + 1] != 0xAA {
        return Ok(None);
    }
    if &sector[FAT_MAGIC_OFFSET..FAT_MAGIC_OFFSET + 3] == b"FAT"
        || &sector[FAT32_MAGIC_OFFSET..FAT32_MAGIC_OFFSET + 5] == b"FAT32"
    {
        debug!("[MBR] {}: sector 0 is a FAT boot sector", dev.get_id());
        return Ok(None);
    }

    let mut table = MbrTable::default();
    for (slot, entry) in table.entries.iter_mut().enumerate() {
        let raw = &sector[PART_TABLE_OFFSET + slot * PART_ENTRY_SIZE..][..PART_ENTRY_SIZE];
        let boot_ind = raw[0];
        if boot_ind != 0x00 && boot_ind != 0x80 {
            return Ok(None);
        }
        let sys_ind = raw[4];
        let start = le32(&raw[8..12]) as u64;
        let size = le32(&raw[12..16]) as u64;
        if sys_ind == 0 || size == 0 || is_extended(sys_ind) {
            continue;
        }
        *entry = Some(PartitionInfo {
            start,
            size,
            block_size: bs,
            sys_ind,
            bootable: boot_ind == 0x80,
        });
    }
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::RamDisk;

    fn put_entry(img: &mut [u8], slot: usize, boot: u8, sys: u8, start: u32, size: u32) {
        let e = &mut img[PART_TABLE_OFFSET + slot * PART_ENTRY_SIZE..][..PART_ENTRY_SIZE];
        e[0] = boot;
        e[4] = sys;
        e[8..12].copy_from_slice(&start.to_le_bytes());
        e[12..16].copy_from_slice(&size.to_le_bytes());
    }

    fn disk_with(f: impl FnOnce(&mut [u8])) -> alloc::sync::Arc<RamDisk> {
        let mut img = vec![0u8; 64 * 512];
        img[510] = 0x55;
        img[511] = 0xAA;
        f(&mut img);
        RamDisk::from_bytes(img, 512, 0)
    }

    #[test]
    fn test_primary_slots_keep_numbering() {
        let disk = disk_with(|img| {
            put_entry(img, 0, 0, 0x0c, 8, 16);
            put_entry(img, 2, 0x80, 0x83, 24, 32);
        });
        let table = read_mbr(&*disk).unwrap().unwrap();
        assert_eq!(table.get(1).unwrap().start, 8);
        assert!(table.get(2).is_none());
        assert_eq!(table.get(3).unwrap().size, 32);
        assert!(table.get(0).is_none());
        assert_eq!(table.auto_select().unwrap().0, 3);
    }

    #[test]
    fn test_auto_select_without_bootable() {
        let disk = disk_with(|img| {
            put_entry(img, 1, 0, 0x83, 8, 16);
            put_entry(img, 3, 0, 0x83, 30, 2);
        });
        let table = read_mbr(&*disk).unwrap().unwrap();
        assert_eq!(table.auto_select().unwrap().0, 2);
    }

    #[test]
    fn test_fat_boot_sector_is_not_mbr() {
        let disk = disk_with(|img| {
            img[FAT_MAGIC_OFFSET..FAT_MAGIC_OFFSET + 5].copy_from_slice(b"FAT16");
        });
        assert!(read_mbr(&*disk).unwrap().is_none());
    }

    #[test]
    fn test_missing_signature_and_bad_boot_flag() {
        let blank = RamDisk::new(4 * 512, 512, 0);
        assert!(read_mbr(&*blank).unwrap().is_none());

        let disk = disk_with(|img| put_entry(img, 0, 0x12, 0x83, 8, 16));
        assert!(read_mbr(&*disk).unwrap().is_none());
    }
}
