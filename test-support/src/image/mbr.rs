//! 带 DOS 分区表的磁盘镜像

use alloc::vec;
use alloc::vec::Vec;

/// 第一个分区的起始扇区
pub const FIRST_PART_LBA: u32 = 64;

/// 一个主分区
pub struct MbrPart {
    /// 分区类型字节（0x0c FAT32 LBA、0x06 FAT16、0x83 Linux ...）
    pub sys_ind: u8,
    /// 可引导标志
    pub bootable: bool,
    /// 分区内容，长度按 512 字节向上取整
    pub image: Vec<u8>,
}

/// 把若干分区依次放入一块磁盘，生成 MBR
///
/// 分区从 [`FIRST_PART_LBA`] 开始紧密排列，最多四个。
pub fn mbr_disk(parts: &[MbrPart]) -> Vec<u8> {
    assert!(parts.len() <= 4, "at most four primary partitions");
    let mut lba = FIRST_PART_LBA;
    let mut layout = Vec::new();
    for p in parts {
        let sectors = p.image.len().div_ceil(512) as u32;
        layout.push((lba, sectors));
        lba += sectors;
    }

    let mut disk = vec![0u8; lba as usize * 512];
    for (slot, (p, &(start, sectors))) in parts.iter().zip(layout.iter()).enumerate() {
        let e = &mut disk[446 + slot * 16..][..16];
        e[0] = if p.bootable { 0x80 } else { 0x00 };
        e[4] = p.sys_ind;
        e[8..12].copy_from_slice(&start.to_le_bytes());
        e[12..16].copy_from_slice(&sectors.to_le_bytes());

        let off = start as usize * 512;
        disk[off..off + p.image.len()].copy_from_slice(&p.image);
    }
    disk[510] = 0x55;
    disk[511] = 0xAA;
    disk
}
