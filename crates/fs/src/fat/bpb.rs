//! FAT 引导扇区（BPB）解析

use log::debug;
use vfs::FsError;

/// FAT 变体，由簇数决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    /// 少于 4085 簇
    Fat12,
    /// 少于 65525 簇
    Fat16,
    /// 其余
    Fat32,
}

/// 解析后的 BPB 及派生布局
#[derive(Debug, Clone)]
pub struct Bpb {
    /// 每扇区字节数
    pub bytes_per_sector: u32,
    /// 每簇扇区数
    pub sectors_per_cluster: u32,
    /// 保留扇区数
    pub reserved_sectors: u32,
    /// FAT 表个数
    pub num_fats: u32,
    /// FAT12/16 根目录项数
    pub root_entry_count: u32,
    /// 总扇区数
    pub total_sectors: u32,
    /// 每个 FAT 表的扇区数
    pub fat_size: u32,
    /// FAT32 根目录起始簇
    pub root_cluster: u32,
    /// 卷序列号
    pub volume_id: u32,
    /// 变体
    pub fat_type: FatType,
    /// 数据区簇数
    pub cluster_count: u32,
}

fn le16(b: &[u8], off: usize) -> u32 {
    u16::from_le_bytes([b[off], b[off + 1]]) as u32
}

fn le32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

impl Bpb {
    /// 从引导扇区的前 512 字节解析
    pub fn parse(sector: &[u8]) -> Result<Self, FsError> {
        if sector.len() < 512 || sector[510] != 0x55 || sector[511] != 0xAA {
            return Err(FsError::InvalidArgument);
        }
        if sector[0] != 0xEB && sector[0] != 0xE9 {
            return Err(FsError::InvalidArgument);
        }

        let bytes_per_sector = le16(sector, 11);
        let sectors_per_cluster = sector[13] as u32;
        let reserved_sectors = le16(sector, 14);
        let num_fats = sector[16] as u32;
        let root_entry_count = le16(sector, 17);
        let total16 = le16(sector, 19);
        let fat16_size = le16(sector, 22);
        let total32 = le32(sector, 32);

        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096)
            || !sectors_per_cluster.is_power_of_two()
            || sectors_per_cluster > 128
            || reserved_sectors == 0
            || num_fats == 0
        {
            return Err(FsError::InvalidArgument);
        }

        let total_sectors = if total16 != 0 { total16 } else { total32 };
        let fat_size = if fat16_size != 0 {
            fat16_size
        } else {
            le32(sector, 36)
        };
        if total_sectors == 0 || fat_size == 0 {
            return Err(FsError::InvalidArgument);
        }

        let root_dir_sectors = (root_entry_count * 32).div_ceil(bytes_per_sector);
        let meta = num_fats
            .checked_mul(fat_size)
            .and_then(|fats| fats.checked_add(reserved_sectors))
            .and_then(|m| m.checked_add(root_dir_sectors))
            .ok_or_else(|| {
                debug!("[FAT] {} FATs of {} sectors overflow", num_fats, fat_size);
                FsError::InvalidArgument
            })?;
        let data_sectors = total_sectors
            .checked_sub(meta)
            .ok_or(FsError::InvalidArgument)?;
        let cluster_count = data_sectors / sectors_per_cluster;

        let fat_type = if cluster_count < 4085 {
            FatType::Fat12
        } else if cluster_count < 65525 {
            FatType::Fat16
        } else {
            FatType::Fat32
        };

        let (root_cluster, volume_id) = match fat_type {
            FatType::Fat32 => {
                if root_entry_count != 0 {
                    return Err(FsError::InvalidArgument);
                }
                (le32(sector, 44), le32(sector, 67))
            }
            _ => (0, le32(sector, 39)),
        };

        debug!(
            "[FAT] {:?}: {} clusters of {} bytes",
            fat_type,
            cluster_count,
            u64::from(sectors_per_cluster) * u64::from(bytes_per_sector)
        );

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entry_count,
            total_sectors,
            fat_size,
            root_cluster,
            volume_id,
            fat_type,
            cluster_count,
        })
    }

    /// 每簇字节数
    pub fn cluster_bytes(&self) -> u64 {
        u64::from(self.sectors_per_cluster) * u64::from(self.bytes_per_sector)
    }

    /// 第一个 FAT 表的字节偏移
    pub fn fat_offset(&self) -> u64 {
        u64::from(self.reserved_sectors) * u64::from(self.bytes_per_sector)
    }

    /// FAT12/16 固定根目录区的字节偏移
    pub fn root_dir_offset(&self) -> u64 {
        let fats = u64::from(self.num_fats) * u64::from(self.fat_size);
        self.fat_offset() + fats * u64::from(self.bytes_per_sector)
    }

    /// FAT12/16 固定根目录区的字节长度
    pub fn root_dir_bytes(&self) -> u64 {
        u64::from(self.root_entry_count) * 32
    }

    /// 数据区的字节偏移
    pub fn data_offset(&self) -> u64 {
        let root = self
            .root_dir_bytes()
            .div_ceil(self.bytes_per_sector as u64)
            * self.bytes_per_sector as u64;
        self.root_dir_offset() + root
    }

    /// 簇号对应的字节偏移
    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        self.data_offset() + u64::from(cluster.saturating_sub(2)) * self.cluster_bytes()
    }

    /// 簇号是否落在数据区内
    pub fn is_valid_cluster(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster < self.cluster_count + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::FatImageBuilder;

    #[test]
    fn test_parse_fat12_layout() {
        let img = FatImageBuilder::fat12().build();
        let bpb = Bpb::parse(&img[..512]).unwrap();
        assert_eq!(bpb.fat_type, FatType::Fat12);
        assert_eq!(bpb.bytes_per_sector, 512);
        assert_eq!(bpb.root_entry_count, 512);
        assert_eq!(bpb.fat_offset(), 512);
        assert_eq!(bpb.data_offset(), bpb.root_dir_offset() + 512 * 32);
        assert_eq!(bpb.volume_id, 0x1234_abcd);
    }

    #[test]
    fn test_parse_fat16() {
        let img = FatImageBuilder::fat16().build();
        let bpb = Bpb::parse(&img[..512]).unwrap();
        assert_eq!(bpb.fat_type, FatType::Fat16);
        assert!(bpb.is_valid_cluster(2));
        assert!(!bpb.is_valid_cluster(bpb.cluster_count + 2));
    }

    #[test]
    fn test_reject_garbage() {
        let mut img = FatImageBuilder::fat12().build();
        assert!(Bpb::parse(&[0u8; 512]).is_err());
        img[11] = 0x00;
        img[12] = 0x03; // 768 字节扇区
        assert!(Bpb::parse(&img[..512]).is_err());
    }

    #[test]
    fn test_reject_oversized_fat() {
        let mut img = FatImageBuilder::fat12().build();
        img[22..24].copy_from_slice(&0u16.to_le_bytes());
        img[36..40].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        img[19..21].copy_from_slice(&0u16.to_le_bytes());
        img[32..36].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(Bpb::parse(&img[..512]).err(), Some(FsError::InvalidArgument));

        // FAT 表本身不溢出，但超过总扇区数
        img[36..40].copy_from_slice(&0x1000_0000u32.to_le_bytes());
        img[32..36].copy_from_slice(&0x1000u32.to_le_bytes());
        assert_eq!(Bpb::parse(&img[..512]).err(), Some(FsError::InvalidArgument));
    }

    #[test]
    fn test_offsets_do_not_wrap() {
        let bpb = Bpb {
            bytes_per_sector: 4096,
            sectors_per_cluster: 128,
            reserved_sectors: 32,
            num_fats: 2,
            root_entry_count: 0,
            total_sectors: u32::MAX,
            fat_size: 0x0100_0000,
            root_cluster: 2,
            volume_id: 0,
            fat_type: FatType::Fat32,
            cluster_count: 0x0010_0000,
        };
        assert_eq!(bpb.root_dir_offset(), 32 * 4096 + 2 * 0x0100_0000 * 4096);
        assert_eq!(
            bpb.cluster_offset(3),
            bpb.data_offset() + 128 * 4096
        );
    }
}
