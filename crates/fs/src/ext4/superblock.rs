//! ext2/3/4 超级块解析
//!
//! 只读取探测和 `uuid` 所需的字段，文件操作交给 `ext4_rs`。

use alloc::format;
use alloc::string::String;

use device::BlockRange;
use vfs::FsError;

/// 超级块在分区内的字节偏移
pub const SUPERBLOCK_OFFSET: u64 = 1024;
/// 超级块大小
pub const SUPERBLOCK_SIZE: usize = 1024;
/// 魔数
pub const EXT4_MAGIC: u16 = 0xEF53;

const OFF_INODES_COUNT: usize = 0x00;
const OFF_BLOCKS_COUNT_LO: usize = 0x04;
const OFF_LOG_BLOCK_SIZE: usize = 0x18;
const OFF_MAGIC: usize = 0x38;
const OFF_FEATURE_INCOMPAT: usize = 0x60;
const OFF_UUID: usize = 0x68;
const OFF_VOLUME_NAME: usize = 0x78;

/// 需要的超级块字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperBlock {
    /// inode 总数
    pub inodes_count: u32,
    /// 块总数（低 32 位）
    pub blocks_count: u32,
    /// 块大小（字节）
    pub block_size: u32,
    /// 不兼容特性位
    pub feature_incompat: u32,
    /// 卷 UUID
    pub uuid: [u8; 16],
    /// 卷标
    pub volume_name: String,
}

fn le32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

impl SuperBlock {
    /// 从分区读取并校验超级块
    pub fn read(volume: &BlockRange) -> Result<Self, FsError> {
        if volume.len() < SUPERBLOCK_OFFSET + SUPERBLOCK_SIZE as u64 {
            return Err(FsError::InvalidArgument);
        }
        let mut raw = [0u8; SUPERBLOCK_SIZE];
        volume.read_at(SUPERBLOCK_OFFSET, &mut raw)?;
        Self::parse(&raw)
    }

    /// 解析超级块
    pub fn parse(raw: &[u8]) -> Result<Self, FsError> {
        if raw.len() < SUPERBLOCK_SIZE {
            return Err(FsError::InvalidArgument);
        }
        let magic = u16::from_le_bytes([raw[OFF_MAGIC], raw[OFF_MAGIC + 1]]);
        if magic != EXT4_MAGIC {
            return Err(FsError::InvalidArgument);
        }
        let log_block_size = le32(raw, OFF_LOG_BLOCK_SIZE);
        if log_block_size > 6 {
            return Err(FsError::InvalidArgument);
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&raw[OFF_UUID..OFF_UUID + 16]);
        let name = &raw[OFF_VOLUME_NAME..OFF_VOLUME_NAME + 16];
        let name_len = name.iter().position(|&b| b == 0).unwrap_or(name.len());

        Ok(Self {
            inodes_count: le32(raw, OFF_INODES_COUNT),
            blocks_count: le32(raw, OFF_BLOCKS_COUNT_LO),
            block_size: 1024 << log_block_size,
            feature_incompat: le32(raw, OFF_FEATURE_INCOMPAT),
            uuid,
            volume_name: String::from_utf8_lossy(&name[..name_len]).into_owned(),
        })
    }

    /// 规范格式的 UUID：`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`
    pub fn uuid_string(&self) -> String {
        let u = &self.uuid;
        format!(
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            u[0], u[1], u[2], u[3], u[4], u[5], u[6], u[7], u[8], u[9], u[10], u[11], u[12], u[13],
            u[14], u[15]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn raw_superblock(log_block_size: u32) -> [u8; SUPERBLOCK_SIZE] {
        let mut raw = [0u8; SUPERBLOCK_SIZE];
        raw[OFF_INODES_COUNT..OFF_INODES_COUNT + 4].copy_from_slice(&128u32.to_le_bytes());
        raw[OFF_BLOCKS_COUNT_LO..OFF_BLOCKS_COUNT_LO + 4].copy_from_slice(&1024u32.to_le_bytes());
        raw[OFF_LOG_BLOCK_SIZE..OFF_LOG_BLOCK_SIZE + 4]
            .copy_from_slice(&log_block_size.to_le_bytes());
        raw[OFF_MAGIC..OFF_MAGIC + 2].copy_from_slice(&EXT4_MAGIC.to_le_bytes());
        for (i, b) in raw[OFF_UUID..OFF_UUID + 16].iter_mut().enumerate() {
            *b = 0xA0 + i as u8;
        }
        raw[OFF_VOLUME_NAME..OFF_VOLUME_NAME + 6].copy_from_slice(b"rootfs");
        raw
    }

    #[test]
    fn test_parse_fields() {
        let sb = SuperBlock::parse(&raw_superblock(2)).unwrap();
        assert_eq!(sb.block_size, 4096);
        assert_eq!(sb.inodes_count, 128);
        assert_eq!(sb.volume_name, "rootfs");
    }

    #[test]
    fn test_uuid_is_canonical() {
        let sb = SuperBlock::parse(&raw_superblock(2)).unwrap();
        let uuid = sb.uuid_string();
        assert_eq!(uuid, "a0a1a2a3-a4a5-a6a7-a8a9-aaabacadaeaf");
        assert_eq!(uuid.len(), 36);
    }

    #[test]
    fn test_bad_magic() {
        let mut raw = raw_superblock(0);
        raw[OFF_MAGIC] = 0;
        assert_eq!(SuperBlock::parse(&raw), Err(FsError::InvalidArgument));
    }
}
