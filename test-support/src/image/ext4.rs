//! 预先生成的 ext4 卷
//!
//! `fixtures/ext4_4k.bin` 由 `fixtures/mkext4.sh` 生成，只保存非零块。
//! 卷内容：
//!
//! - `/boot/vmlinux`：10000 字节，第 i 字节为 `(i * 7 + 3) & 0xff`
//! - `/uEnv.txt`：`bootcmd=boot\n`
//! - `/extlinux/extlinux.conf`
//! - `/empty/`：空目录
//! - `/kernel`：指向 `boot/vmlinux` 的符号链接
//! - `/lost+found/`

use alloc::vec;
use alloc::vec::Vec;

static PACKED: &[u8] = include_bytes!("../../fixtures/ext4_4k.bin");

/// 卷 UUID
pub const EXT4_FIXTURE_UUID: &str = "6f1c2a3b-4d5e-4f60-8a7b-9c0d1e2f3a4b";

/// `/boot/vmlinux` 的长度
pub const EXT4_FIXTURE_KERNEL_LEN: usize = 10000;

fn le32(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

/// `/boot/vmlinux` 的内容
pub fn ext4_fixture_kernel() -> Vec<u8> {
    (0..EXT4_FIXTURE_KERNEL_LEN)
        .map(|i| (i * 7 + 3) as u8)
        .collect()
}

/// 展开为完整的 4 MiB 卷镜像
pub fn ext4_fixture() -> Vec<u8> {
    let block_size = le32(PACKED, 0) as usize;
    let blocks = le32(PACKED, 4) as usize;
    let mut img = vec![0u8; block_size * blocks];
    let mut pos = 8;
    while pos < PACKED.len() {
        let index = le32(PACKED, pos) as usize;
        pos += 4;
        let dst = index * block_size;
        img[dst..dst + block_size].copy_from_slice(&PACKED[pos..pos + block_size]);
        pos += block_size;
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpacked_superblock() {
        let img = ext4_fixture();
        assert_eq!(img.len(), 4 << 20);
        assert_eq!(&img[1024 + 0x38..1024 + 0x3a], &[0x53, 0xEF]);
        // s_log_block_size = 2，即 4 KiB
        assert_eq!(le32(&img, 1024 + 0x18), 2);
    }
}
