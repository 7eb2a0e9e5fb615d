//! FAT 目录项解析，包括 VFAT 长文件名

use alloc::string::String;
use alloc::vec::Vec;

use vfs::{DirEntry, DirEntryKind};

/// 目录项大小
pub const DIR_ENTRY_SIZE: usize = 32;

const ATTR_VOLUME_ID: u8 = 0x08;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_LFN: u8 = 0x0F;
const ENTRY_END: u8 = 0x00;
const ENTRY_FREE: u8 = 0xE5;
const NT_LOWER_BASE: u8 = 0x08;
const NT_LOWER_EXT: u8 = 0x10;
const LFN_LAST: u8 = 0x40;
const LFN_CHARS: usize = 13;

/// 解析后的目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatDirEntry {
    /// 长文件名或还原大小写后的短名
    pub name: String,
    /// 属性
    pub attr: u8,
    /// 起始簇
    pub cluster: u32,
    /// 文件大小
    pub size: u32,
}

impl FatDirEntry {
    /// 是否为目录
    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    /// 转换为通用目录项
    pub fn to_dir_entry(&self) -> DirEntry {
        if self.is_dir() {
            DirEntry::new(self.name.clone(), 0, DirEntryKind::Directory)
        } else {
            DirEntry::new(self.name.clone(), self.size as u64, DirEntryKind::Regular)
        }
    }
}

fn short_name_checksum(raw: &[u8]) -> u8 {
    raw[..11]
        .iter()
        .fold(0u8, |sum, &c| (sum >> 1).wrapping_add(sum << 7).wrapping_add(c))
}

fn decode_short_name(raw: &[u8]) -> String {
    let nt = raw[12];
    let mut name = String::new();
    for (i, &b) in raw[..8].iter().enumerate() {
        if b == b' ' {
            break;
        }
        // 0x05 表示首字节实际为 0xE5
        let b = if i == 0 && b == 0x05 { 0xE5 } else { b };
        let c = if nt & NT_LOWER_BASE != 0 {
            b.to_ascii_lowercase()
        } else {
            b
        };
        name.push(c as char);
    }
    let ext: Vec<u8> = raw[8..11].iter().copied().take_while(|&b| b != b' ').collect();
    if !ext.is_empty() {
        name.push('.');
        for b in ext {
            let c = if nt & NT_LOWER_EXT != 0 {
                b.to_ascii_lowercase()
            } else {
                b
            };
            name.push(c as char);
        }
    }
    name
}

/// 正在拼接的长文件名
#[derive(Default)]
struct LfnState {
    units: Vec<u16>,
    expected: u8,
    checksum: u8,
    valid: bool,
}

impl LfnState {
    fn reset(&mut self) {
        self.valid = false;
        self.units.clear();
    }

    fn push(&mut self, raw: &[u8]) {
        let ord = raw[0];
        let seq = ord & 0x1F;
        if ord & LFN_LAST != 0 {
            self.reset();
            if seq == 0 {
                return;
            }
            self.units.resize(seq as usize * LFN_CHARS, 0xFFFF);
            self.expected = seq;
            self.checksum = raw[13];
            self.valid = true;
        } else if !self.valid || seq == 0 || seq != self.expected || raw[13] != self.checksum {
            self.reset();
            return;
        }

        let base = (seq as usize - 1) * LFN_CHARS;
        let slots = (1..11)
            .step_by(2)
            .chain((14..26).step_by(2))
            .chain((28..32).step_by(2));
        for (i, slot) in slots.enumerate() {
            self.units[base + i] = u16::from_le_bytes([raw[slot], raw[slot + 1]]);
        }
        self.expected = seq - 1;
    }

    /// 与短名校验和匹配且序号完整时返回长文件名
    fn take(&mut self, short: &[u8]) -> Option<String> {
        let done = self.valid && self.expected == 0 && self.checksum == short_name_checksum(short);
        let units = core::mem::take(&mut self.units);
        self.valid = false;
        if !done {
            return None;
        }
        let len = units
            .iter()
            .position(|&u| u == 0x0000 || u == 0xFFFF)
            .unwrap_or(units.len());
        Some(
            char::decode_utf16(units[..len].iter().copied())
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
        )
    }
}

/// 解析一整个目录的原始内容，跳过 `.`、`..`、卷标和已删除项
pub fn parse_dir(raw: &[u8]) -> Vec<FatDirEntry> {
    let mut out = Vec::new();
    let mut lfn = LfnState::default();
    for e in raw.chunks_exact(DIR_ENTRY_SIZE) {
        match e[0] {
            ENTRY_END => break,
            ENTRY_FREE => {
                lfn.reset();
                continue;
            }
            _ => {}
        }
        let attr = e[11];
        if attr & 0x3F == ATTR_LFN {
            lfn.push(e);
            continue;
        }
        if attr & ATTR_VOLUME_ID != 0 {
            lfn.reset();
            continue;
        }
        let long = lfn.take(e);
        if e[0] == b'.' {
            continue;
        }
        let hi = u16::from_le_bytes([e[20], e[21]]) as u32;
        let lo = u16::from_le_bytes([e[26], e[27]]) as u32;
        out.push(FatDirEntry {
            name: long.unwrap_or_else(|| decode_short_name(e)),
            attr,
            cluster: hi << 16 | lo,
            size: u32::from_le_bytes([e[28], e[29], e[30], e[31]]),
        });
    }
    out
}
