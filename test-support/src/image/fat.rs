//! FAT12/FAT16 镜像格式化工具
//!
//! 生成带 BPB、两份 FAT、固定根目录区的镜像。文件连续分配；
//! 不符合 8.3 规则的名字写入 VFAT 长文件名目录项，并生成 `XXXXXX~N` 短别名。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

const BYTES_PER_SECTOR: usize = 512;
const RESERVED_SECTORS: usize = 1;
const NUM_FATS: usize = 2;
const ROOT_ENTRIES: usize = 512;
const DIR_ENTRY_SIZE: usize = 32;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_ARCHIVE: u8 = 0x20;
const ATTR_LFN: u8 = 0x0F;
const NT_LOWER_BASE: u8 = 0x08;
const NT_LOWER_EXT: u8 = 0x10;
const LFN_CHARS: usize = 13;

/// FAT 变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatKind {
    /// 1.44 MiB 软盘布局
    Fat12,
    /// 8 MiB 布局
    Fat16,
}

impl FatKind {
    fn total_sectors(self) -> usize {
        match self {
            FatKind::Fat12 => 2880,
            FatKind::Fat16 => 16384,
        }
    }

    fn fat_bytes(self, entries: usize) -> usize {
        match self {
            FatKind::Fat12 => (entries * 3).div_ceil(2),
            FatKind::Fat16 => entries * 2,
        }
    }

    fn eoc(self) -> u32 {
        match self {
            FatKind::Fat12 => 0xFFF,
            FatKind::Fat16 => 0xFFFF,
        }
    }

    fn label(self) -> &'static [u8; 8] {
        match self {
            FatKind::Fat12 => b"FAT12   ",
            FatKind::Fat16 => b"FAT16   ",
        }
    }
}

enum Node {
    File(Vec<u8>),
    Dir(Vec<(String, Node)>),
}

/// FAT 镜像构造器
pub struct FatImageBuilder {
    kind: FatKind,
    root: Vec<(String, Node)>,
}

fn lookup_dir<'a>(mut dir: &'a mut Vec<(String, Node)>, comps: &[&str]) -> &'a mut Vec<(String, Node)> {
    for comp in comps {
        let pos = match dir.iter().position(|(n, _)| n == comp) {
            Some(pos) => pos,
            None => {
                dir.push((String::from(*comp), Node::Dir(Vec::new())));
                dir.len() - 1
            }
        };
        dir = match &mut dir[pos].1 {
            Node::Dir(children) => children,
            Node::File(_) => panic!("{} is a file", comp),
        };
    }
    dir
}

impl FatImageBuilder {
    /// FAT12 镜像
    pub fn fat12() -> Self {
        Self::new(FatKind::Fat12)
    }

    /// FAT16 镜像
    pub fn fat16() -> Self {
        Self::new(FatKind::Fat16)
    }

    /// 指定变体
    pub fn new(kind: FatKind) -> Self {
        Self {
            kind,
            root: Vec::new(),
        }
    }

    /// 创建目录（父目录自动创建）
    pub fn dir(mut self, path: &str) -> Self {
        let comps: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        lookup_dir(&mut self.root, &comps);
        self
    }

    /// 添加文件（父目录自动创建）
    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        let comps: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (name, parents) = comps.split_last().expect("empty path");
        let dir = lookup_dir(&mut self.root, parents);
        dir.push((String::from(*name), Node::File(Vec::from(data))));
        self
    }

    /// 生成镜像
    pub fn build(self) -> Vec<u8> {
        let kind = self.kind;
        let total = kind.total_sectors();
        let root_sectors = ROOT_ENTRIES * DIR_ENTRY_SIZE / BYTES_PER_SECTOR;

        let mut fat_sectors = 1;
        let clusters = loop {
            let data = total - RESERVED_SECTORS - root_sectors - NUM_FATS * fat_sectors;
            let need = kind.fat_bytes(data + 2).div_ceil(BYTES_PER_SECTOR);
            if need <= fat_sectors {
                break data;
            }
            fat_sectors = need;
        };

        let mut w = Writer {
            kind,
            image: vec![0u8; total * BYTES_PER_SECTOR],
            fat: vec![0u32; clusters + 2],
            next_free: 2,
            root_offset: (RESERVED_SECTORS + NUM_FATS * fat_sectors) * BYTES_PER_SECTOR,
            data_offset: (RESERVED_SECTORS + NUM_FATS * fat_sectors + root_sectors)
                * BYTES_PER_SECTOR,
        };
        w.write_boot_sector(total, fat_sectors);
        w.fat[0] = kind.eoc() & !0xF | 0x8;
        w.fat[1] = kind.eoc();

        let root_bytes = w.dir_bytes(&self.root, None, 0);
        assert!(root_bytes.len() <= ROOT_ENTRIES * DIR_ENTRY_SIZE, "root directory full");
        let off = w.root_offset;
        w.image[off..off + root_bytes.len()].copy_from_slice(&root_bytes);

        w.write_fats(fat_sectors);
        w.image
    }
}

struct Writer {
    kind: FatKind,
    image: Vec<u8>,
    fat: Vec<u32>,
    next_free: u32,
    root_offset: usize,
    data_offset: usize,
}

fn valid_short_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-~!#$%&'(){}^@".contains(c)
}

fn case_flag(part: &str, flag: u8) -> Option<u8> {
    let has_lower = part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = part.chars().any(|c| c.is_ascii_uppercase());
    match (has_lower, has_upper) {
        (true, true) => None,
        (true, false) => Some(flag),
        _ => Some(0),
    }
}

/// 能直接用 8.3 表示时返回短名和大小写标志
fn short_name(name: &str) -> Option<([u8; 11], u8)> {
    let (base, ext) = match name.rsplit_once('.') {
        Some((b, e)) => (b, e),
        None => (name, ""),
    };
    if base.is_empty() || base.len() > 8 || ext.len() > 3 || base.contains('.') {
        return None;
    }
    if !base.chars().chain(ext.chars()).all(valid_short_char) {
        return None;
    }
    let flags = case_flag(base, NT_LOWER_BASE)? | case_flag(ext, NT_LOWER_EXT)?;
    let mut raw = [b' '; 11];
    for (i, b) in base.bytes().enumerate() {
        raw[i] = b.to_ascii_uppercase();
    }
    for (i, b) in ext.bytes().enumerate() {
        raw[8 + i] = b.to_ascii_uppercase();
    }
    Some((raw, flags))
}

fn alias_name(name: &str, seq: u32) -> [u8; 11] {
    let (base, ext) = match name.rsplit_once('.') {
        Some((b, e)) if !b.is_empty() => (b, e),
        _ => (name, ""),
    };
    let clean = |s: &str, max: usize| -> Vec<u8> {
        s.chars()
            .filter(|c| valid_short_char(*c))
            .map(|c| c.to_ascii_uppercase() as u8)
            .take(max)
            .collect()
    };
    let mut raw = [b' '; 11];
    let mut b = clean(base, 6);
    b.push(b'~');
    b.extend(alloc::format!("{}", seq).bytes());
    for (i, c) in b.iter().take(8).enumerate() {
        raw[i] = *c;
    }
    for (i, c) in clean(ext, 3).iter().enumerate() {
        raw[8 + i] = *c;
    }
    raw
}

fn lfn_checksum(short: &[u8; 11]) -> u8 {
    short
        .iter()
        .fold(0u8, |sum, &c| (sum >> 1).wrapping_add(sum << 7).wrapping_add(c))
}

fn lfn_entry_count(name: &str) -> usize {
    if short_name(name).is_some() {
        0
    } else {
        name.encode_utf16().count().div_ceil(LFN_CHARS)
    }
}

fn entry(raw: &[u8; 11], attr: u8, nt: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut e = [0u8; 32];
    e[..11].copy_from_slice(raw);
    e[11] = attr;
    e[12] = nt;
    e[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    // 2024-01-01 00:00
    e[24..26].copy_from_slice(&(((2024 - 1980) << 9 | 1 << 5 | 1) as u16).to_le_bytes());
    e[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
    e[28..32].copy_from_slice(&size.to_le_bytes());
    e
}

fn lfn_entries(name: &str, checksum: u8) -> Vec<[u8; 32]> {
    let mut units: Vec<u16> = name.encode_utf16().collect();
    let count = units.len().div_ceil(LFN_CHARS);
    if units.len() % LFN_CHARS != 0 {
        units.push(0);
    }
    units.resize(count * LFN_CHARS, 0xFFFF);

    let mut out = Vec::new();
    for seq in (1..=count).rev() {
        let chunk = &units[(seq - 1) * LFN_CHARS..seq * LFN_CHARS];
        let mut e = [0u8; 32];
        e[0] = seq as u8 | if seq == count { 0x40 } else { 0 };
        e[11] = ATTR_LFN;
        e[13] = checksum;
        let slots = (1..11).step_by(2).chain((14..26).step_by(2)).chain((28..32).step_by(2));
        for (slot, unit) in slots.zip(chunk.iter()) {
            e[slot..slot + 2].copy_from_slice(&unit.to_le_bytes());
        }
        out.push(e);
    }
    out
}

impl Writer {
    fn cluster_bytes(&self) -> usize {
        BYTES_PER_SECTOR
    }

    fn alloc(&mut self, bytes: usize) -> u32 {
        let n = bytes.div_ceil(self.cluster_bytes()).max(1) as u32;
        let first = self.next_free;
        assert!((first + n) as usize <= self.fat.len(), "image full");
        for c in first..first + n {
            self.fat[c as usize] = if c + 1 == first + n { self.kind.eoc() } else { c + 1 };
        }
        self.next_free += n;
        first
    }

    fn write_cluster_data(&mut self, first: u32, data: &[u8]) {
        let off = self.data_offset + (first as usize - 2) * self.cluster_bytes();
        self.image[off..off + data.len()].copy_from_slice(data);
    }

    fn dir_entry_count(children: &[(String, Node)], is_root: bool) -> usize {
        let own = if is_root { 0 } else { 2 };
        own + children.iter().map(|(n, _)| 1 + lfn_entry_count(n)).sum::<usize>()
    }

    /// 生成目录内容，同时为子项分配簇并写入
    fn dir_bytes(&mut self, children: &[(String, Node)], this: Option<u32>, parent: u32) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(cluster) = this {
            let mut dot = [b' '; 11];
            dot[0] = b'.';
            out.extend_from_slice(&entry(&dot, ATTR_DIRECTORY, 0, cluster, 0));
            dot[1] = b'.';
            out.extend_from_slice(&entry(&dot, ATTR_DIRECTORY, 0, parent, 0));
        }

        let mut alias_seq = 1;
        let mut subdirs = Vec::new();
        for (name, node) in children {
            let (raw, nt, lfn) = match short_name(name) {
                Some((raw, nt)) => (raw, nt, false),
                None => {
                    let raw = alias_name(name, alias_seq);
                    alias_seq += 1;
                    (raw, 0, true)
                }
            };
            if lfn {
                for e in lfn_entries(name, lfn_checksum(&raw)) {
                    out.extend_from_slice(&e);
                }
            }
            match node {
                Node::File(data) => {
                    let cluster = if data.is_empty() {
                        0
                    } else {
                        let c = self.alloc(data.len());
                        self.write_cluster_data(c, data);
                        c
                    };
                    out.extend_from_slice(&entry(&raw, ATTR_ARCHIVE, nt, cluster, data.len() as u32));
                }
                Node::Dir(grand) => {
                    let bytes = Self::dir_entry_count(grand, false) * DIR_ENTRY_SIZE;
                    let cluster = self.alloc(bytes);
                    out.extend_from_slice(&entry(&raw, ATTR_DIRECTORY, nt, cluster, 0));
                    subdirs.push((cluster, grand));
                }
            }
        }

        for (cluster, grand) in subdirs {
            let bytes = self.dir_bytes(grand, Some(cluster), this.unwrap_or(0));
            self.write_cluster_data(cluster, &bytes);
        }
        out
    }

    fn write_boot_sector(&mut self, total: usize, fat_sectors: usize) {
        let b = &mut self.image[..BYTES_PER_SECTOR];
        b[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        b[3..11].copy_from_slice(b"SANKTA  ");
        b[11..13].copy_from_slice(&(BYTES_PER_SECTOR as u16).to_le_bytes());
        b[13] = 1;
        b[14..16].copy_from_slice(&(RESERVED_SECTORS as u16).to_le_bytes());
        b[16] = NUM_FATS as u8;
        b[17..19].copy_from_slice(&(ROOT_ENTRIES as u16).to_le_bytes());
        b[19..21].copy_from_slice(&(total as u16).to_le_bytes());
        b[21] = 0xF8;
        b[22..24].copy_from_slice(&(fat_sectors as u16).to_le_bytes());
        b[24..26].copy_from_slice(&32u16.to_le_bytes());
        b[26..28].copy_from_slice(&2u16.to_le_bytes());
        b[38] = 0x29;
        b[39..43].copy_from_slice(&0x1234_abcdu32.to_le_bytes());
        b[43..54].copy_from_slice(b"SANKTABOOT ");
        b[54..62].copy_from_slice(self.kind.label());
        b[510] = 0x55;
        b[511] = 0xAA;
    }

    fn write_fats(&mut self, fat_sectors: usize) {
        let mut table = vec![0u8; fat_sectors * BYTES_PER_SECTOR];
        for (i, &v) in self.fat.iter().enumerate() {
            match self.kind {
                FatKind::Fat12 => {
                    let off = i * 3 / 2;
                    if i % 2 == 0 {
                        table[off] = v as u8;
                        table[off + 1] = (table[off + 1] & 0xF0) | ((v >> 8) as u8 & 0x0F);
                    } else {
                        table[off] = (table[off] & 0x0F) | ((v << 4) as u8 & 0xF0);
                        table[off + 1] = (v >> 4) as u8;
                    }
                }
                FatKind::Fat16 => {
                    table[i * 2..i * 2 + 2].copy_from_slice(&(v as u16).to_le_bytes());
                }
            }
        }
        for copy in 0..NUM_FATS {
            let off = (RESERVED_SECTORS + copy * fat_sectors) * BYTES_PER_SECTOR;
            self.image[off..off + table.len()].copy_from_slice(&table);
        }
    }
}
