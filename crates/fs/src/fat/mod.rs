//! FAT12/16/32 只读后端
//!
//! 支持 VFAT 长文件名，路径匹配不区分大小写。不支持写入和卷 UUID。

mod bpb;
mod dir;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, warn};

use device::BlockRange;
use vfs::{DirCursor, DirEntry, FileSystem, FsCaps, FsDriver, FsError, FsType, components};

pub use bpb::{Bpb, FatType};
pub use dir::FatDirEntry;

use dir::parse_dir;

/// 固定根目录区在游标中的标识
const FIXED_ROOT: u32 = 0;

/// FAT 文件系统类型描述符
#[derive(Debug, Default)]
pub struct FatDriver;

impl FatDriver {
    /// 创建描述符
    pub const fn new() -> Self {
        Self
    }
}

impl FsDriver for FatDriver {
    fn fs_type(&self) -> FsType {
        FsType::Fat
    }

    fn caps(&self) -> FsCaps {
        FsCaps::OPENDIR
    }

    fn probe(&self, volume: Option<&BlockRange>) -> Result<Box<dyn FileSystem>, FsError> {
        let volume = volume.ok_or(FsError::NoDevice)?;
        if volume.len() < 512 {
            return Err(FsError::InvalidArgument);
        }
        let mut sector = [0u8; 512];
        volume.read_at(0, &mut sector)?;
        let bpb = Bpb::parse(&sector)?;
        debug!(
            "[FAT] mounted on {}: {:?}",
            volume.device().get_id(),
            bpb.fat_type
        );
        Ok(Box::new(FatVolume::new(volume.clone(), bpb)))
    }
}

/// 已识别的 FAT 卷
pub struct FatVolume {
    volume: BlockRange,
    bpb: Bpb,
    /// 最近一次读取的目录：(目录标识, 目录项)
    dir_cache: Option<(u32, Vec<FatDirEntry>)>,
}

/// 路径解析结果
enum Node {
    Root,
    Entry(FatDirEntry),
}

impl FatVolume {
    /// 在已解析的 BPB 上创建卷
    pub fn new(volume: BlockRange, bpb: Bpb) -> Self {
        Self {
            volume,
            bpb,
            dir_cache: None,
        }
    }

    /// BPB
    pub fn bpb(&self) -> &Bpb {
        &self.bpb
    }

    fn root_key(&self) -> u32 {
        match self.bpb.fat_type {
            FatType::Fat32 => self.bpb.root_cluster,
            _ => FIXED_ROOT,
        }
    }

    /// 查 FAT 表得到下一簇，链结束时返回 `None`
    fn next_cluster(&self, cluster: u32) -> Result<Option<u32>, FsError> {
        let fat = self.bpb.fat_offset();
        let (value, eoc) = match self.bpb.fat_type {
            FatType::Fat12 => {
                let mut b = [0u8; 2];
                self.volume
                    .read_at(fat + (cluster + cluster / 2) as u64, &mut b)?;
                let raw = u16::from_le_bytes(b) as u32;
                let v = if cluster & 1 != 0 { raw >> 4 } else { raw & 0x0FFF };
                (v, 0x0FF8)
            }
            FatType::Fat16 => {
                let mut b = [0u8; 2];
                self.volume.read_at(fat + cluster as u64 * 2, &mut b)?;
                (u16::from_le_bytes(b) as u32, 0xFFF8)
            }
            FatType::Fat32 => {
                let mut b = [0u8; 4];
                self.volume.read_at(fat + cluster as u64 * 4, &mut b)?;
                (u32::from_le_bytes(b) & 0x0FFF_FFFF, 0x0FFF_FFF8)
            }
        };
        if value >= eoc {
            return Ok(None);
        }
        if !self.bpb.is_valid_cluster(value) {
            warn!("[FAT] bad cluster {:#x} after {:#x}", value, cluster);
            return Err(FsError::IoError);
        }
        Ok(Some(value))
    }

    /// 从 `first` 开始的簇链，长度受总簇数限制以防环
    fn cluster_chain(&self, first: u32) -> Result<Vec<u32>, FsError> {
        let mut chain = Vec::new();
        if first == 0 {
            return Ok(chain);
        }
        if !self.bpb.is_valid_cluster(first) {
            return Err(FsError::IoError);
        }
        let mut cur = Some(first);
        while let Some(c) = cur {
            if chain.len() > self.bpb.cluster_count as usize {
                warn!("[FAT] cluster chain loop at {:#x}", first);
                return Err(FsError::IoError);
            }
            chain.push(c);
            cur = self.next_cluster(c)?;
        }
        Ok(chain)
    }

    fn load_dir(&mut self, key: u32) -> Result<&[FatDirEntry], FsError> {
        let cached = matches!(&self.dir_cache, Some((k, _)) if *k == key);
        if !cached {
            let raw = if key == FIXED_ROOT {
                let mut raw = vec![0u8; self.bpb.root_dir_bytes() as usize];
                self.volume.read_at(self.bpb.root_dir_offset(), &mut raw)?;
                raw
            } else {
                let cb = self.bpb.cluster_bytes() as usize;
                let chain = self.cluster_chain(key)?;
                let mut raw = vec![0u8; chain.len() * cb];
                for (i, c) in chain.iter().enumerate() {
                    self.volume
                        .read_at(self.bpb.cluster_offset(*c), &mut raw[i * cb..(i + 1) * cb])?;
                }
                raw
            };
            self.dir_cache = Some((key, parse_dir(&raw)));
        }
        match &self.dir_cache {
            Some((_, entries)) => Ok(entries),
            None => Err(FsError::IoError),
        }
    }

    fn lookup(&mut self, path: &str) -> Result<Node, FsError> {
        let comps = components(path);
        let mut node = Node::Root;
        for comp in comps {
            let key = match &node {
                Node::Root => self.root_key(),
                Node::Entry(e) if e.is_dir() => {
                    // ".." 指向根目录时簇号为 0
                    if e.cluster == 0 { self.root_key() } else { e.cluster }
                }
                Node::Entry(_) => return Err(FsError::NotDirectory),
            };
            let entry = self
                .load_dir(key)?
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(comp))
                .cloned()
                .ok_or(FsError::NotFound)?;
            node = Node::Entry(entry);
        }
        Ok(node)
    }

    fn dir_key(&mut self, path: &str) -> Result<u32, FsError> {
        match self.lookup(path)? {
            Node::Root => Ok(self.root_key()),
            Node::Entry(e) if e.is_dir() => Ok(e.cluster),
            Node::Entry(_) => Err(FsError::NotDirectory),
        }
    }
}

impl FileSystem for FatVolume {
    fn fs_type(&self) -> FsType {
        FsType::Fat
    }

    fn exists(&mut self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    fn size(&mut self, path: &str) -> Result<u64, FsError> {
        match self.lookup(path)? {
            Node::Root => Ok(0),
            Node::Entry(e) => Ok(if e.is_dir() { 0 } else { e.size as u64 }),
        }
    }

    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<u64, FsError> {
        let entry = match self.lookup(path)? {
            Node::Entry(e) if !e.is_dir() => e,
            _ => return Err(FsError::IsDirectory),
        };
        let size = entry.size as u64;
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let want = (size - offset).min(buf.len() as u64) as usize;
        let cb = self.bpb.cluster_bytes();
        let chain = self.cluster_chain(entry.cluster)?;

        let mut done = 0usize;
        while done < want {
            let pos = offset + done as u64;
            let Some(&cluster) = chain.get((pos / cb) as usize) else {
                warn!("[FAT] {}: cluster chain shorter than file size", path);
                break;
            };
            let in_cluster = pos % cb;
            let n = ((cb - in_cluster) as usize).min(want - done);
            self.volume.read_at(
                self.bpb.cluster_offset(cluster) + in_cluster,
                &mut buf[done..done + n],
            )?;
            done += n;
        }
        Ok(done as u64)
    }

    fn open_dir(&mut self, path: &str) -> Result<DirCursor, FsError> {
        let key = self.dir_key(path)?;
        self.load_dir(key)?;
        Ok(DirCursor::new(key as u64))
    }

    fn read_dir(&mut self, cursor: &mut DirCursor) -> Result<DirEntry, FsError> {
        let key = u32::try_from(cursor.dir).map_err(|_| FsError::InvalidArgument)?;
        let entry = self
            .load_dir(key)?
            .get(cursor.pos as usize)
            .map(FatDirEntry::to_dir_entry)
            .ok_or(FsError::NotFound)?;
        cursor.pos += 1;
        Ok(entry)
    }

    fn close_dir(&mut self, _cursor: DirCursor) {
        self.dir_cache = None;
    }

    fn close(&mut self) {
        self.dir_cache = None;
    }
}
