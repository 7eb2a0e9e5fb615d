//! 已识别的 ext4 卷

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use ext4_rs::{Ext4, InodeFileType};
use log::{debug, warn};

use device::BlockRange;
use vfs::{
    DirCursor, DirEntry, DirEntryKind, FileSystem, FsError, FsType, components, split_path,
};

use super::adapter::{BlockDeviceAdapter, EXT4_IO_SIZE};
use super::superblock::SuperBlock;

/// 根目录 inode 号
const ROOT_INO: u32 = 2;
/// inode 使用 extent 树
const EXTENTS_FL: u32 = 0x0008_0000;
/// 目标短于此长度的符号链接存放在 inode 内
const FAST_LINK_MAX: usize = 60;
const MAX_SYMLINK_DEPTH: usize = 8;

/// ext4 卷
pub struct Ext4Volume {
    volume: BlockRange,
    sb: SuperBlock,
    fs: Option<Ext4>,
    /// 打开的目录：(inode 号, 目录项)
    dir_cache: Option<(u32, Vec<DirEntry>)>,
}

fn kind_from_mode(mode: u16) -> DirEntryKind {
    match (mode & 0xF000) >> 12 {
        0x8 => DirEntryKind::Regular,
        0x4 => DirEntryKind::Directory,
        0xA => DirEntryKind::Symlink,
        _ => DirEntryKind::Other,
    }
}

impl Ext4Volume {
    /// 在已校验的超级块上创建卷
    pub fn new(volume: BlockRange, sb: SuperBlock) -> Self {
        Self {
            volume,
            sb,
            fs: None,
            dir_cache: None,
        }
    }

    /// 超级块
    pub fn superblock(&self) -> &SuperBlock {
        &self.sb
    }

    fn ext4(&mut self) -> Result<&Ext4, FsError> {
        if self.fs.is_none() {
            if self.sb.block_size as usize != EXT4_IO_SIZE {
                warn!(
                    "[Ext4] block size {} not supported, need {}",
                    self.sb.block_size, EXT4_IO_SIZE
                );
                return Err(FsError::NotSupported);
            }
            let dev = Arc::new(BlockDeviceAdapter::new(self.volume.clone()));
            self.fs = Some(Ext4::open(dev));
            debug!("[Ext4] opened {}", self.volume.device().get_id());
        }
        self.fs.as_ref().ok_or(FsError::IoError)
    }

    fn is_dir(fs: &Ext4, ino: u32) -> bool {
        fs.get_inode_ref(ino).inode.is_dir()
    }

    fn size_of(fs: &Ext4, ino: u32) -> u64 {
        fs.get_inode_ref(ino).inode.size()
    }

    /// 解析路径；`follow_last` 为假时不跟随最后一个分量上的符号链接
    fn resolve(fs: &Ext4, path: &str, follow_last: bool) -> Result<u32, FsError> {
        let comps: Vec<String> = components(path).into_iter().map(String::from).collect();
        Self::walk(fs, &comps, follow_last, 0)
    }

    fn walk(fs: &Ext4, comps: &[String], follow_last: bool, depth: usize) -> Result<u32, FsError> {
        let mut cur = ROOT_INO;
        for (i, comp) in comps.iter().enumerate() {
            // ext4_rs 在非目录上查找会直接断言失败
            if !Self::is_dir(fs, cur) {
                return Err(FsError::NotDirectory);
            }
            let child = Self::child_of(fs, cur, comp).ok_or(FsError::NotFound)?;
            let last = i + 1 == comps.len();
            if fs.get_inode_ref(child).inode.is_link() && (!last || follow_last) {
                if depth >= MAX_SYMLINK_DEPTH {
                    return Err(FsError::InvalidArgument);
                }
                let raw = Self::read_link(fs, child)?;
                let target = core::str::from_utf8(&raw).map_err(|_| FsError::InvalidArgument)?;
                let base = if target.starts_with('/') {
                    String::new()
                } else {
                    comps[..i].join("/")
                };
                let rest = comps[i + 1..].join("/");
                let joined = format!("/{}/{}/{}", base, target, rest);
                let next: Vec<String> = components(&joined).into_iter().map(String::from).collect();
                return Self::walk(fs, &next, follow_last, depth + 1);
            }
            cur = child;
        }
        Ok(cur)
    }

    /// 符号链接目标；短目标直接存放在 inode 的块指针区
    fn read_link(fs: &Ext4, ino: u32) -> Result<Vec<u8>, FsError> {
        let inode = fs.get_inode_ref(ino).inode;
        let size = usize::try_from(inode.size()).map_err(|_| FsError::InvalidArgument)?;
        if inode.flags & EXTENTS_FL == 0 && size < FAST_LINK_MAX {
            return Ok(inode
                .block
                .iter()
                .flat_map(|w| w.to_le_bytes())
                .take(size)
                .collect());
        }
        let mut buf = vec![0u8; size];
        let n = fs.read_at(ino, 0, &mut buf).map_err(|_| FsError::IoError)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn lookup(&mut self, path: &str) -> Result<u32, FsError> {
        let fs = self.ext4()?;
        Self::resolve(fs, path, true)
    }

    /// 查找父目录，返回 (父目录 inode 号, 最后一个路径分量)
    fn parent_of<'p>(fs: &Ext4, path: &'p str) -> Result<(u32, &'p str), FsError> {
        let (dirs, name) = split_path(path)?;
        let parent = Self::resolve(fs, &dirs.join("/"), true)?;
        if !Self::is_dir(fs, parent) {
            return Err(FsError::NotDirectory);
        }
        Ok((parent, name))
    }

    fn child_of(fs: &Ext4, parent: u32, name: &str) -> Option<u32> {
        let mut p = parent;
        let mut name_off = 0;
        fs.generic_open(name, &mut p, false, 0, &mut name_off).ok()
    }

    fn remove_child(fs: &Ext4, parent: u32, child: u32, name: &str) -> Result<(), FsError> {
        if Self::is_dir(fs, child) {
            if fs.dir_has_entry(child) {
                return Err(FsError::DirectoryNotEmpty);
            }
            fs.dir_remove(parent, name).map_err(|_| FsError::IoError)?;
            return Ok(());
        }
        let mut child_ref = fs.get_inode_ref(child);
        // 最后一个链接被删除时先释放 extent 数据块；空文件和内联符号链接没有数据块
        let inode = &child_ref.inode;
        if inode.links_count() == 1 && inode.size() > 0 && inode.flags & EXTENTS_FL != 0 {
            fs.truncate_inode(&mut child_ref, 0)
                .map_err(|_| FsError::IoError)?;
        }
        let mut parent_ref = fs.get_inode_ref(parent);
        fs.unlink(&mut parent_ref, &mut child_ref, name)
            .map_err(|_| FsError::IoError)?;
        fs.write_back_inode(&mut parent_ref);
        Ok(())
    }

    /// 在 `parent` 下创建 `name`，只传类型位，权限由 `ext4_rs` 填写
    fn create_child(fs: &Ext4, parent: u32, name: &str, kind: InodeFileType) -> Result<u32, FsError> {
        if Self::child_of(fs, parent, name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let inode = fs.create(parent, name, kind.bits()).map_err(|e| {
            debug!("[Ext4] create {} failed: {:?}", name, e.error());
            FsError::NoSpace
        })?;
        Ok(inode.inode_num)
    }

    fn load_dir(&mut self, ino: u32) -> Result<&[DirEntry], FsError> {
        let cached = matches!(&self.dir_cache, Some((i, _)) if *i == ino);
        if !cached {
            let fs = self.ext4()?;
            let entries = fs
                .dir_get_entries(ino)
                .iter()
                .filter_map(|e| {
                    let name = String::from_utf8_lossy(&e.name[..e.get_name_len()]).into_owned();
                    if name == "." || name == ".." {
                        return None;
                    }
                    // ext4_rs 新建的目录项类型字段一律写成目录，类型以 inode 为准
                    let inode = fs.get_inode_ref(e.inode).inode;
                    let kind = kind_from_mode(inode.mode);
                    let size = if kind == DirEntryKind::Directory {
                        0
                    } else {
                        inode.size()
                    };
                    Some(DirEntry::new(name, size, kind))
                })
                .collect();
            self.dir_cache = Some((ino, entries));
        }
        match &self.dir_cache {
            Some((_, entries)) => Ok(entries),
            None => Err(FsError::IoError),
        }
    }
}

impl FileSystem for Ext4Volume {
    fn fs_type(&self) -> FsType {
        FsType::Ext4
    }

    fn exists(&mut self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    fn size(&mut self, path: &str) -> Result<u64, FsError> {
        let ino = self.lookup(path)?;
        let fs = self.ext4()?;
        Ok(Self::size_of(fs, ino))
    }

    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<u64, FsError> {
        let ino = self.lookup(path)?;
        let fs = self.ext4()?;
        if Self::is_dir(fs, ino) {
            return Err(FsError::IsDirectory);
        }
        let size = Self::size_of(fs, ino);
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let start = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;
        let want = (size - offset).min(buf.len() as u64) as usize;
        let n = fs
            .read_at(ino, start, &mut buf[..want])
            .map_err(|_| FsError::IoError)?;
        Ok(n as u64)
    }

    /// 只支持从偏移 0 写入，已有文件先删除再重建
    fn write(&mut self, path: &str, offset: u64, buf: &[u8]) -> Result<u64, FsError> {
        if offset != 0 {
            warn!("[Ext4] non-zero write offset {:#x} not supported", offset);
            return Err(FsError::NotSupported);
        }
        self.dir_cache = None;
        let fs = self.ext4()?;
        let (parent, name) = Self::parent_of(fs, path)?;
        if let Some(old) = Self::child_of(fs, parent, name) {
            if Self::is_dir(fs, old) {
                return Err(FsError::IsDirectory);
            }
            Self::remove_child(fs, parent, old, name)?;
        }
        let ino = Self::create_child(fs, parent, name, InodeFileType::S_IFREG)?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = fs.write_at(ino, 0, buf).map_err(|e| {
            debug!("[Ext4] write {} failed: {:?}", path, e.error());
            FsError::IoError
        })?;
        Ok(n as u64)
    }

    fn open_dir(&mut self, path: &str) -> Result<DirCursor, FsError> {
        let ino = self.lookup(path)?;
        let mode = self.ext4()?.get_inode_ref(ino).inode.mode;
        if kind_from_mode(mode) != DirEntryKind::Directory {
            return Err(FsError::NotDirectory);
        }
        self.load_dir(ino)?;
        Ok(DirCursor::new(ino as u64))
    }

    fn read_dir(&mut self, cursor: &mut DirCursor) -> Result<DirEntry, FsError> {
        let ino = u32::try_from(cursor.dir).map_err(|_| FsError::InvalidArgument)?;
        let entry = self
            .load_dir(ino)?
            .get(cursor.pos as usize)
            .cloned()
            .ok_or(FsError::NotFound)?;
        cursor.pos += 1;
        Ok(entry)
    }

    fn close_dir(&mut self, _cursor: DirCursor) {
        self.dir_cache = None;
    }

    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        self.dir_cache = None;
        let fs = self.ext4()?;
        let (parent, name) = Self::parent_of(fs, path)?;
        let child = Self::child_of(fs, parent, name).ok_or(FsError::NotFound)?;
        Self::remove_child(fs, parent, child, name)
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        self.dir_cache = None;
        let fs = self.ext4()?;
        let (parent, name) = Self::parent_of(fs, path)?;
        Self::create_child(fs, parent, name, InodeFileType::S_IFDIR)?;
        Ok(())
    }

    fn link(&mut self, path: &str, target: &str) -> Result<(), FsError> {
        self.dir_cache = None;
        let fs = self.ext4()?;
        let (parent, name) = Self::parent_of(fs, path)?;
        let ino = Self::create_child(fs, parent, name, InodeFileType::S_IFLNK)?;
        fs.write_at(ino, 0, target.as_bytes())
            .map_err(|_| FsError::IoError)?;
        Ok(())
    }

    fn uuid(&mut self) -> Result<String, FsError> {
        Ok(self.sb.uuid_string())
    }

    fn close(&mut self) {
        self.dir_cache = None;
        if self.fs.take().is_some()
            && let Err(e) = self.volume.flush()
        {
            warn!("[Ext4] flush failed: {}", e);
        }
    }
}
