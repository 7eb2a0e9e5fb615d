//! 内存目录树节点

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use sync::SpinLock;
use vfs::{DirEntry, DirEntryKind, FsError};

/// 目录树节点
pub struct SandboxNode {
    kind: DirEntryKind,

    /// 文件内容，或符号链接目标
    data: SpinLock<Vec<u8>>,

    /// 子节点（仅对目录有效）
    children: SpinLock<BTreeMap<String, Arc<SandboxNode>>>,
}

impl SandboxNode {
    /// 新建空目录
    pub fn new_dir() -> Arc<Self> {
        Self::with_kind(DirEntryKind::Directory, Vec::new())
    }

    /// 新建空文件
    pub fn new_file() -> Arc<Self> {
        Self::with_kind(DirEntryKind::Regular, Vec::new())
    }

    /// 新建符号链接
    pub fn new_symlink(target: &str) -> Arc<Self> {
        Self::with_kind(DirEntryKind::Symlink, target.as_bytes().to_vec())
    }

    fn with_kind(kind: DirEntryKind, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            data: SpinLock::new(data),
            children: SpinLock::new(BTreeMap::new()),
        })
    }

    /// 节点类型
    pub fn kind(&self) -> DirEntryKind {
        self.kind
    }

    /// 是否为目录
    pub fn is_dir(&self) -> bool {
        self.kind == DirEntryKind::Directory
    }

    /// 内容长度，目录为 0
    pub fn size(&self) -> u64 {
        if self.is_dir() {
            0
        } else {
            self.data.lock().len() as u64
        }
    }

    /// 符号链接目标
    pub fn target(&self) -> Option<String> {
        match self.kind {
            DirEntryKind::Symlink => Some(String::from_utf8_lossy(&self.data.lock()).into_owned()),
            _ => None,
        }
    }

    /// 按名查找子节点
    pub fn child(&self, name: &str) -> Result<Arc<SandboxNode>, FsError> {
        if !self.is_dir() {
            return Err(FsError::NotDirectory);
        }
        self.children.lock().get(name).cloned().ok_or(FsError::NotFound)
    }

    /// 插入子节点，同名已存在时失败
    pub fn insert(&self, name: &str, node: Arc<SandboxNode>) -> Result<(), FsError> {
        if !self.is_dir() {
            return Err(FsError::NotDirectory);
        }
        let mut children = self.children.lock();
        if children.contains_key(name) {
            return Err(FsError::AlreadyExists);
        }
        children.insert(String::from(name), node);
        Ok(())
    }

    /// 删除子节点，非空目录不可删除
    pub fn remove(&self, name: &str) -> Result<(), FsError> {
        let mut children = self.children.lock();
        let child = children.get(name).ok_or(FsError::NotFound)?;
        if child.is_dir() && !child.children.lock().is_empty() {
            return Err(FsError::DirectoryNotEmpty);
        }
        children.remove(name);
        Ok(())
    }

    /// 按名字排序的目录项快照
    pub fn entries(&self) -> Vec<DirEntry> {
        self.children
            .lock()
            .iter()
            .map(|(name, node)| DirEntry::new(name.clone(), node.size(), node.kind))
            .collect()
    }

    /// 从 `offset` 读取
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> u64 {
        let data = self.data.lock();
        let len = data.len() as u64;
        if offset >= len {
            return 0;
        }
        let n = (len - offset).min(buf.len() as u64) as usize;
        let start = offset as usize;
        buf[..n].copy_from_slice(&data[start..start + n]);
        n as u64
    }

    /// 在 `offset` 处写入，空洞补零
    ///
    /// 区间越过地址空间时返回 [`FsError::InvalidArgument`]，内存不足时返回
    /// [`FsError::NoSpace`]，两种情况下内容都不变。
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> Result<(), FsError> {
        let start = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;
        let end = start
            .checked_add(buf.len())
            .ok_or(FsError::InvalidArgument)?;
        let mut data = self.data.lock();
        let cur = data.len();
        if cur < end {
            data.try_reserve_exact(end - cur)
                .map_err(|_| FsError::NoSpace)?;
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        Ok(())
    }

    /// 截断到 `len`
    pub fn truncate(&self, len: usize) {
        self.data.lock().truncate(len);
    }
}
