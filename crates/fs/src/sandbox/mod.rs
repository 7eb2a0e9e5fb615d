//! 主机目录沙盒后端
//!
//! 不依赖块设备，只在分区解析结果没有设备时参与探测。
//! 内容保存在驱动持有的内存目录树里，多次探测得到的会话看到同一棵树。

mod node;

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use log::debug;

use device::BlockRange;
use sync::SpinLock;
use vfs::{
    DirCursor, DirEntry, DirEntryKind, FileSystem, FsCaps, FsDriver, FsError, FsType, ListSummary,
    components, split_path,
};

pub use node::SandboxNode;

/// 符号链接最大解析深度
const MAX_SYMLINK_DEPTH: usize = 8;

/// 目录树与容量统计
struct Store {
    root: Arc<SandboxNode>,
    /// 最大容量（字节，0 表示无限制）
    max_bytes: u64,
}

/// 沙盒文件系统类型描述符
#[derive(Clone)]
pub struct SandboxDriver {
    store: Arc<SpinLock<Store>>,
}

impl SandboxDriver {
    /// 创建空沙盒，`max_bytes` 为 0 表示不限容量
    pub fn new(max_bytes: u64) -> Self {
        Self {
            store: Arc::new(SpinLock::new(Store {
                root: SandboxNode::new_dir(),
                max_bytes,
            })),
        }
    }

    /// 打开一个不经过探测的会话，用于预置内容
    pub fn session(&self) -> SandboxFs {
        let store = self.store.lock();
        SandboxFs {
            root: store.root.clone(),
            max_bytes: store.max_bytes,
            dirs: Vec::new(),
            next_handle: 0,
        }
    }
}

impl Default for SandboxDriver {
    fn default() -> Self {
        Self::new(0)
    }
}

impl FsDriver for SandboxDriver {
    fn fs_type(&self) -> FsType {
        FsType::Sandbox
    }

    fn allows_null_device(&self) -> bool {
        true
    }

    fn caps(&self) -> FsCaps {
        FsCaps::WRITE
            | FsCaps::UNLINK
            | FsCaps::MKDIR
            | FsCaps::LINK
            | FsCaps::OPENDIR
            | FsCaps::LIST
    }

    fn probe(&self, volume: Option<&BlockRange>) -> Result<Box<dyn FileSystem>, FsError> {
        if let Some(v) = volume {
            debug!("[Sandbox] refusing block device {}", v.device().get_id());
            return Err(FsError::InvalidArgument);
        }
        Ok(Box::new(self.session()))
    }
}

/// 沙盒会话
pub struct SandboxFs {
    root: Arc<SandboxNode>,
    max_bytes: u64,
    /// 打开的目录快照：(句柄, 目录项)
    dirs: Vec<(u64, Vec<DirEntry>)>,
    next_handle: u64,
}

fn type_name(kind: DirEntryKind) -> &'static str {
    match kind {
        DirEntryKind::Regular => "   ",
        DirEntryKind::Symlink => "SYM",
        DirEntryKind::Directory => "DIR",
        DirEntryKind::Other => "???",
    }
}

fn used_bytes(node: &SandboxNode) -> u64 {
    if !node.is_dir() {
        return node.size();
    }
    node.entries()
        .iter()
        .filter_map(|e| node.child(&e.name).ok())
        .map(|c| used_bytes(&c))
        .sum()
}

impl SandboxFs {
    /// 解析路径；`follow_last` 为假时不跟随最后一个分量上的符号链接
    fn resolve(&self, path: &str, follow_last: bool) -> Result<Arc<SandboxNode>, FsError> {
        let comps: Vec<String> = components(path).into_iter().map(String::from).collect();
        self.walk(&comps, follow_last, 0)
    }

    fn walk(
        &self,
        comps: &[String],
        follow_last: bool,
        depth: usize,
    ) -> Result<Arc<SandboxNode>, FsError> {
        let mut cur = self.root.clone();
        for (i, comp) in comps.iter().enumerate() {
            let child = cur.child(comp)?;
            let last = i + 1 == comps.len();
            if let Some(target) = child.target() {
                if !last || follow_last {
                    if depth >= MAX_SYMLINK_DEPTH {
                        return Err(FsError::InvalidArgument);
                    }
                    let base = if target.starts_with('/') {
                        String::new()
                    } else {
                        comps[..i].join("/")
                    };
                    let rest = comps[i + 1..].join("/");
                    let joined = format!("/{}/{}/{}", base, target, rest);
                    let next: Vec<String> =
                        components(&joined).into_iter().map(String::from).collect();
                    return self.walk(&next, follow_last, depth + 1);
                }
            }
            cur = child;
        }
        Ok(cur)
    }

    fn parent_of<'p>(&self, path: &'p str) -> Result<(Arc<SandboxNode>, &'p str), FsError> {
        let (dirs, name) = split_path(path)?;
        let parent = self.resolve(&dirs.join("/"), true)?;
        if !parent.is_dir() {
            return Err(FsError::NotDirectory);
        }
        Ok((parent, name))
    }

    /// 读出整个文件，测试与命令层预置内容时使用
    pub fn read_all(&mut self, path: &str) -> Result<Vec<u8>, FsError> {
        let len = self.size(path)? as usize;
        let mut buf = alloc::vec![0u8; len];
        let n = self.read(path, 0, &mut buf)? as usize;
        buf.truncate(n);
        Ok(buf)
    }

    /// 逐级创建目录，已存在的目录跳过
    pub fn create_dir_all(&mut self, path: &str) -> Result<(), FsError> {
        let mut cur = self.root.clone();
        for comp in components(path) {
            cur = match cur.child(comp) {
                Ok(c) => c,
                Err(FsError::NotFound) => {
                    let dir = SandboxNode::new_dir();
                    cur.insert(comp, dir.clone())?;
                    dir
                }
                Err(e) => return Err(e),
            };
            if !cur.is_dir() {
                return Err(FsError::NotDirectory);
            }
        }
        Ok(())
    }
}

impl FileSystem for SandboxFs {
    fn fs_type(&self) -> FsType {
        FsType::Sandbox
    }

    fn exists(&mut self, path: &str) -> bool {
        self.resolve(path, true).is_ok()
    }

    fn size(&mut self, path: &str) -> Result<u64, FsError> {
        Ok(self.resolve(path, true)?.size())
    }

    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> Result<u64, FsError> {
        let node = self.resolve(path, true)?;
        if node.is_dir() {
            return Err(FsError::IsDirectory);
        }
        Ok(node.read_at(offset, buf))
    }

    /// 偏移为 0 时先截断，否则在原内容上覆盖或追加
    fn write(&mut self, path: &str, offset: u64, buf: &[u8]) -> Result<u64, FsError> {
        let (node, created) = match self.resolve(path, true) {
            Ok(n) => (n, false),
            Err(FsError::NotFound) => {
                let (parent, name) = self.parent_of(path)?;
                let file = SandboxNode::new_file();
                parent.insert(name, file.clone())?;
                (file, true)
            }
            Err(e) => return Err(e),
        };
        if node.is_dir() {
            return Err(FsError::IsDirectory);
        }
        let old = node.size();
        let end = offset
            .checked_add(buf.len() as u64)
            .filter(|&end| usize::try_from(end).is_ok());
        let result = match end {
            None => Err(FsError::InvalidArgument),
            Some(end) => {
                let new = if offset == 0 { end } else { old.max(end) };
                let used = used_bytes(&self.root) - old;
                if self.max_bytes != 0 && used.saturating_add(new) > self.max_bytes {
                    Err(FsError::NoSpace)
                } else {
                    if offset == 0 {
                        node.truncate(0);
                    }
                    node.write_at(offset, buf)
                }
            }
        };
        if let Err(e) = result {
            debug!("[Sandbox] write {} at {:#x} failed: {}", path, offset, e);
            if created {
                let _ = self.unlink(path);
            }
            return Err(e);
        }
        Ok(buf.len() as u64)
    }

    fn open_dir(&mut self, path: &str) -> Result<DirCursor, FsError> {
        let node = self.resolve(path, true)?;
        if !node.is_dir() {
            return Err(FsError::NotDirectory);
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.dirs.push((handle, node.entries()));
        Ok(DirCursor::new(handle))
    }

    fn read_dir(&mut self, cursor: &mut DirCursor) -> Result<DirEntry, FsError> {
        let (_, entries) = self
            .dirs
            .iter()
            .find(|(h, _)| *h == cursor.dir)
            .ok_or(FsError::InvalidArgument)?;
        let entry = entries
            .get(cursor.pos as usize)
            .cloned()
            .ok_or(FsError::NotFound)?;
        cursor.pos += 1;
        Ok(entry)
    }

    fn close_dir(&mut self, cursor: DirCursor) {
        self.dirs.retain(|(h, _)| *h != cursor.dir);
    }

    /// 每行 `类型 大小 名字`，按名字排序，不输出汇总行
    fn list(
        &mut self,
        path: &str,
        out: &mut dyn fmt::Write,
    ) -> Option<Result<ListSummary, FsError>> {
        let node = match self.resolve(path, true) {
            Ok(n) if n.is_dir() => n,
            Ok(_) => return Some(Err(FsError::NotDirectory)),
            Err(e) => return Some(Err(e)),
        };
        let mut summary = ListSummary::default();
        for e in node.entries() {
            if e.is_dir() {
                summary.dirs += 1;
            } else {
                summary.files += 1;
            }
            if writeln!(out, "{} {:>10} {}", type_name(e.kind), e.size, e.name).is_err() {
                return Some(Err(FsError::IoError));
            }
        }
        Some(Ok(summary))
    }

    fn unlink(&mut self, path: &str) -> Result<(), FsError> {
        let (parent, name) = self.parent_of(path)?;
        parent.remove(name)
    }

    fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        let (parent, name) = self.parent_of(path)?;
        parent.insert(name, SandboxNode::new_dir())
    }

    fn link(&mut self, path: &str, target: &str) -> Result<(), FsError> {
        let (parent, name) = self.parent_of(path)?;
        parent.insert(name, SandboxNode::new_symlink(target))
    }

    fn close(&mut self) {
        self.dirs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SandboxDriver {
        let drv = SandboxDriver::default();
        let mut fs = drv.session();
        fs.create_dir_all("/tftpboot").unwrap();
        fs.write("/tftpboot/vmlinux", 0, &[0x7f; 300]).unwrap();
        fs.write("/uEnv.txt", 0, b"bootcmd=run x\n").unwrap();
        drv
    }

    #[test]
    fn test_detect_requires_null_device() {
        use device::{PartitionInfo, RamDisk};
        let drv = SandboxDriver::default();
        assert!(drv.allows_null_device());
        assert!(drv.probe(None).is_ok());
        let disk = RamDisk::new(4096, 512, 0);
        let info = PartitionInfo::whole_disk(&*disk);
        assert!(drv.probe(Some(&BlockRange::new(disk, info))).is_err());
    }

    #[test]
    fn test_sessions_share_tree() {
        let drv = seeded();
        let mut fs = drv.probe(None).unwrap();
        assert_eq!(fs.size("/tftpboot/vmlinux").unwrap(), 300);
        fs.write("/new.bin", 0, b"abc").unwrap();
        fs.close();
        let mut again = drv.probe(None).unwrap();
        assert!(again.exists("new.bin"));
    }

    #[test]
    fn test_write_offsets() {
        let drv = seeded();
        let mut fs = drv.session();
        fs.write("/f", 0, b"hello world").unwrap();
        fs.write("/f", 6, b"there!").unwrap();
        assert_eq!(fs.read_all("/f").unwrap(), b"hello there!");
        fs.write("/f", 0, b"hi").unwrap();
        assert_eq!(fs.read_all("/f").unwrap(), b"hi");
        fs.write("/g", 4, b"x").unwrap();
        assert_eq!(fs.read_all("/g").unwrap(), b"\0\0\0\0x");
        assert_eq!(fs.write("/nodir/f", 0, b"x"), Err(FsError::NotFound));
    }

    #[test]
    fn test_write_at_huge_offset() {
        let drv = seeded();
        let mut fs = drv.session();
        assert_eq!(fs.write("/f", u64::MAX, b"x"), Err(FsError::InvalidArgument));
        assert!(!fs.exists("/f"));
        assert_eq!(
            fs.write("/uEnv.txt", u64::MAX - 1, b"xy"),
            Err(FsError::InvalidArgument)
        );
        assert_eq!(fs.size("/uEnv.txt").unwrap(), 14);

        // 不溢出但无法分配的偏移
        assert_eq!(fs.write("/g", 1 << 62, b"x"), Err(FsError::NoSpace));
        assert!(!fs.exists("/g"));

        let limited = SandboxDriver::new(64);
        let mut fs = limited.session();
        assert_eq!(fs.write("/h", 1 << 40, b"x"), Err(FsError::NoSpace));
        assert!(!fs.exists("/h"));
    }

    #[test]
    fn test_capacity_limit() {
        let drv = SandboxDriver::new(16);
        let mut fs = drv.session();
        fs.write("/a", 0, &[1; 10]).unwrap();
        assert_eq!(fs.write("/b", 0, &[1; 10]), Err(FsError::NoSpace));
        assert!(!fs.exists("/b"));
        fs.write("/a", 0, &[1; 16]).unwrap();
    }

    #[test]
    fn test_mkdir_unlink_link() {
        let drv = seeded();
        let mut fs = drv.session();
        fs.mkdir("/boot").unwrap();
        assert_eq!(fs.mkdir("/boot"), Err(FsError::AlreadyExists));
        assert_eq!(fs.mkdir("/a/b"), Err(FsError::NotFound));

        fs.link("/vmlinux", "tftpboot/vmlinux").unwrap();
        assert_eq!(fs.size("/vmlinux").unwrap(), 300);
        fs.link("/boot/up", "../uEnv.txt").unwrap();
        assert_eq!(fs.read_all("/boot/up").unwrap(), b"bootcmd=run x\n");

        assert_eq!(fs.unlink("/tftpboot"), Err(FsError::DirectoryNotEmpty));
        fs.unlink("/vmlinux").unwrap();
        assert!(fs.exists("/tftpboot/vmlinux"));
        assert_eq!(fs.unlink("/vmlinux"), Err(FsError::NotFound));
    }

    #[test]
    fn test_symlink_loop() {
        let drv = SandboxDriver::default();
        let mut fs = drv.session();
        fs.link("/a", "b").unwrap();
        fs.link("/b", "a").unwrap();
        assert_eq!(fs.size("/a"), Err(FsError::InvalidArgument));
        assert!(!fs.exists("/a"));
    }

    #[test]
    fn test_list_matches_stream() {
        let drv = seeded();
        let mut fs = drv.session();
        fs.link("/k", "tftpboot/vmlinux").unwrap();

        let mut out = String::new();
        let summary = fs.list("/", &mut out).unwrap().unwrap();
        assert_eq!(summary.dirs, 1);
        assert_eq!(summary.files, 2);
        assert_eq!(
            out,
            format!(
                "SYM {:>10} k\nDIR {:>10} tftpboot\n    {:>10} uEnv.txt\n",
                16, 0, 14
            )
        );

        let mut cursor = fs.open_dir("/").unwrap();
        let mut names = Vec::new();
        while let Ok(e) = fs.read_dir(&mut cursor) {
            names.push(e.name);
        }
        fs.close_dir(cursor);
        assert_eq!(names, ["k", "tftpboot", "uEnv.txt"]);
    }
}
