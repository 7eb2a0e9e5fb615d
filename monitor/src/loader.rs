//! 把文件读入物理内存
//!
//! 读之前可以先向保留跟踪器申请目标区间，申请失败说明会覆盖固件自己的
//! 数据（设备树、监控程序镜像、栈），此时拒绝读取。目标区间通过
//! [`MemWindow`] 映射，任何返回路径上都会解除映射。

use log::{debug, error, warn};

use mm::{MemWindow, PhysMemory, ReservationSource};
use vfs::{FsCaps, FsError};

use crate::Session;

/// 检查并保留 `[dest, dest + n)`，返回实际要读的长度
///
/// `offset` 在文件末尾或之后时返回 `None`，不触碰跟踪器。
fn reserve_destination(
    session: &mut Session,
    path: &str,
    reservations: &dyn ReservationSource,
    dest: u64,
    offset: u64,
    len: u64,
) -> Result<Option<u64>, FsError> {
    let size = session.fs_mut().size(path)?;
    if offset >= size {
        return Ok(None);
    }
    let mut read_len = size - offset;
    if len != 0 && len < read_len {
        read_len = len;
    }

    let mut tracker = reservations.tracker().map_err(|e| {
        warn!("[LMB] cannot build reservation map: {}", e);
        FsError::InvalidArgument
    })?;
    if tracker.try_reserve(dest, read_len).is_err() {
        error!("** Reading file would overwrite reserved memory **");
        return Err(FsError::NoSpace);
    }
    Ok(Some(read_len))
}

fn window_len(n: u64) -> Result<usize, FsError> {
    usize::try_from(n).map_err(|_| FsError::InvalidArgument)
}

/// 一次加载请求
#[derive(Debug, Clone, Copy)]
pub struct ReadRequest<'p> {
    /// 文件路径
    pub path: &'p str,
    /// 目标物理地址
    pub dest: u64,
    /// 文件内偏移
    pub offset: u64,
    /// 读取长度，0 表示读到文件末尾
    pub len: u64,
    /// 是否先做保留区检查
    pub enforce_bounds: bool,
}

/// 按 `req` 把文件读到物理内存
///
/// `enforce_bounds` 为真时先做保留区检查：重叠返回 [`FsError::NoSpace`]，
/// 内存不被修改。会话在返回时关闭。
pub fn bounded_read(
    mut session: Session,
    memory: &mut dyn PhysMemory,
    reservations: &dyn ReservationSource,
    req: ReadRequest<'_>,
) -> Result<u64, FsError> {
    let ReadRequest {
        path,
        dest,
        offset,
        len,
        enforce_bounds,
    } = req;
    let span = if enforce_bounds {
        match reserve_destination(&mut session, path, reservations, dest, offset, len)? {
            Some(n) => n,
            None => return Ok(0),
        }
    } else if len == 0 {
        session.fs_mut().size(path)?.saturating_sub(offset)
    } else {
        len
    };

    let mut window = MemWindow::map(memory, dest, window_len(span)?).map_err(|e| {
        warn!("[FS] cannot map {:#x}+{:#x}: {}", dest, span, e);
        FsError::InvalidArgument
    })?;
    let buf = window.as_mut_slice().map_err(|_| FsError::InvalidArgument)?;
    let actual = session.fs_mut().read(path, offset, buf)?;

    if len != 0 && actual != len {
        debug!("** {} shorter than offset + len **", path);
    }
    Ok(actual)
}

/// 把物理地址 `src` 处的 `len` 字节写到 `path` 的 `offset` 处
///
/// 写入字节数与 `len` 不一致时返回 [`FsError::ShortWrite`]。
pub fn write_from_memory(
    mut session: Session,
    memory: &mut dyn PhysMemory,
    path: &str,
    src: u64,
    offset: u64,
    len: u64,
) -> Result<u64, FsError> {
    session.require(FsCaps::WRITE)?;
    let mut window = MemWindow::map(memory, src, window_len(len)?).map_err(|e| {
        warn!("[FS] cannot map {:#x}+{:#x}: {}", src, len, e);
        FsError::InvalidArgument
    })?;
    let buf = window.as_mut_slice().map_err(|_| FsError::InvalidArgument)?;

    match session.fs_mut().write(path, offset, buf) {
        Ok(written) if written == len => Ok(written),
        Ok(_) => {
            error!("** Unable to write file {} **", path);
            Err(FsError::ShortWrite)
        }
        Err(e) => {
            error!("** Unable to write file {} **", path);
            Err(e)
        }
    }
}
