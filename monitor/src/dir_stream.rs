//! 目录流
//!
//! 流自己持有打开它的会话，不依赖 [`FsDispatch`](crate::FsDispatch) 的活动会话，
//! 所以在两次 `next` 之间公共接口照常关闭会话也不影响遍历。

use log::warn;

use vfs::{DirCursor, DirEntry, FsError, FsType};

use crate::Session;

/// 打开的目录流
pub struct DirStream {
    session: Option<Session>,
    cursor: Option<DirCursor>,
}

impl DirStream {
    pub(crate) fn open(mut session: Session, path: &str) -> Result<Self, FsError> {
        let cursor = session.fs_mut().open_dir(path)?;
        Ok(Self {
            session: Some(session),
            cursor: Some(cursor),
        })
    }

    /// 流所在的文件系统类型，已关闭时为 `None`
    pub fn fs_type(&self) -> Option<FsType> {
        self.session.as_ref().map(Session::fs_type)
    }

    /// 下一个目录项，遍历结束返回 `Ok(None)`
    pub fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError> {
        let (Some(session), Some(cursor)) = (self.session.as_mut(), self.cursor.as_mut()) else {
            return Ok(None);
        };
        match session.fs_mut().read_dir(cursor) {
            Ok(entry) => Ok(Some(entry)),
            Err(FsError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 关闭流；重复关闭无效果
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Some(cursor) = self.cursor.take() {
                session.fs_mut().close_dir(cursor);
            }
        }
    }
}

impl Iterator for DirStream {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                warn!("[FS] readdir failed: {}", e);
                self.shutdown();
                Some(Err(e))
            }
        }
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
