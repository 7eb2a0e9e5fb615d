//! 路径工具
//!
//! 监控程序的路径总是相对于当前文件系统的根目录：
//!
//! - 开头的 `/` 可有可无，`boot.scr` 与 `/boot.scr` 等价
//! - `.` 被跳过，`..` 回到上一级，但不会越过根目录
//! - 连续的 `/` 视为一个

use alloc::string::String;
use alloc::vec::Vec;

use crate::FsError;

/// 把路径拆成规范化后的组件列表，根目录为空列表
pub fn components(path: &str) -> Vec<&str> {
    let mut stack = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }
    stack
}

/// 规范化为以 `/` 开头的绝对路径
pub fn normalize_path(path: &str) -> String {
    let mut out = String::from("/");
    out.push_str(&components(path).join("/"));
    out
}

/// 把路径分割为父目录组件和最后一个组件
///
/// 根目录没有最后一个组件，返回 [`FsError::InvalidArgument`]。
pub fn split_path(path: &str) -> Result<(Vec<&str>, &str), FsError> {
    let mut comps = components(path);
    let name = comps.pop().ok_or(FsError::InvalidArgument)?;
    Ok((comps, name))
}
