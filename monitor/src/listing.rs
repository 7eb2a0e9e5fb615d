//! 通用列目录

use core::fmt;

use vfs::{FsError, ListSummary};

use crate::DirStream;

/// 遍历目录流，按监控程序的格式输出
///
/// 目录输出为 `"            name/"`，其他项输出为 `" size   name"`（大小右对齐 8 列），
/// 末尾输出文件与目录计数。符号链接按文件计数。
pub fn list_generic(stream: DirStream, out: &mut dyn fmt::Write) -> Result<ListSummary, FsError> {
    let mut summary = ListSummary::default();
    for entry in stream {
        let e = entry?;
        let res = if e.is_dir() {
            summary.dirs += 1;
            writeln!(out, "            {}/", e.name)
        } else {
            summary.files += 1;
            writeln!(out, " {:>8}   {}", e.size, e.name)
        };
        res.map_err(|_| FsError::IoError)?;
    }
    write!(
        out,
        "\n{} file(s), {} dir(s)\n\n",
        summary.files, summary.dirs
    )
    .map_err(|_| FsError::IoError)?;
    Ok(summary)
}
