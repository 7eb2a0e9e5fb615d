//! 文件系统命令
//!
//! 每个命令接收完整的参数表（`argv[0]` 为命令名），数值参数均为十六进制。
//! 命令输出写到 [`CmdContext::console`]，诊断信息走日志。

mod display;
mod fs_cmds;

use core::fmt;

use vfs::FsType;

use crate::{Environment, FsDispatch};

pub use display::{parse_hex, print_size};
pub use fs_cmds::{
    do_fs_type, do_fs_uuid, do_ln, do_load, do_ls, do_mkdir, do_rm, do_save, do_size, file_exists,
};

/// 命令返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdResult {
    /// 成功
    Success,
    /// 失败
    Failure,
    /// 参数错误，调用方应打印用法
    Usage,
}

/// 毫秒时钟
pub trait Clock {
    /// 单调递增的毫秒计数
    fn now_ms(&self) -> u64;
}

/// 命令执行环境
pub struct CmdContext<'a> {
    /// 文件系统分发器
    pub dispatch: &'a mut FsDispatch,
    /// 环境变量
    pub env: &'a mut Environment,
    /// 命令输出
    pub console: &'a mut dyn fmt::Write,
    /// 计时
    pub clock: &'a dyn Clock,
}

type Handler = fn(&mut CmdContext<'_>, &[&str], Option<FsType>) -> CmdResult;

/// 命令表项
pub struct Command {
    /// 命令名
    pub name: &'static str,
    /// 限定的文件系统类型，`None` 表示自动探测
    pub filter: Option<FsType>,
    /// 用法（不含命令名）
    pub usage: &'static str,
    handler: Handler,
}

const LOAD_USAGE: &str = "<interface> [<dev[:part]> [<addr> [<filename> [bytes [pos]]]]]";
const LS_USAGE: &str = "<interface> [<dev[:part]> [directory]]";
const SIZE_USAGE: &str = "<interface> <dev[:part]> <filename>";

/// 所有命令
pub const COMMANDS: &[Command] = &[
    Command {
        name: "load",
        filter: None,
        usage: LOAD_USAGE,
        handler: do_load,
    },
    Command {
        name: "ls",
        filter: None,
        usage: LS_USAGE,
        handler: do_ls,
    },
    Command {
        name: "size",
        filter: None,
        usage: SIZE_USAGE,
        handler: do_size,
    },
    Command {
        name: "save",
        filter: None,
        usage: "<interface> <dev[:part]> <addr> <filename> bytes [pos]",
        handler: do_save,
    },
    Command {
        name: "fsuuid",
        filter: None,
        usage: "<interface> <dev[:part]> [<varname>]",
        handler: do_fs_uuid,
    },
    Command {
        name: "fstype",
        filter: None,
        usage: "<interface> <dev[:part]> [<varname>]",
        handler: do_fs_type,
    },
    Command {
        name: "rm",
        filter: None,
        usage: "<interface> <dev[:part]> <filename>",
        handler: do_rm,
    },
    Command {
        name: "mkdir",
        filter: None,
        usage: "<interface> <dev[:part]> <directory>",
        handler: do_mkdir,
    },
    Command {
        name: "ln",
        filter: None,
        usage: "<interface> <dev[:part]> <target> <linkname>",
        handler: do_ln,
    },
    Command {
        name: "fatload",
        filter: Some(FsType::Fat),
        usage: LOAD_USAGE,
        handler: do_load,
    },
    Command {
        name: "fatls",
        filter: Some(FsType::Fat),
        usage: LS_USAGE,
        handler: do_ls,
    },
    Command {
        name: "fatsize",
        filter: Some(FsType::Fat),
        usage: SIZE_USAGE,
        handler: do_size,
    },
    Command {
        name: "ext4load",
        filter: Some(FsType::Ext4),
        usage: LOAD_USAGE,
        handler: do_load,
    },
    Command {
        name: "ext4ls",
        filter: Some(FsType::Ext4),
        usage: LS_USAGE,
        handler: do_ls,
    },
    Command {
        name: "ext4size",
        filter: Some(FsType::Ext4),
        usage: SIZE_USAGE,
        handler: do_size,
    },
];

/// 按 `argv[0]` 查表执行，参数错误时打印用法
pub fn run(ctx: &mut CmdContext<'_>, argv: &[&str]) -> CmdResult {
    let Some(&name) = argv.first() else {
        return CmdResult::Usage;
    };
    let Some(cmd) = COMMANDS.iter().find(|c| c.name == name) else {
        let _ = writeln!(ctx.console, "Unknown command '{}' - try 'help'", name);
        return CmdResult::Failure;
    };
    let result = (cmd.handler)(ctx, argv, cmd.filter);
    if result == CmdResult::Usage {
        let _ = writeln!(ctx.console, "Usage:\n{} {}", cmd.name, cmd.usage);
    }
    result
}
