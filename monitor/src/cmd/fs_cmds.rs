//! `load`、`ls`、`save` 等命令的实现

use alloc::string::{String, ToString};

use vfs::{FsError, FsType};

use super::{CmdContext, CmdResult, parse_hex, print_size};
use crate::config::LOAD_ADDR;
use crate::{Environment, FsDispatch};

/// 说明符缺省（缺失、空串或 `-`）时取 `bootdevice`
fn dev_part_or_default(env: &Environment, arg: Option<&str>) -> Option<String> {
    match arg {
        None | Some("") | Some("-") => env.get("bootdevice").map(ToString::to_string),
        Some(s) => Some(s.to_string()),
    }
}

fn bind(
    ctx: &mut CmdContext<'_>,
    ifname: &str,
    dev_part: Option<&str>,
    filter: Option<FsType>,
) -> Result<(), FsError> {
    let dev_part = dev_part_or_default(ctx.env, dev_part);
    ctx.dispatch.bind(ifname, dev_part.as_deref(), filter)
}

fn report_rate(ctx: &mut CmdContext<'_>, bytes: u64, verb: &str, elapsed: u64) {
    let _ = write!(ctx.console, "{} bytes {} in {} ms", bytes, verb, elapsed);
    if elapsed > 0 {
        let _ = write!(ctx.console, " (");
        let _ = print_size(ctx.console, bytes / elapsed * 1000, "/s");
        let _ = write!(ctx.console, ")");
    }
    let _ = writeln!(ctx.console);
}

/// `load <interface> [<dev[:part]> [<addr> [<filename> [bytes [pos]]]]]`
///
/// 读取时检查保留区。成功后设置 `fileaddr` 与 `filesize`。
pub fn do_load(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() < 2 || argv.len() > 7 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], argv.get(2).copied(), filter).is_err() {
        return CmdResult::Failure;
    }

    let addr = match argv.get(3) {
        Some(s) => match parse_hex(s) {
            Some(a) => a,
            None => {
                ctx.dispatch.close();
                return CmdResult::Usage;
            }
        },
        None => ctx.env.get_hex("loadaddr").unwrap_or(LOAD_ADDR),
    };
    let filename = match argv.get(4) {
        Some(f) => f.to_string(),
        None => match ctx.env.get("bootfile") {
            Some(f) => f.to_string(),
            None => {
                ctx.dispatch.close();
                let _ = writeln!(ctx.console, "** No boot file defined **");
                return CmdResult::Failure;
            }
        },
    };
    let bytes = argv.get(5).and_then(|s| parse_hex(s)).unwrap_or(0);
    let pos = argv.get(6).and_then(|s| parse_hex(s)).unwrap_or(0);

    let start = ctx.clock.now_ms();
    let result = ctx.dispatch.read(&filename, addr, pos, bytes, true);
    let elapsed = ctx.clock.now_ms().saturating_sub(start);
    let Ok(len_read) = result else {
        return CmdResult::Failure;
    };

    report_rate(ctx, len_read, "read", elapsed);
    ctx.env.set_hex("fileaddr", addr);
    ctx.env.set_hex("filesize", len_read);
    CmdResult::Success
}

/// `ls <interface> [<dev[:part]> [directory]]`
pub fn do_ls(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() < 2 || argv.len() > 4 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], argv.get(2).copied(), filter).is_err() {
        return CmdResult::Failure;
    }
    let dir = argv.get(3).copied().unwrap_or("/");
    match ctx.dispatch.list(dir, ctx.console) {
        Ok(_) => CmdResult::Success,
        Err(_) => CmdResult::Failure,
    }
}

/// `size <interface> <dev[:part]> <filename>`，结果写入 `filesize`
pub fn do_size(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() != 4 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], Some(argv[2]), filter).is_err() {
        return CmdResult::Failure;
    }
    match ctx.dispatch.size(argv[3]) {
        Ok(size) => {
            ctx.env.set_hex("filesize", size);
            CmdResult::Success
        }
        Err(_) => CmdResult::Failure,
    }
}

/// `save <interface> <dev[:part]> <addr> <filename> bytes [pos]`
pub fn do_save(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() < 6 || argv.len() > 7 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], Some(argv[2]), filter).is_err() {
        return CmdResult::Failure;
    }
    let addr = parse_hex(argv[3]).unwrap_or(0);
    let filename = argv[4];
    let bytes = parse_hex(argv[5]).unwrap_or(0);
    let pos = argv.get(6).and_then(|s| parse_hex(s)).unwrap_or(0);

    let start = ctx.clock.now_ms();
    let result = ctx.dispatch.write(filename, addr, pos, bytes);
    let elapsed = ctx.clock.now_ms().saturating_sub(start);
    let Ok(written) = result else {
        return CmdResult::Failure;
    };
    report_rate(ctx, written, "written", elapsed);
    CmdResult::Success
}

/// `fsuuid <interface> <dev[:part]> [<varname>]`
pub fn do_fs_uuid(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() < 3 || argv.len() > 4 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], Some(argv[2]), filter).is_err() {
        return CmdResult::Failure;
    }
    let Ok(uuid) = ctx.dispatch.uuid() else {
        return CmdResult::Failure;
    };
    match argv.get(3) {
        Some(var) => ctx.env.set(var, &uuid),
        None => {
            let _ = writeln!(ctx.console, "{}", uuid);
        }
    }
    CmdResult::Success
}

/// `fstype <interface> <dev[:part]> [<varname>]`，总是自动探测
pub fn do_fs_type(ctx: &mut CmdContext<'_>, argv: &[&str], _filter: Option<FsType>) -> CmdResult {
    if argv.len() < 3 || argv.len() > 4 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], Some(argv[2]), None).is_err() {
        return CmdResult::Failure;
    }
    let name = ctx.dispatch.active_type_name();
    match argv.get(3) {
        Some(var) => ctx.env.set(var, name),
        None => {
            let _ = writeln!(ctx.console, "{}", name);
        }
    }
    ctx.dispatch.close();
    CmdResult::Success
}

/// `rm <interface> <dev[:part]> <filename>`
pub fn do_rm(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() != 4 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], Some(argv[2]), filter).is_err() {
        return CmdResult::Failure;
    }
    match ctx.dispatch.unlink(argv[3]) {
        Ok(()) => CmdResult::Success,
        Err(_) => CmdResult::Failure,
    }
}

/// `mkdir <interface> <dev[:part]> <directory>`
pub fn do_mkdir(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() != 4 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], Some(argv[2]), filter).is_err() {
        return CmdResult::Failure;
    }
    match ctx.dispatch.mkdir(argv[3]) {
        Ok(()) => CmdResult::Success,
        Err(_) => {
            let _ = writeln!(
                ctx.console,
                "** Unable to create a directory \"{}\" **",
                argv[3]
            );
            CmdResult::Failure
        }
    }
}

/// `ln <interface> <dev[:part]> <target> <linkname>`
pub fn do_ln(ctx: &mut CmdContext<'_>, argv: &[&str], filter: Option<FsType>) -> CmdResult {
    if argv.len() != 5 {
        return CmdResult::Usage;
    }
    if bind(ctx, argv[1], Some(argv[2]), filter).is_err() {
        return CmdResult::Failure;
    }
    match ctx.dispatch.link(argv[4], argv[3]) {
        Ok(()) => CmdResult::Success,
        Err(_) => CmdResult::Failure,
    }
}

/// 绑定并检查文件是否存在；绑定失败视为不存在
pub fn file_exists(
    dispatch: &mut FsDispatch,
    env: &Environment,
    ifname: &str,
    dev_part: Option<&str>,
    file: &str,
    filter: Option<FsType>,
) -> bool {
    let dev_part = dev_part_or_default(env, dev_part);
    if dispatch.bind(ifname, dev_part.as_deref(), filter).is_err() {
        return false;
    }
    dispatch.exists(file)
}
