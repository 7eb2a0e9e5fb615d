//! 控制台日志
//!
//! 实现 `log::Log`，把记录写到启动时注册的 [`LogOutput`]。
//! 错误级别的记录原样输出（监控程序的 `** ... **` 提示），其余加级别前缀。

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicPtr, Ordering};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// 日志输出 trait
///
/// 使用方需要在启动时通过 [`register_log_output`] 注册实现。
pub trait LogOutput: Send + Sync {
    /// 输出字符串到控制台
    fn write_str(&self, s: &str);
}

/// 存储 LogOutput trait object 的胖指针
struct LogOutputPtr {
    data: AtomicPtr<()>,
    vtable: AtomicPtr<()>,
}

impl LogOutputPtr {
    const fn new() -> Self {
        Self {
            data: AtomicPtr::new(core::ptr::null_mut()),
            vtable: AtomicPtr::new(core::ptr::null_mut()),
        }
    }
}

static LOG_OUTPUT: LogOutputPtr = LogOutputPtr::new();

/// 注册日志输出
///
/// # Safety
///
/// - 必须在任何日志调用之前调用
/// - 只能调用一次
pub unsafe fn register_log_output(output: &'static dyn LogOutput) {
    let ptr: *const dyn LogOutput = output;
    let (data, vtable) = unsafe { core::mem::transmute::<_, (*mut (), *mut ())>(ptr) };
    LOG_OUTPUT.data.store(data, Ordering::Release);
    LOG_OUTPUT.vtable.store(vtable, Ordering::Release);
}

fn get_log_output() -> Option<&'static dyn LogOutput> {
    let data = LOG_OUTPUT.data.load(Ordering::Acquire);
    let vtable = LOG_OUTPUT.vtable.load(Ordering::Acquire);
    if data.is_null() || vtable.is_null() {
        return None;
    }
    // Safety: 指针由 register_log_output 设置，保证有效
    Some(unsafe { core::mem::transmute::<(*mut (), *mut ()), &'static dyn LogOutput>((data, vtable)) })
}

struct OutputWriter(&'static dyn LogOutput);

impl Write for OutputWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

/// 控制台日志器
pub struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(output) = get_log_output() else {
            return;
        };
        let mut w = OutputWriter(output);
        let _ = match record.level() {
            Level::Error => writeln!(w, "{}", record.args()),
            level => writeln!(w, "[{:<5}] {}", level, record.args()),
        };
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// 默认日志级别
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

/// 安装控制台日志器
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
