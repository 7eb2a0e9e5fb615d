//! 控制台诊断信息的集成测试。

mod common;

use std::sync::Mutex;

use common::fixture;
use log::LevelFilter;
use monitor::console::{self, LogOutput};

struct Capture(Mutex<String>);

impl LogOutput for Capture {
    fn write_str(&self, s: &str) {
        self.0.lock().unwrap().push_str(s);
    }
}

static CAPTURE: Capture = Capture(Mutex::new(String::new()));

fn take() -> String {
    core::mem::take(&mut *CAPTURE.0.lock().unwrap())
}

// 日志器是进程级的，所有断言放在同一个测试里
#[test]
fn test_console_messages() {
    unsafe { console::register_log_output(&CAPTURE) };
    console::init(LevelFilter::Debug).unwrap();

    let mut f = fixture();
    let d = &mut f.dispatch;
    take();

    assert!(d.bind("mmc", Some("1"), None).is_err());
    let out = take();
    assert!(out.contains("** Unrecognized filesystem type **\n"));
    assert!(out.contains("[DEBUG] [FS] fat not recognised"));

    d.bind("mmc", Some("0:1"), None).unwrap();
    assert!(d.read("/boot.scr", 0x7_ff80, 0, 0, true).is_err());
    assert!(take().contains("** Reading file would overwrite reserved memory **\n"));

    d.bind("mmc", Some("0:1"), None).unwrap();
    d.read("/boot.scr", 0x1000, 64, 100, false).unwrap();
    assert!(take().contains("** /boot.scr shorter than offset + len **"));

    d.bind("hostfs", None, None).unwrap();
    assert!(d.link("/uEnv.txt", "/kernel").is_err());
    assert!(take().contains("** Unable to create link /uEnv.txt -> /kernel **\n"));

    d.bind("hostfs", None, None).unwrap();
    assert!(d.write("/tftpboot/vmlinux/x", 0x1000, 0, 4).is_err());
    assert!(take().contains("** Unable to write file /tftpboot/vmlinux/x **\n"));

    log::set_max_level(LevelFilter::Info);
    d.bind("mmc", Some("1"), None).unwrap_err();
    let out = take();
    assert!(out.contains("** Unrecognized filesystem type **"));
    assert!(!out.contains("[DEBUG]"));
}
