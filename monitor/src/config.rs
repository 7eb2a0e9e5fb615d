//! 板级配置：QEMU MIPS64

use mm::MemoryLayout;

/// SDRAM 起始地址（KSEG0）
pub const SDRAM_BASE: u64 = 0xffff_ffff_8000_0000;
/// 内存大小
pub const SDRAM_SIZE: u64 = 128 * 1024 * 1024;
/// 默认加载地址
pub const LOAD_ADDR: u64 = 0xffff_ffff_8100_0000;
/// 监控程序镜像长度
pub const MONITOR_LEN: u64 = 192 * 1024;
/// 初始栈相对 SDRAM 起始的偏移
pub const INIT_SP_OFFSET: u64 = 0x40_0000;

/// 默认环境变量
pub const DEFAULT_ENV: &[(&str, &str)] = &[
    ("bootfile", "/tftpboot/vmlinux"),
    ("baudrate", "115200"),
    ("bootdelay", "1"),
];

/// 本板的默认内存布局
///
/// 一个 RAM bank。初始栈以下的区域留给栈和早期数据，
/// 重定位后的监控程序镜像位于内存顶端。
pub fn board_layout() -> MemoryLayout {
    MemoryLayout::new()
        .with_bank(SDRAM_BASE, SDRAM_SIZE)
        .with_firmware_region(SDRAM_BASE, INIT_SP_OFFSET)
        .with_firmware_region(SDRAM_BASE + SDRAM_SIZE - MONITOR_LEN, MONITOR_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_addr_inside_ram() {
        assert!(LOAD_ADDR >= SDRAM_BASE + INIT_SP_OFFSET);
        assert!(LOAD_ADDR < SDRAM_BASE + SDRAM_SIZE - MONITOR_LEN);
    }

    #[test]
    fn test_layout_reserves_stack() {
        let lmb = board_layout().init_lmb().unwrap();
        assert!(lmb.reserved().contains(SDRAM_BASE, INIT_SP_OFFSET));
        assert!(lmb.reserved().contains(SDRAM_BASE + SDRAM_SIZE - MONITOR_LEN, MONITOR_LEN));
        assert_eq!(lmb.memory().regions().len(), 1);
    }
}
