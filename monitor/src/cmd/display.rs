//! 数值显示

use core::fmt;

const UNITS: [char; 6] = ['E', 'P', 'T', 'G', 'M', 'K'];

/// 按二进制单位显示大小，保留一位小数并四舍五入
///
/// 小于 1 KiB 时显示为 `"<n> Bytes"`，例如 `1536` 显示为 `"1.5 KiB"`。
pub fn print_size(out: &mut dyn fmt::Write, size: u64, suffix: &str) -> fmt::Result {
    let mut shift = 10 * UNITS.len() as u32;
    let mut unit = None;
    for c in UNITS {
        if size >> shift != 0 {
            unit = Some(c);
            break;
        }
        shift -= 10;
    }
    let Some(unit) = unit else {
        return write!(out, "{} Bytes{}", size, suffix);
    };

    let mut whole = size >> shift;
    let frac = size & ((1u64 << shift) - 1);
    let mut tenth = 0;
    if frac != 0 {
        tenth = ((10 * frac as u128 + (1u128 << (shift - 1))) >> shift) as u64;
        if tenth >= 10 {
            tenth -= 10;
            whole += 1;
        }
    }
    write!(out, "{}", whole)?;
    if tenth != 0 {
        write!(out, ".{}", tenth)?;
    }
    write!(out, " {}iB{}", unit, suffix)
}

/// 解析十六进制数，允许 `0x` 前缀
pub fn parse_hex(s: &str) -> Option<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
