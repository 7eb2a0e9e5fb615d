//! 从设备树中收集保留区间
//!
//! 包括 `/memreserve/` 条目和 `/reserved-memory` 下各子节点的 `reg`。

use alloc::vec::Vec;
use log::{debug, warn};

use crate::{MemError, Region};

/// 解析设备树，返回其中声明的所有保留区间
pub fn fdt_reservations(blob: &[u8]) -> Result<Vec<Region>, MemError> {
    let fdt = fdt::Fdt::new(blob).map_err(|e| {
        warn!("[FDT] invalid blob: {:?}", e);
        MemError::InvalidFdt
    })?;

    let mut regions = Vec::new();
    for rsv in fdt.memory_reservations() {
        let region = Region::new(rsv.address() as usize as u64, rsv.size() as u64);
        debug!(
            "[FDT] memreserve {:#x} size {:#x}",
            region.base, region.size
        );
        regions.push(region);
    }

    if let Some(node) = fdt.find_node("/reserved-memory") {
        for child in node.children() {
            let Some(reg) = child.reg() else {
                continue;
            };
            for r in reg {
                let Some(size) = r.size else {
                    continue;
                };
                let region = Region::new(r.starting_address as usize as u64, size as u64);
                debug!(
                    "[FDT] reserved-memory {} {:#x} size {:#x}",
                    child.name, region.base, region.size
                );
                regions.push(region);
            }
        }
    }
    Ok(regions)
}
