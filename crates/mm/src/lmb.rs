//! 逻辑内存块（LMB）
//!
//! 两张有序区间表：`memory` 是可用的 RAM bank，`reserved` 是已被占用的区间。
//! 相邻或重叠的区间在插入时合并。

use alloc::vec::Vec;
use log::debug;

use crate::MemError;

/// 物理地址区间 `[base, base + size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// 起始地址
    pub base: u64,
    /// 长度
    pub size: u64,
}

impl Region {
    /// 构造区间
    pub const fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    /// 结束地址（不含），溢出时返回 `None`
    pub fn end(&self) -> Option<u64> {
        self.base.checked_add(self.size)
    }

    fn overlaps(&self, base: u64, end: u64) -> bool {
        let self_end = self.base.saturating_add(self.size);
        self.base < end && base < self_end
    }

    fn contains(&self, base: u64, end: u64) -> bool {
        let self_end = self.base.saturating_add(self.size);
        self.base <= base && end <= self_end
    }
}

/// 按起始地址排序的区间表
#[derive(Debug, Clone, Default)]
pub struct RegionList {
    regions: Vec<Region>,
}

impl RegionList {
    /// 空表
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// 所有区间
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// 插入区间并与相邻、重叠的区间合并
    pub fn add(&mut self, base: u64, size: u64) -> Result<(), MemError> {
        if size == 0 {
            return Ok(());
        }
        let mut start = base;
        let mut end = base.checked_add(size).ok_or(MemError::OutOfRange)?;

        // 吸收所有与 [start, end] 接触的区间
        self.regions.retain(|r| {
            let r_end = r.base.saturating_add(r.size);
            if r.base <= end && start <= r_end {
                start = start.min(r.base);
                end = end.max(r_end);
                false
            } else {
                true
            }
        });
        let pos = self.regions.partition_point(|r| r.base < start);
        self.regions.insert(pos, Region::new(start, end - start));
        Ok(())
    }

    /// 第一个与 `[base, base + size)` 重叠的区间
    pub fn find_overlap(&self, base: u64, size: u64) -> Option<&Region> {
        let end = base.saturating_add(size);
        self.regions.iter().find(|r| r.overlaps(base, end))
    }

    /// 是否有某个区间完整包含 `[base, base + size)`
    pub fn contains(&self, base: u64, size: u64) -> bool {
        match base.checked_add(size) {
            Some(end) => self.regions.iter().any(|r| r.contains(base, end)),
            None => false,
        }
    }
}

/// 物理内存保留跟踪器
pub trait ReservationTracker {
    /// 尝试保留 `[base, base + size)`，与已有保留重叠或不在内存中时失败
    fn try_reserve(&mut self, base: u64, size: u64) -> Result<(), MemError>;

    /// 查询 `[base, base + size)` 是否与已有保留重叠
    fn overlaps(&self, base: u64, size: u64) -> bool;
}

/// LMB 分配器
#[derive(Debug, Clone, Default)]
pub struct Lmb {
    memory: RegionList,
    reserved: RegionList,
}

impl Lmb {
    /// 创建空的 LMB
    pub const fn new() -> Self {
        Self {
            memory: RegionList::new(),
            reserved: RegionList::new(),
        }
    }

    /// 登记一个 RAM bank
    pub fn add_memory(&mut self, base: u64, size: u64) -> Result<(), MemError> {
        self.memory.add(base, size)
    }

    /// 无条件保留一个区间（固件自身使用）
    pub fn reserve(&mut self, base: u64, size: u64) -> Result<(), MemError> {
        self.reserved.add(base, size)
    }

    /// 在指定地址分配：区间必须完整落在某个 bank 内且不与保留区重叠
    pub fn alloc_addr(&mut self, base: u64, size: u64) -> Result<u64, MemError> {
        if let Some(r) = self.reserved.find_overlap(base, size) {
            debug!(
                "[LMB] {:#x}+{:#x} overlaps reserved {:#x}+{:#x}",
                base, size, r.base, r.size
            );
            return Err(MemError::Overlap);
        }
        if !self.memory.contains(base, size) {
            debug!("[LMB] {:#x}+{:#x} is not inside a memory bank", base, size);
            return Err(MemError::OutOfRange);
        }
        self.reserved.add(base, size)?;
        Ok(base)
    }

    /// RAM bank 表
    pub fn memory(&self) -> &RegionList {
        &self.memory
    }

    /// 保留区间表
    pub fn reserved(&self) -> &RegionList {
        &self.reserved
    }

    /// 以 debug 级别打印两张表
    pub fn dump(&self) {
        debug!("[LMB] memory:");
        for r in self.memory.regions() {
            debug!("[LMB]   {:#018x} size {:#x}", r.base, r.size);
        }
        debug!("[LMB] reserved:");
        for r in self.reserved.regions() {
            debug!("[LMB]   {:#018x} size {:#x}", r.base, r.size);
        }
    }
}

impl ReservationTracker for Lmb {
    fn try_reserve(&mut self, base: u64, size: u64) -> Result<(), MemError> {
        self.alloc_addr(base, size).map(|_| ())
    }

    fn overlaps(&self, base: u64, size: u64) -> bool {
        self.reserved.find_overlap(base, size).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_list_merges() {
        let mut list = RegionList::new();
        list.add(0x3000, 0x1000).unwrap();
        list.add(0x1000, 0x1000).unwrap();
        assert_eq!(list.regions().len(), 2);

        // 填上中间的空隙，三段合为一段
        list.add(0x2000, 0x1000).unwrap();
        assert_eq!(list.regions(), &[Region::new(0x1000, 0x3000)]);

        list.add(0x3800, 0x1000).unwrap();
        assert_eq!(list.regions(), &[Region::new(0x1000, 0x3800)]);

        list.add(0x10000, 0).unwrap();
        assert_eq!(list.regions().len(), 1);
    }

    #[test]
    fn test_region_list_keeps_order() {
        let mut list = RegionList::new();
        list.add(0x9000, 0x100).unwrap();
        list.add(0x1000, 0x100).unwrap();
        list.add(0x5000, 0x100).unwrap();
        let bases: Vec<u64> = list.regions().iter().map(|r| r.base).collect();
        assert_eq!(bases, [0x1000, 0x5000, 0x9000]);
    }

    #[test]
    fn test_alloc_addr() {
        let mut lmb = Lmb::new();
        lmb.add_memory(0x8000_0000, 0x100_0000).unwrap();
        lmb.reserve(0x8000_0000, 0x10_0000).unwrap();

        assert_eq!(lmb.alloc_addr(0x8020_0000, 0x1000), Ok(0x8020_0000));
        // 已经分配过的区间不能再次分配
        assert_eq!(lmb.alloc_addr(0x8020_0800, 0x10), Err(MemError::Overlap));
        assert_eq!(lmb.alloc_addr(0x800f_f000, 0x2000), Err(MemError::Overlap));
        // 跨出 bank 末尾
        assert_eq!(
            lmb.alloc_addr(0x80ff_f000, 0x2000),
            Err(MemError::OutOfRange)
        );
        assert_eq!(lmb.alloc_addr(0x1000, 0x10), Err(MemError::OutOfRange));
    }

    #[test]
    fn test_overflow_is_out_of_range() {
        let mut lmb = Lmb::new();
        lmb.add_memory(0xffff_ffff_8000_0000, 0x800_0000).unwrap();
        assert_eq!(
            lmb.alloc_addr(0xffff_ffff_ffff_f000, 0x2000),
            Err(MemError::OutOfRange)
        );
        assert!(lmb.alloc_addr(0xffff_ffff_8100_0000, 0x1000).is_ok());
        assert!(lmb.overlaps(0xffff_ffff_8100_0800, 1));
    }
}
