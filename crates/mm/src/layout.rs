//! 板级内存布局
//!
//! 记录 RAM bank、固件自身占用的区间以及设备树的位置。每次需要做
//! 越界检查时调用 [`MemoryLayout::init_lmb`] 得到一个全新的 [`Lmb`]，
//! 因此上一次加载的保留不会影响下一次。

use alloc::boxed::Box;
use alloc::vec::Vec;
use log::warn;

use crate::{Lmb, MemError, Region, ReservationTracker, fdt_reservations};

/// 构造保留跟踪器的来源
pub trait ReservationSource {
    /// 构造一个新的跟踪器，已登记所有固件保留
    fn tracker(&self) -> Result<Box<dyn ReservationTracker>, MemError>;
}

/// 位于物理内存中的设备树
#[derive(Debug, Clone)]
pub struct FdtBlob {
    /// 设备树所在物理地址
    pub addr: u64,
    /// 设备树内容
    pub data: Vec<u8>,
}

/// 板级内存布局
#[derive(Debug, Clone, Default)]
pub struct MemoryLayout {
    banks: Vec<Region>,
    firmware: Vec<Region>,
    fdt: Option<FdtBlob>,
}

impl MemoryLayout {
    /// 空布局
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加 RAM bank
    pub fn with_bank(mut self, base: u64, size: u64) -> Self {
        self.banks.push(Region::new(base, size));
        self
    }

    /// 添加固件占用区间（镜像、栈、堆等）
    pub fn with_firmware_region(mut self, base: u64, size: u64) -> Self {
        self.firmware.push(Region::new(base, size));
        self
    }

    /// 设置设备树
    pub fn with_fdt(mut self, addr: u64, data: Vec<u8>) -> Self {
        self.fdt = Some(FdtBlob { addr, data });
        self
    }

    /// RAM bank 列表
    pub fn banks(&self) -> &[Region] {
        &self.banks
    }

    /// 构造 LMB 并登记所有固件保留
    ///
    /// 设备树无法解析时只保留其本身所占区间。
    pub fn init_lmb(&self) -> Result<Lmb, MemError> {
        let mut lmb = Lmb::new();
        for bank in &self.banks {
            lmb.add_memory(bank.base, bank.size)?;
        }
        for fw in &self.firmware {
            lmb.reserve(fw.base, fw.size)?;
        }
        if let Some(blob) = &self.fdt {
            let total = fdt::Fdt::new(&blob.data)
                .map(|f| f.total_size())
                .unwrap_or(blob.data.len());
            lmb.reserve(blob.addr, total as u64)?;
            match fdt_reservations(&blob.data) {
                Ok(regions) => {
                    for r in regions {
                        lmb.reserve(r.base, r.size)?;
                    }
                }
                Err(e) => warn!("[LMB] skipping device tree reservations: {}", e),
            }
        }
        lmb.dump();
        Ok(lmb)
    }
}

impl ReservationSource for MemoryLayout {
    fn tracker(&self) -> Result<Box<dyn ReservationTracker>, MemError> {
        Ok(Box::new(self.init_lmb()?))
    }
}
