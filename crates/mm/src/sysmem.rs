//! 物理内存映射
//!
//! [`PhysMemory`] 抽象 "把一段物理地址变成可访问的字节切片"；
//! [`MemWindow`] 是它的 RAII 封装，析构时解除映射，早退的错误路径也不例外。

use alloc::vec;
use alloc::vec::Vec;

use crate::MemError;

/// 物理内存访问接口
pub trait PhysMemory {
    /// 建立 `[paddr, paddr + len)` 的映射
    fn map(&mut self, paddr: u64, len: usize) -> Result<(), MemError>;

    /// 访问已映射的区间
    fn bytes_mut(&mut self, paddr: u64, len: usize) -> Result<&mut [u8], MemError>;

    /// 解除映射
    fn unmap(&mut self, paddr: u64, len: usize);
}

/// 作用域内有效的物理内存窗口
pub struct MemWindow<'a> {
    mem: &'a mut dyn PhysMemory,
    paddr: u64,
    len: usize,
}

impl<'a> MemWindow<'a> {
    /// 映射 `[paddr, paddr + len)`
    pub fn map(mem: &'a mut dyn PhysMemory, paddr: u64, len: usize) -> Result<Self, MemError> {
        mem.map(paddr, len)?;
        Ok(Self { mem, paddr, len })
    }

    /// 窗口内容
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8], MemError> {
        self.mem.bytes_mut(self.paddr, self.len)
    }

    /// 窗口起始物理地址
    pub fn paddr(&self) -> u64 {
        self.paddr
    }

    /// 窗口长度
    pub fn len(&self) -> usize {
        self.len
    }

    /// 窗口是否为空
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for MemWindow<'_> {
    fn drop(&mut self) {
        self.mem.unmap(self.paddr, self.len);
    }
}

/// 以 `Vec` 模拟的一段物理内存
///
/// sandbox 构建和测试使用。记录当前活动映射数，便于检查映射是否都已释放。
#[derive(Debug, Clone)]
pub struct RamImage {
    base: u64,
    data: Vec<u8>,
    active_maps: usize,
}

impl RamImage {
    /// 创建从 `base` 开始、长度为 `size` 的内存，初始全为 0
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            data: vec![0u8; size],
            active_maps: 0,
        }
    }

    fn span(&self, paddr: u64, len: usize) -> Result<core::ops::Range<usize>, MemError> {
        let start = paddr
            .checked_sub(self.base)
            .and_then(|off| usize::try_from(off).ok())
            .ok_or(MemError::OutOfRange)?;
        let end = start.checked_add(len).ok_or(MemError::OutOfRange)?;
        if end > self.data.len() {
            return Err(MemError::OutOfRange);
        }
        Ok(start..end)
    }

    /// 读取一段内容（不经过映射计数）
    pub fn peek(&self, paddr: u64, len: usize) -> Result<&[u8], MemError> {
        let range = self.span(paddr, len)?;
        Ok(&self.data[range])
    }

    /// 写入一段内容（不经过映射计数）
    pub fn poke(&mut self, paddr: u64, bytes: &[u8]) -> Result<(), MemError> {
        let range = self.span(paddr, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// 当前未释放的映射数
    pub fn active_maps(&self) -> usize {
        self.active_maps
    }
}

impl PhysMemory for RamImage {
    fn map(&mut self, paddr: u64, len: usize) -> Result<(), MemError> {
        self.span(paddr, len)?;
        self.active_maps += 1;
        Ok(())
    }

    fn bytes_mut(&mut self, paddr: u64, len: usize) -> Result<&mut [u8], MemError> {
        let range = self.span(paddr, len)?;
        Ok(&mut self.data[range])
    }

    fn unmap(&mut self, _paddr: u64, _len: usize) {
        self.active_maps = self.active_maps.saturating_sub(1);
    }
}

/// 物理地址与虚拟地址一一对应的平台
///
/// 监控程序在真实硬件上运行时，物理内存已经按恒等映射可访问。
pub struct DirectMap {
    _private: (),
}

impl DirectMap {
    /// 创建恒等映射访问器
    ///
    /// # Safety
    ///
    /// 调用者必须保证所有经由它访问的物理地址都恒等映射、可读写，
    /// 且在访问期间不被其他代码使用。
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PhysMemory for DirectMap {
    fn map(&mut self, paddr: u64, len: usize) -> Result<(), MemError> {
        usize::try_from(paddr)
            .ok()
            .and_then(|p| p.checked_add(len))
            .map(|_| ())
            .ok_or(MemError::OutOfRange)
    }

    fn bytes_mut(&mut self, paddr: u64, len: usize) -> Result<&mut [u8], MemError> {
        self.map(paddr, len)?;
        if len == 0 {
            return Ok(&mut []);
        }
        // Safety: 由 DirectMap::new 的调用者保证地址有效
        Ok(unsafe { core::slice::from_raw_parts_mut(paddr as usize as *mut u8, len) })
    }

    fn unmap(&mut self, _paddr: u64, _len: usize) {}
}
