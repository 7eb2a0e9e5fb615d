//! 最小的扁平设备树（FDT）写入器
//!
//! 只支持构造测试需要的结构：内存保留表、节点与属性。

use alloc::vec::Vec;

const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 1;
const FDT_END_NODE: u32 = 2;
const FDT_PROP: u32 = 3;
const FDT_END: u32 = 9;
const HEADER_SIZE: usize = 40;

/// 设备树构造器
///
/// ```ignore
/// let blob = DtbBuilder::new()
///     .memreserve(0x8000_0000, 0x1000)
///     .begin_node("")
///     .prop_u32("#address-cells", 2)
///     .end_node()
///     .build();
/// ```
#[derive(Default)]
pub struct DtbBuilder {
    reservations: Vec<(u64, u64)>,
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl DtbBuilder {
    /// 空构造器
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加 `/memreserve/` 条目
    pub fn memreserve(mut self, addr: u64, size: u64) -> Self {
        self.reservations.push((addr, size));
        self
    }

    fn push_u32(&mut self, v: u32) {
        self.structure.extend_from_slice(&v.to_be_bytes());
    }

    fn pad(&mut self) {
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        let mut pos = 0;
        for s in self.strings.split(|b| *b == 0) {
            if s == name.as_bytes() {
                return pos as u32;
            }
            pos += s.len() + 1;
        }
        let off = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        off
    }

    /// 开始一个节点，根节点名为空串
    pub fn begin_node(mut self, name: &str) -> Self {
        self.push_u32(FDT_BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    /// 结束当前节点
    pub fn end_node(mut self) -> Self {
        self.push_u32(FDT_END_NODE);
        self
    }

    /// 原始字节属性
    pub fn prop(mut self, name: &str, value: &[u8]) -> Self {
        let nameoff = self.string_offset(name);
        self.push_u32(FDT_PROP);
        self.push_u32(value.len() as u32);
        self.push_u32(nameoff);
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    /// 单个 u32 属性
    pub fn prop_u32(self, name: &str, v: u32) -> Self {
        self.prop(name, &v.to_be_bytes())
    }

    /// 多个 cell 的属性
    pub fn prop_cells(self, name: &str, cells: &[u32]) -> Self {
        let bytes: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.prop(name, &bytes)
    }

    /// 字符串属性
    pub fn prop_str(self, name: &str, s: &str) -> Self {
        let mut bytes = Vec::from(s.as_bytes());
        bytes.push(0);
        self.prop(name, &bytes)
    }

    /// 生成设备树
    pub fn build(mut self) -> Vec<u8> {
        self.push_u32(FDT_END);

        let off_rsvmap = HEADER_SIZE;
        let rsv_size = (self.reservations.len() + 1) * 16;
        let off_struct = off_rsvmap + rsv_size;
        let off_strings = off_struct + self.structure.len();
        let total = off_strings + self.strings.len();

        let mut out = Vec::with_capacity(total);
        for v in [
            FDT_MAGIC,
            total as u32,
            off_struct as u32,
            off_strings as u32,
            off_rsvmap as u32,
            17,
            16,
            0,
            self.strings.len() as u32,
            self.structure.len() as u32,
        ] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        for (addr, size) in self.reservations.iter().chain([(0u64, 0u64)].iter()) {
            out.extend_from_slice(&addr.to_be_bytes());
            out.extend_from_slice(&size.to_be_bytes());
        }
        out.extend_from_slice(&self.structure);
        out.extend_from_slice(&self.strings);
        out
    }
}

fn split_u64(v: u64) -> [u32; 2] {
    [(v >> 32) as u32, v as u32]
}

/// 构造带 `/reserved-memory` 节点的设备树
///
/// `nodes` 中每一项为 `(节点名, 地址, 长度)`，地址和长度都用两个 cell 编码。
pub fn reserved_memory_dtb(memreserve: &[(u64, u64)], nodes: &[(&str, u64, u64)]) -> Vec<u8> {
    let mut b = DtbBuilder::new();
    for &(addr, size) in memreserve {
        b = b.memreserve(addr, size);
    }
    b = b
        .begin_node("")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .prop_str("compatible", "qemu,mips64")
        .begin_node("reserved-memory")
        .prop_u32("#address-cells", 2)
        .prop_u32("#size-cells", 2)
        .prop("ranges", &[]);
    for &(name, addr, size) in nodes {
        let a = split_u64(addr);
        let s = split_u64(size);
        b = b
            .begin_node(name)
            .prop_cells("reg", &[a[0], a[1], s[0], s[1]])
            .prop("no-map", &[])
            .end_node();
    }
    b.end_node().end_node().build()
}
