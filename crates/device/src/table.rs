//! 块设备登记表与设备/分区说明符解析
//!
//! 说明符形如 `"0"`, `"0:1"`, `"1:auto"`，设备号与分区号均为十六进制。

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use log::{debug, error};

use crate::block::BlockDriver;
use crate::error::DeviceError;
use crate::partition::{PartitionInfo, partition_info, read_mbr};

/// 解析结果：设备（可能不存在）、分区描述以及分区号
#[derive(Clone)]
pub struct ResolvedPartition {
    /// 块设备；无设备接口（如 `hostfs`）为 `None`
    pub device: Option<Arc<dyn BlockDriver>>,
    /// 分区描述
    pub info: PartitionInfo,
    /// 分区号，0 表示整盘
    pub index: u32,
}

/// 把接口名和设备/分区说明符解析为具体的块范围
pub trait PartitionResolver {
    /// 解析 `ifname` 下的 `dev_part`，`None` 表示调用方没有给出说明符
    fn resolve(&self, ifname: &str, dev_part: Option<&str>)
    -> Result<ResolvedPartition, DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartSelector {
    /// 未指定分区
    Unspecified,
    /// `auto`
    Auto,
    /// 显式分区号
    Index(u32),
}

fn parse_hex(s: &str) -> Option<u64> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    u64::from_str_radix(s, 16).ok()
}

fn parse_dev_part(spec: &str) -> Result<(u64, PartSelector), DeviceError> {
    let (dev_str, part_str) = match spec.split_once(':') {
        Some((d, p)) => (d, Some(p)),
        None => (spec, None),
    };
    let dev = parse_hex(dev_str).ok_or(DeviceError::BadSpec)?;
    let part = match part_str {
        None | Some("") => PartSelector::Unspecified,
        Some("auto") => PartSelector::Auto,
        Some(p) => {
            let n = parse_hex(p).ok_or(DeviceError::BadSpec)?;
            PartSelector::Index(u32::try_from(n).map_err(|_| DeviceError::BadSpec)?)
        }
    };
    Ok((dev, part))
}

struct Interface {
    name: String,
    devices: Vec<(u64, Arc<dyn BlockDriver>)>,
    device_less: bool,
}

/// 按接口名登记的块设备表
#[derive(Default)]
pub struct BlockDeviceTable {
    interfaces: Vec<Interface>,
}

impl BlockDeviceTable {
    /// 创建空表
    pub fn new() -> Self {
        Self::default()
    }

    fn interface_mut(&mut self, ifname: &str) -> &mut Interface {
        let pos = match self.interfaces.iter().position(|i| i.name == ifname) {
            Some(pos) => pos,
            None => {
                self.interfaces.push(Interface {
                    name: ifname.to_string(),
                    devices: Vec::new(),
                    device_less: false,
                });
                self.interfaces.len() - 1
            }
        };
        &mut self.interfaces[pos]
    }

    /// 在接口 `ifname` 下登记设备号 `devnum`，重复登记会替换旧设备
    pub fn register(&mut self, ifname: &str, devnum: u64, dev: Arc<dyn BlockDriver>) {
        let iface = self.interface_mut(ifname);
        iface.devices.retain(|(n, _)| *n != devnum);
        iface.devices.push((devnum, dev));
    }

    /// 登记一个不需要块设备的接口（例如 `hostfs`）
    pub fn register_device_less(&mut self, ifname: &str) {
        self.interface_mut(ifname).device_less = true;
    }

    /// 按接口名和设备号查找设备
    pub fn get_device(&self, ifname: &str, devnum: u64) -> Option<Arc<dyn BlockDriver>> {
        self.interfaces
            .iter()
            .find(|i| i.name == ifname)?
            .devices
            .iter()
            .find(|(n, _)| *n == devnum)
            .map(|(_, d)| d.clone())
    }

    fn select_partition(
        dev: &dyn BlockDriver,
        part: PartSelector,
    ) -> Result<(u32, PartitionInfo), DeviceError> {
        let table = read_mbr(dev)?;

        if table.is_none() || part == PartSelector::Index(0) {
            if dev.total_blocks() == 0 {
                return Err(DeviceError::BadDeviceSize);
            }
            if let PartSelector::Index(n) = part
                && n > 0
            {
                return Err(DeviceError::NoPartitionTable);
            }
            return Ok((0, PartitionInfo::whole_disk(dev)));
        }

        match part {
            PartSelector::Auto => {
                let table = table.ok_or(DeviceError::NoPartitionTable)?;
                let (index, info) = table.auto_select().ok_or(DeviceError::NoSuchPartition)?;
                Ok((index, info.clone()))
            }
            PartSelector::Unspecified => Ok((1, partition_info(dev, 1)?)),
            PartSelector::Index(n) => Ok((n, partition_info(dev, n)?)),
        }
    }
}

impl PartitionResolver for BlockDeviceTable {
    fn resolve(
        &self,
        ifname: &str,
        dev_part: Option<&str>,
    ) -> Result<ResolvedPartition, DeviceError> {
        let iface = self
            .interfaces
            .iter()
            .find(|i| i.name == ifname)
            .ok_or(DeviceError::NoSuchInterface)?;

        if iface.device_less {
            return Ok(ResolvedPartition {
                device: None,
                info: PartitionInfo::default(),
                index: 0,
            });
        }

        let spec = match dev_part {
            Some(s) if !s.is_empty() && s != "-" => s,
            _ => {
                error!("** No device specified **");
                return Err(DeviceError::NoDeviceSpecified);
            }
        };
        let (devnum, part) = parse_dev_part(spec).inspect_err(|_| {
            error!("** Bad device specification {} {} **", ifname, spec);
        })?;
        let dev = self.get_device(ifname, devnum).ok_or_else(|| {
            error!("** Bad device {} {} **", ifname, spec);
            DeviceError::NoSuchDevice
        })?;

        let (index, info) = Self::select_partition(dev.as_ref(), part).inspect_err(|e| {
            error!("** {} - {} {} **", e, ifname, spec);
        })?;
        debug!(
            "[Part] {} {} -> {} part {} start {} size {}",
            ifname,
            spec,
            dev.get_id(),
            index,
            info.start,
            info.size
        );
        Ok(ResolvedPartition {
            device: Some(dev),
            info,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::RamDisk;
    use alloc::vec;

    fn mbr_disk(entries: &[(usize, u8, u32, u32)]) -> Arc<RamDisk> {
        let mut img = vec![0u8; 128 * 512];
        img[510] = 0x55;
        img[511] = 0xAA;
        for &(slot, boot, start, size) in entries {
            let e = &mut img[446 + slot * 16..][..16];
            e[0] = boot;
            e[4] = 0x83;
            e[8..12].copy_from_slice(&start.to_le_bytes());
            e[12..16].copy_from_slice(&size.to_le_bytes());
        }
        RamDisk::from_bytes(img, 512, 0)
    }

    #[test]
    fn test_parse_dev_part() {
        assert_eq!(parse_dev_part("0").unwrap(), (0, PartSelector::Unspecified));
        assert_eq!(parse_dev_part("1:2").unwrap(), (1, PartSelector::Index(2)));
        assert_eq!(parse_dev_part("a:auto").unwrap(), (10, PartSelector::Auto));
        assert_eq!(parse_dev_part("0:a").unwrap(), (0, PartSelector::Index(10)));
        assert_eq!(parse_dev_part("0:").unwrap(), (0, PartSelector::Unspecified));
        assert_eq!(parse_dev_part(":1"), Err(DeviceError::BadSpec));
        assert_eq!(parse_dev_part("x:1"), Err(DeviceError::BadSpec));
    }

    #[test]
    fn test_resolve_explicit_and_default_partition() {
        let mut table = BlockDeviceTable::new();
        table.register("mmc", 0, mbr_disk(&[(0, 0, 8, 16), (1, 0x80, 32, 64)]));

        let r = table.resolve("mmc", Some("0:2")).unwrap();
        assert_eq!((r.index, r.info.start), (2, 32));

        // 未指定分区时取 1 号分区
        let r = table.resolve("mmc", Some("0")).unwrap();
        assert_eq!((r.index, r.info.start), (1, 8));

        // auto 优先选择可引导分区
        let r = table.resolve("mmc", Some("0:auto")).unwrap();
        assert_eq!(r.index, 2);

        let r = table.resolve("mmc", Some("0:0")).unwrap();
        assert_eq!((r.index, r.info.size), (0, 128));

        assert_eq!(
            table.resolve("mmc", Some("0:3")).err(),
            Some(DeviceError::NoSuchPartition)
        );
    }

    #[test]
    fn test_resolve_disk_without_table() {
        let mut table = BlockDeviceTable::new();
        table.register("usb", 1, RamDisk::new(16 * 512, 512, 1));

        let r = table.resolve("usb", Some("1")).unwrap();
        assert_eq!((r.index, r.info.size), (0, 16));
        let r = table.resolve("usb", Some("1:auto")).unwrap();
        assert_eq!(r.index, 0);
        assert_eq!(
            table.resolve("usb", Some("1:1")).err(),
            Some(DeviceError::NoPartitionTable)
        );
    }

    #[test]
    fn test_resolve_errors() {
        let mut table = BlockDeviceTable::new();
        table.register("mmc", 0, RamDisk::new(512, 512, 0));

        assert_eq!(
            table.resolve("sata", Some("0")).err(),
            Some(DeviceError::NoSuchInterface)
        );
        assert_eq!(
            table.resolve("mmc", Some("1")).err(),
            Some(DeviceError::NoSuchDevice)
        );
        assert_eq!(
            table.resolve("mmc", None).err(),
            Some(DeviceError::NoDeviceSpecified)
        );
        assert_eq!(
            table.resolve("mmc", Some("-")).err(),
            Some(DeviceError::NoDeviceSpecified)
        );
    }

    #[test]
    fn test_device_less_interface() {
        let mut table = BlockDeviceTable::new();
        table.register_device_less("hostfs");
        let r = table.resolve("hostfs", None).unwrap();
        assert!(r.device.is_none());
        assert_eq!(r.index, 0);
    }
}
