//! 保留内存收集与布局跟踪的集成测试。

use mm::{MemError, MemoryLayout, Region, ReservationSource, ReservationTracker, fdt_reservations};
use test_support::image::dtb::reserved_memory_dtb;

const MB: u64 = 0x10_0000;

fn sample_dtb() -> Vec<u8> {
    reserved_memory_dtb(
        &[(MB, 0x1000)],
        &[("ramoops@2000000", 0x200_0000, MB), ("fw@3800000", 0x380_0000, 2 * MB)],
    )
}

#[test]
fn test_collects_memreserve_and_nodes() {
    let regions = fdt_reservations(&sample_dtb()).unwrap();
    assert_eq!(
        regions,
        [
            Region::new(MB, 0x1000),
            Region::new(0x200_0000, MB),
            Region::new(0x380_0000, 2 * MB),
        ]
    );
}

#[test]
fn test_rejects_garbage_blob() {
    assert_eq!(fdt_reservations(&[0u8; 64]), Err(MemError::InvalidFdt));
}

#[test]
fn test_layout_reserves_fdt_contents() {
    let blob = sample_dtb();
    let blob_len = blob.len() as u64;
    let layout = MemoryLayout::new()
        .with_bank(0, 64 * MB)
        .with_firmware_region(0, MB / 2)
        .with_fdt(0x300_0000, blob);

    let lmb = layout.init_lmb().unwrap();
    assert!(lmb.reserved().contains(0x300_0000, blob_len));

    let mut tracker = layout.tracker().unwrap();
    assert!(tracker.overlaps(MB + 0x800, 0x10));
    assert!(tracker.overlaps(0x1ff_f000, 0x2000));
    assert!(tracker.overlaps(0x300_0000, 1));
    assert!(!tracker.overlaps(0x280_0000, MB));

    assert_eq!(tracker.try_reserve(0x390_0000, 0x100), Err(MemError::Overlap));
    assert_eq!(tracker.try_reserve(0x400_0000, 0x100), Err(MemError::OutOfRange));
    assert_eq!(tracker.try_reserve(0x280_0000, MB), Ok(()));
    // 申请成功的区间随后也算作保留
    assert!(tracker.overlaps(0x280_0000, 1));
}

#[test]
fn test_unparsable_fdt_keeps_blob_reserved() {
    let layout = MemoryLayout::new()
        .with_bank(0, 16 * MB)
        .with_fdt(4 * MB, vec![0xAB; 256]);
    let mut tracker = layout.tracker().unwrap();
    assert!(tracker.overlaps(4 * MB + 0xff, 1));
    assert!(!tracker.overlaps(4 * MB + 0x100, 1));
    assert_eq!(tracker.try_reserve(4 * MB + 0x100, MB), Ok(()));
}

#[test]
fn test_trackers_are_independent() {
    let layout = MemoryLayout::new().with_bank(0, 16 * MB);
    let mut first = layout.tracker().unwrap();
    first.try_reserve(MB, MB).unwrap();
    let second = layout.tracker().unwrap();
    assert!(!second.overlaps(MB, MB));
}
