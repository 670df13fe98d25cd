use fwmemdump::driver::sim::SimulatedUnit;
use fwmemdump::driver::TransportErrorKind;
use fwmemdump::layout::CONFIG_SPACE_BASE;
use fwmemdump::walker::{RegionDescriptor, RegionWalker, WalkError};

const A: u64 = CONFIG_SPACE_BASE + 0x100;
const B: u64 = CONFIG_SPACE_BASE + 0x200;
const C: u64 = CONFIG_SPACE_BASE + 0x400;
const D: u64 = CONFIG_SPACE_BASE + 0x500;

fn sample_unit() -> SimulatedUnit {
    let mut unit = SimulatedUnit::new();
    unit.write_quadlets(CONFIG_SPACE_BASE, &[0x100, 0x10, 0x200, 0x20, 0x400, 0x8, 0x500, 0x28]);

    // region A: header at A+0x50, one 4 byte record, records end at A+0x6c
    unit.write_quadlets(A + 68, &[0, 0x50, 0x28]);
    unit.write_quadlets(A + 0x50, &[0xa0, 0xa1, 0xa2, 0xa3, 0xa4]);
    unit.write_quadlets(A + 0x64, &[0x0001_0004, 0xa5]);
    unit.write_quadlets(A + 0x6c, &[0xa6]);

    // region B: no section 1 entries, one section 2 entry, section 3 ends with a terminator,
    // section 4 runs up to its boundary
    unit.write_quadlets(B, &[0x14, 0x44, 0x7c, 0xac]);
    unit.write_quadlets(B + 0x10, &[0]);
    unit.write_quadlets(B + 0x14, &[0xb2; 12]);
    unit.write_quadlets(B + 0x44, &[0xb3; 7]);
    unit.write_quadlets(B + 0x7c, &[0xb4; 6]);
    unit.write_quadlets(B + 0x94, &[0xb5; 6]);

    unit.write_quadlets(C + 8, &[0xc0, 0xc1, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6]);

    unit.write_quadlets(D, &[2]);
    unit.write_quadlets(D + 4, &[0xd0; 5]);
    unit.write_quadlets(D + 24, &[0xd1; 5]);
    unit
}

#[test]
fn test_full_walk() {
    let mut walker = RegionWalker::new(sample_unit(), Vec::new());
    let report = walker.walk().unwrap();

    assert_eq!(report.regions.a, RegionDescriptor { address: 0xffffe0000100, size: 16 });
    assert_eq!(report.regions.b, RegionDescriptor { address: 0xffffe0000200, size: 32 });
    assert_eq!(report.regions.c, RegionDescriptor { address: 0xffffe0000400, size: 8 });
    assert_eq!(report.regions.d, RegionDescriptor { address: 0xffffe0000500, size: 40 });
    assert_eq!(report.sections.as_array(), [B + 0x14, B + 0x44, B + 0x7c, B + 0xac]);
    assert_eq!(report.region_a_records, 1);
    assert_eq!(report.section_entries, [0, 1, 1, 2]);
    assert_eq!(report.region_d_entries, 2);

    let (unit, out) = walker.into_parts();
    assert_eq!(unit.reads().len(), 18);
    let d_reads: Vec<u64> = unit.read_addresses().into_iter().filter(|addr| *addr > D).collect();
    assert_eq!(d_reads, vec![D + 4, D + 24]);

    let out = String::from_utf8(out).unwrap();
    let headers: Vec<&str> = out.lines().filter(|l| l.starts_with("Region")).collect();
    assert_eq!(headers, vec!["Region A:", "Region B:", "Region C:", "Region D:"]);
    assert!(out.contains("  Sections:\n    1: 0000ffffe0000214\n"));
    assert!(out.contains("  section 3:\n    entry 00: 0000ffffe0000244\n"));
    assert!(out.contains("  entry 01: 0000ffffe0000518\n    00: 000000d1\n"));
    assert!(out.ends_with("    04: 000000d1\n"));
}

#[test]
fn test_failure_stops_every_later_read() {
    let total = {
        let mut walker = RegionWalker::new(sample_unit(), std::io::sink());
        walker.walk().unwrap();
        walker.into_parts().0.reads().len()
    };

    for failing in 0..total {
        let mut unit = sample_unit();
        unit.fail_at(failing);
        let mut walker = RegionWalker::new(unit, Vec::new());
        match walker.walk() {
            Err(WalkError::Transport(err)) => assert_eq!(err.kind, TransportErrorKind::Timeout),
            other => panic!("read {} should have failed the walk: {:?}", failing, other),
        }
        let (unit, _) = walker.into_parts();
        assert_eq!(unit.reads().len(), failing + 1, "reads issued after failing read {}", failing);
    }
}

#[test]
fn test_output_before_failure_is_kept() {
    let mut unit = sample_unit();
    // fail the section table read of region B
    unit.fail_at(5);
    let mut walker = RegionWalker::new(unit, Vec::new());
    assert!(walker.walk().is_err());

    let (unit, out) = walker.into_parts();
    assert_eq!(unit.reads().last(), Some(&(B, 4)));
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Region A:\n"));
    assert!(out.ends_with("Region B:\n"));
}
