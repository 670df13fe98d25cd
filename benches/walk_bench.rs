use fwmemdump::driver::sim::SimulatedUnit;
use fwmemdump::layout::CONFIG_SPACE_BASE;
use fwmemdump::walker::RegionWalker;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

// 64 entries in region D and 100 quadlet section 4, everything else empty
fn build_image() -> Vec<u8> {
    let mut quadlets = vec![0_u32; 0x1000 / 4];
    quadlets[..8].copy_from_slice(&[0x100, 0x40, 0x200, 0x20, 0x400, 0x8, 0xc00, 0x40]);
    quadlets[(0x100 + 68) / 4..(0x100 + 80) / 4].copy_from_slice(&[0, 0x50, 0]);
    quadlets[0x200 / 4..0x210 / 4].copy_from_slice(&[0x14, 0x14, 0x14, 0x14 + 24 * 100]);
    for i in 0..100 {
        quadlets[(0x214 + i * 24) / 4] = 1;
    }
    quadlets[0xc00 / 4] = 64;
    quadlets.iter().flat_map(|q| q.to_be_bytes()).collect()
}

fn walk_bench(c: &mut Criterion) {
    let unit = SimulatedUnit::from_be_image(CONFIG_SPACE_BASE, &build_image()).unwrap();
    c.bench_function("Walk, 100 section 4 entries, 64 region D entries", |b| {
        b.iter(|| {
            let mut walker = RegionWalker::new(unit.clone(), std::io::sink());
            black_box(walker.walk().unwrap())
        });
    });
}

criterion_group!(benches, walk_bench);
criterion_main!(benches);
