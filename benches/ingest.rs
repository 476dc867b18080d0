use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use topomon::{PacketEvent, Topology};

const WINDOW: Duration = Duration::from_secs(30);

fn hosts(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("10.{}.{}.{}", (i >> 16) & 0xff, (i >> 8) & 0xff, i & 0xff)).collect()
}

fn bench_ingest(c: &mut Criterion) {
    let topology = Topology::new();
    let hosts = hosts(1_024);
    let mut i = 0usize;

    c.bench_function("ingest existing pair", |b| {
        b.iter(|| {
            let src = &hosts[i % hosts.len()];
            let dst = &hosts[(i * 7 + 1) % hosts.len()];
            topology.ingest(black_box(PacketEvent::new(src.as_str(), dst.as_str(), i as f64)));
            i += 1;
        })
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let topology = Topology::new();
    let hosts = hosts(5_000);
    for (i, src) in hosts.iter().enumerate() {
        let dst = &hosts[(i * 13 + 5) % hosts.len()];
        topology.ingest(PacketEvent::new(src.as_str(), dst.as_str(), (i % 60) as f64));
    }

    c.bench_function("snapshot 5k hosts", |b| {
        b.iter(|| black_box(topology.snapshot(black_box(60.0), WINDOW)))
    });
    c.bench_function("stats 5k hosts", |b| {
        b.iter(|| black_box(topology.stats(black_box(60.0), WINDOW)))
    });
}

criterion_group!(benches, bench_ingest, bench_snapshot);
criterion_main!(benches);
