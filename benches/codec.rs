//! 패킷 봉투 인코딩/디코딩 벤치마크

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use swft::Packet;

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet");

    for size in [64usize, 1024, 4096] {
        let payload = vec![0xABu8; size];
        let packet = Packet::new(payload.clone());
        let wire = packet.to_bytes();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &payload, |b, payload| {
            b.iter(|| Packet::new(black_box(payload.clone())).to_bytes())
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &wire, |b, wire| {
            b.iter(|| Packet::from_bytes(black_box(wire)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
