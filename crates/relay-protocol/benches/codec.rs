//! Codec benchmarks for relay-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use relay_protocol::{codec, OutboundEnvelope};
use serde_json::json;

fn bench_encode_small(c: &mut Criterion) {
    let envelope = OutboundEnvelope::new("test", json!({"body": "x".repeat(64)}));

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("small_64B", |b| {
        b.iter(|| codec::encode_outbound(black_box(&envelope)))
    });
    group.finish();
}

fn bench_decode_small(c: &mut Criterion) {
    let text = format!(
        r#"{{"type":"chat","message":"{}","to":"abc123"}}"#,
        "x".repeat(64)
    );

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("small_64B", |b| {
        b.iter(|| codec::decode_inbound(black_box(&text)))
    });
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let envelope = OutboundEnvelope::new("test:channel:room", json!({"body": "x".repeat(256)}));

    c.bench_function("roundtrip_256B", |b| {
        b.iter(|| {
            let text = codec::encode_outbound(black_box(&envelope)).unwrap();
            codec::decode_outbound(black_box(&text)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_encode_small,
    bench_decode_small,
    bench_roundtrip
);
criterion_main!(benches);
