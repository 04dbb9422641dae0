//! Frame codec benchmark suite.
//!
//! Measures encoding and decoding of `START` requests carrying routing
//! fragments of increasing size.
//!
//! Run with: cargo bench --bench codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use homa_host::transport::{FrameReader, encode_frame};
use homa_host::{Command, Message};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

/// Number of `vnext` servers in the generated fragment.
const SERVER_COUNTS: &[usize] = &[1, 16, 256];

fn fragment(servers: usize) -> Value {
    let vnext: Vec<Value> = (0..servers)
        .map(|i| {
            json!({
                "address": format!("node-{i}.example.net"),
                "port": 443,
                "users": [{"id": "b831381d-6324-4d53-ad4f-8cda48b30811", "encryption": "none"}]
            })
        })
        .collect();

    json!({
        "protocol": "vless",
        "settings": {"vnext": vnext},
        "streamSettings": {"network": "tcp", "security": "tls"}
    })
}

fn start_request(servers: usize) -> Message {
    Message::new(Command::Start)
        .with_id("bench")
        .with_config(fragment(servers))
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");

    for &servers in SERVER_COUNTS {
        let message = start_request(servers);
        let size = encode_frame(&message).map(|f| f.len()).unwrap_or_default();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::from_parameter(servers), &message, |b, m| {
            b.iter(|| encode_frame(black_box(m)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("read_message");

    for &servers in SERVER_COUNTS {
        let frame = encode_frame(&start_request(servers)).expect("encode");
        group.throughput(Throughput::Bytes(frame.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(servers), &frame, |b, f| {
            b.to_async(&rt).iter(|| async {
                let mut reader = FrameReader::new(black_box(f.as_slice()));
                reader.read_message().await
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
