//! Performance benchmarks for message processing.
//!
//! These benchmarks measure the hot paths of a peer:
//! - Payload cipher and token line encoding
//! - Line classification
//! - Full handshake exchange
//! - Simulated ticks over the in-memory link

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use peer::config::Config;
use peer::protocol::{
    classify, CipherKey, DhParameters, Frame, HandshakeEngine, Role, SeededRandom,
};
use peer::Simulation;

/// Benchmark payload encoding and decoding.
fn bench_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("cipher");
    let key = CipherKey::new(246);

    for (name, size) in [("short_16B", 16usize), ("line_256B", 256)] {
        let plaintext: Vec<u8> = (0..size).map(|i| b'a' + (i % 26) as u8).collect();
        let line = key.encode_line(&plaintext);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("encode_line_{}", name), |b| {
            b.iter(|| key.encode_line(black_box(&plaintext)));
        });
        group.bench_function(format!("decode_line_{}", name), |b| {
            b.iter(|| key.decode_line(black_box(&line)));
        });
    }

    group.finish();
}

/// Benchmark line classification.
fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    group.bench_function("control", |b| {
        b.iter(|| classify(black_box("AKEY:1234")));
    });
    group.bench_function("payload", |b| {
        b.iter(|| classify(black_box("190 147 143 222 10 99")));
    });

    group.finish();
}

/// Benchmark a complete PG, ACK, AKEY, BKEY exchange.
fn bench_handshake(c: &mut Criterion) {
    let mut group = c.benchmark_group("handshake");
    let mut rng = SeededRandom::from_seed(1);

    group.bench_function("full_exchange", |b| {
        b.iter(|| {
            let mut initiator = HandshakeEngine::new(Role::Initiator, DhParameters::default());
            let mut responder = HandshakeEngine::new(Role::Responder, DhParameters::default());

            let mut line = initiator.begin_as_initiator().map(|f| f.to_line());
            let mut to_responder = true;
            while let Some(text) = line.take() {
                let Frame::Control(frame) = classify(&text) else {
                    break;
                };
                let engine = if to_responder {
                    &mut responder
                } else {
                    &mut initiator
                };
                line = engine
                    .on_control_frame(&frame, &mut rng)
                    .reply()
                    .map(|f| f.to_line());
                to_responder = !to_responder;
            }
            black_box(initiator.shared_secret())
        });
    });

    group.finish();
}

/// Benchmark simulated ticks of both peers.
fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    let mut config = Config::default();
    config.handshake.seed = Some(9);
    config.node.tick_ms = 10;
    config.traffic.send_interval_ms = 20;
    config.simulation.toggle_at = vec![1];

    group.throughput(Throughput::Elements(100));
    group.bench_function("100_ticks", |b| {
        b.iter(|| {
            let mut simulation = Simulation::new(&config).unwrap();
            black_box(simulation.run(100))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_cipher,
    bench_classify,
    bench_handshake,
    bench_simulation
);
criterion_main!(benches);
