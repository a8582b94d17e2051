//! Benchmarks for the low-pass filter hot path
//!
//! The stateful filter runs once per detection coordinate and twice per
//! controller cycle, so a single apply must stay trivially cheap.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pan_tilt_tracker::filters::{low_pass, LowPass};

fn benchmark_single_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("low_pass_step");

    group.bench_function("free_function", |b| {
        b.iter(|| {
            black_box(low_pass(
                black_box(12.5),
                black_box(11.0),
                black_box(0.05),
                black_box(1.0 / 30.0),
            ))
        });
    });

    let mut filter = LowPass::seeded(0.05, 1.0 / 30.0, 0.0);
    group.bench_function("stateful", |b| {
        b.iter(|| black_box(filter.apply(black_box(12.5))));
    });

    group.finish();
}

fn benchmark_sequences(c: &mut Criterion) {
    let mut group = c.benchmark_group("low_pass_sequence");

    // Noisy track like the detector produces at 30 fps
    let samples: Vec<f64> = (0..1000)
        .map(|i| {
            let t = i as f64 / 30.0;
            20.0 * t.sin() + 2.0 * rand::random::<f64>()
        })
        .collect();

    for rc in [0.0, 0.05, 0.1, 1.0] {
        group.bench_with_input(BenchmarkId::new("rc", rc), &samples, |b, samples| {
            let mut filter = LowPass::new(rc, 1.0 / 30.0);
            b.iter(|| {
                filter.reset();
                for &sample in samples {
                    black_box(filter.apply(black_box(sample)));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_single_step, benchmark_sequences);
criterion_main!(benches);
