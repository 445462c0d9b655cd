use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use sqlinstr_bench::{WarmupState, mean, median, p99};

const WINDOW_SEED: u64 = 0xD1CE;
const SAMPLE_SIZE: usize = 30;

fn window_sizes() -> &'static [usize] {
    #[cfg(feature = "bench-ci")]
    {
        &[200]
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        &[200, 2_000, 20_000]
    }
}

fn random_window(size: usize) -> Vec<Duration> {
    let mut rng = StdRng::seed_from_u64(WINDOW_SEED + size as u64);
    (0..size)
        .map(|_| Duration::from_nanos(rng.gen_range(50_000..5_000_000)))
        .collect()
}

fn bench_window_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_stats");
    group.sample_size(SAMPLE_SIZE);
    for &size in window_sizes() {
        let window = random_window(size);
        group.bench_with_input(BenchmarkId::new("median", size), &window, |b, w| {
            b.iter(|| median(black_box(w)))
        });
        group.bench_with_input(BenchmarkId::new("p99", size), &window, |b, w| {
            b.iter(|| p99(black_box(w)))
        });
        group.bench_with_input(BenchmarkId::new("mean", size), &window, |b, w| {
            b.iter(|| mean(black_box(w)))
        });
    }
    group.finish();
}

fn bench_warmup_record(c: &mut Criterion) {
    c.bench_function("warmup_record_and_check", |b| {
        let mut state = WarmupState::new(3, 0.05);
        let mut tick = 0u64;
        b.iter(|| {
            tick = tick.wrapping_add(1);
            state.record(Duration::from_nanos(1_000 + tick % 7));
            black_box(state.is_stable())
        })
    });
}

criterion_group!(benches, bench_window_stats, bench_warmup_record);
criterion_main!(benches);
