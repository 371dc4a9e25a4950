//! Criterion benchmarks comparing the sieve variants.
//!
//! ```bash
//! cargo bench --bench sieve_bench
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use izprime::{classic, siz};

fn bench_sieves(c: &mut Criterion) {
    let mut group = c.benchmark_group("sieves");
    group.sample_size(10);

    for n in [1_000_000u64, 10_000_000] {
        group.bench_with_input(BenchmarkId::new("SoE", n), &n, |b, &n| {
            b.iter(|| classic::soe(n).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("SSoE", n), &n, |b, &n| {
            b.iter(|| classic::ssoe(n).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("SiZ", n), &n, |b, &n| {
            b.iter(|| siz::siz(n).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("SiZm", n), &n, |b, &n| {
            b.iter(|| siz::sizm(n).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("SiZm_vy", n), &n, |b, &n| {
            b.iter(|| siz::sizm_vy(n).unwrap())
        });
    }
    group.finish();
}

fn bench_stepped_clear(c: &mut Criterion) {
    use izprime::Bitmap;

    let mut group = c.benchmark_group("clear_steps");
    for step in [7u64, 101, 9973] {
        group.bench_with_input(BenchmarkId::new("scalar", step), &step, |b, &step| {
            let mut bitmap = Bitmap::new(1 << 24, true).unwrap();
            b.iter(|| bitmap.clear_steps(step, 0, (1 << 24) - 1))
        });
        group.bench_with_input(BenchmarkId::new("unrolled", step), &step, |b, &step| {
            let mut bitmap = Bitmap::new(1 << 24, true).unwrap();
            b.iter(|| bitmap.clear_steps_simd(step, 0, (1 << 24) - 1))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sieves, bench_stepped_clear);
criterion_main!(benches);
