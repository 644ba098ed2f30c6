// Available modules
mod aggregate;
mod assets;

// Used Modules
use aggregate::*;
use criterion::{criterion_group, criterion_main, Criterion};

fn criterion_benchmark(c: &mut Criterion) {
    bench_load_results(c);
    bench_aggregate(c);
    bench_speedup(c);
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = criterion_benchmark
}

criterion_main!(benches);
