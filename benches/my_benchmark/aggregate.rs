use criterion::{black_box, Criterion};
use sortbench_plots::analysis::{aggregate, SpeedupMode, Statistic};
use sortbench_plots::parsing::load_results_csv;

use crate::assets;

pub fn bench_load_results(c: &mut Criterion) {
    let path = assets::mergesort_results_path();
    c.bench_function("load_results_csv", |b| {
        b.iter(|| load_results_csv(black_box(&path), None).unwrap())
    });
}

pub fn bench_aggregate(c: &mut Criterion) {
    let trial_counts = [5, 100, 1000];

    for &trials in &trial_counts {
        let table = assets::get_scaled_results(trials);

        for statistic in [Statistic::Mean, Statistic::Median] {
            let id = &format!("aggregate_{}_{}", statistic, trials);
            c.bench_function(id, |b| {
                b.iter(|| aggregate(black_box(&table), statistic).unwrap())
            });
        }

        println!("[aggregate_{}] Rows: {}", trials, table.len());
    }
}

pub fn bench_speedup(c: &mut Criterion) {
    let table = assets::get_mergesort_results();
    let aggregates = aggregate(&table, Statistic::Mean).unwrap();

    c.bench_function("speedup_tile_thread", |b| {
        b.iter(|| {
            aggregates
                .speedup(black_box("Tile"), black_box("Thread"), SpeedupMode::Ratio)
                .unwrap()
        })
    });
}
