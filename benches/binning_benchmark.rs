//! Benchmark of 2D binning fits across grid sizes, solvers and strategies
//!
//! Run with: cargo bench --bench binning_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use gridbin::pipeline::{
    BinningConfig, ContinuousOptimalBinning2D, MonotonicTrend, PartitionStrategy, SolverKind,
};

/// Generate synthetic (x, y, z) data with an interaction between the axes
fn generate_data(n_rows: usize, seed: u64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let x: Vec<f64> = (0..n_rows).map(|_| rng.gen::<f64>() * 100.0).collect();
    let y: Vec<f64> = (0..n_rows)
        .map(|_| {
            let v = rng.gen::<f64>();
            (v * v) * 50.0 // Right-skewed
        })
        .collect();
    let z: Vec<f64> = x
        .iter()
        .zip(&y)
        .map(|(&xi, &yi)| {
            let interaction = if xi > 50.0 && yi > 10.0 { 25.0 } else { 0.0 };
            0.2 * xi + 0.5 * yi + interaction + rng.gen::<f64>() * 10.0
        })
        .collect();

    (x, y, z)
}

fn run_fit(config: &BinningConfig, data: &(Vec<f64>, Vec<f64>, Vec<f64>)) {
    if let Ok(mut binning) = ContinuousOptimalBinning2D::new(config.clone()) {
        let _ = binning.fit(black_box(&data.0), black_box(&data.1), black_box(&data.2));
    }
}

/// Benchmark grid sizes for both solver backends
fn benchmark_grid_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_sizes");
    group.sample_size(10);

    let data = generate_data(10_000, 42);

    for prebins in [3usize, 4, 5] {
        for solver in [SolverKind::Cp, SolverKind::Mip] {
            let config = BinningConfig {
                max_n_prebins_x: prebins,
                max_n_prebins_y: prebins,
                solver,
                gamma: 0.01,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(solver.to_string(), format!("{}x{}", prebins, prebins)),
                &config,
                |b, config| b.iter(|| run_fit(config, &data)),
            );
        }
    }

    group.finish();
}

/// Benchmark sample counts with a fixed grid
fn benchmark_sample_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_sizes");
    group.sample_size(10);

    let config = BinningConfig::default();

    for n_rows in [1_000usize, 10_000, 100_000] {
        let data = generate_data(n_rows, 7);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &data, |b, data| {
            b.iter(|| run_fit(&config, data))
        });
    }

    group.finish();
}

/// Benchmark the joint refinement against full enumeration
fn benchmark_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    group.sample_size(10);

    let data = generate_data(10_000, 11);

    for strategy in [PartitionStrategy::Grid, PartitionStrategy::Cart] {
        let config = BinningConfig {
            strategy,
            ..Default::default()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy),
            &config,
            |b, config| b.iter(|| run_fit(config, &data)),
        );
    }

    group.finish();
}

/// Benchmark the cost of monotonic trend constraints
fn benchmark_monotonicity_impact(c: &mut Criterion) {
    let mut group = c.benchmark_group("monotonicity");
    group.sample_size(10);

    let data = generate_data(10_000, 23);

    let cases = [
        ("none", None, None),
        ("ascending_x", Some(MonotonicTrend::Ascending), None),
        (
            "ascending_xy",
            Some(MonotonicTrend::Ascending),
            Some(MonotonicTrend::Ascending),
        ),
    ];

    for (name, trend_x, trend_y) in cases {
        let config = BinningConfig {
            monotonic_trend_x: trend_x,
            monotonic_trend_y: trend_y,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            b.iter(|| run_fit(config, &data))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_grid_sizes,
    benchmark_sample_sizes,
    benchmark_strategies,
    benchmark_monotonicity_impact,
);
criterion_main!(benches);
