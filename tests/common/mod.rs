//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

use gridbin::pipeline::FittedBinning;

/// Parallel x/y/z arrays
pub struct Dataset {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn push(&mut self, x: f64, y: f64, z: f64) {
        self.x.push(x);
        self.y.push(y);
        self.z.push(z);
    }

    pub fn to_dataframe(&self) -> DataFrame {
        df! {
            "x" => &self.x,
            "y" => &self.y,
            "z" => &self.z,
        }
        .unwrap()
    }
}

/// Regular lattice `{0.5, 1.5, ..., 9.5}^2`, every point repeated `repeats` times
pub fn lattice(repeats: usize, target: impl Fn(f64, f64) -> f64) -> Dataset {
    let mut data = Dataset {
        x: Vec::new(),
        y: Vec::new(),
        z: Vec::new(),
    };
    for _ in 0..repeats {
        for i in 0..10 {
            for j in 0..10 {
                let x = i as f64 + 0.5;
                let y = j as f64 + 0.5;
                data.push(x, y, target(x, y));
            }
        }
    }
    data
}

/// Lattice whose target is 10 in the upper-right quadrant and 0 elsewhere.
///
/// Pre-binning splits both axes exactly at 5.
pub fn quadrant_dataset() -> Dataset {
    lattice(4, |x, y| if x >= 5.0 && y >= 5.0 { 10.0 } else { 0.0 })
}

/// Number of samples in the upper-right quadrant of [`quadrant_dataset`]
pub const QUADRANT_COUNT: usize = 100;

/// Uniform random points with a noisy additive target
pub fn noisy_dataset(seed: u64, n: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Dataset {
        x: Vec::with_capacity(n),
        y: Vec::with_capacity(n),
        z: Vec::with_capacity(n),
    };
    for _ in 0..n {
        let x: f64 = rng.gen_range(0.0..10.0);
        let y: f64 = rng.gen_range(0.0..10.0);
        let noise: f64 = rng.gen_range(-1.0..1.0);
        data.push(x, y, x + 2.0 * y + noise);
    }
    data
}

/// Uniform points on `[-5, 5)^2` whose target steps from 0 to 10 at `x = 0`,
/// plus uniform noise in `[-1, 1)`
pub fn step_dataset(seed: u64, n: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Dataset {
        x: Vec::with_capacity(n),
        y: Vec::with_capacity(n),
        z: Vec::with_capacity(n),
    };
    for _ in 0..n {
        let x: f64 = rng.gen_range(-5.0..5.0);
        let y: f64 = rng.gen_range(-5.0..5.0);
        let noise: f64 = rng.gen_range(-1.0..1.0);
        let step = if x > 0.0 { 10.0 } else { 0.0 };
        data.push(x, y, step + noise);
    }
    data
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that every grid cell maps to a clean bin and that each clean bin
/// owns at least one cell.
pub fn assert_exact_tiling(fitted: &FittedBinning) {
    let (m, n) = fitted.shape;
    assert_eq!(fitted.cell_bins.len(), m * n, "cell map does not cover the grid");
    for bin in 0..fitted.n_bins() {
        assert!(
            fitted.cell_bins.contains(&bin),
            "bin {} owns no grid cell",
            bin
        );
    }
    assert!(
        fitted.cell_bins.iter().all(|&b| b < fitted.n_bins()),
        "cell mapped outside the clean bins"
    );
}

/// Pairs `(lower, upper)` of clean bins that touch along x
pub fn x_adjacent_bins(fitted: &FittedBinning) -> Vec<(usize, usize)> {
    adjacent_bins(fitted, |b| b.x_interval, |b| b.y_interval)
}

/// Pairs `(lower, upper)` of clean bins that touch along y
pub fn y_adjacent_bins(fitted: &FittedBinning) -> Vec<(usize, usize)> {
    adjacent_bins(fitted, |b| b.y_interval, |b| b.x_interval)
}

fn adjacent_bins(
    fitted: &FittedBinning,
    along: impl Fn(&gridbin::pipeline::BinStats) -> Option<(f64, f64)>,
    across: impl Fn(&gridbin::pipeline::BinStats) -> Option<(f64, f64)>,
) -> Vec<(usize, usize)> {
    let bins = fitted.clean_bins();
    let mut pairs = Vec::new();
    for (a, lower) in bins.iter().enumerate() {
        for (b, upper) in bins.iter().enumerate() {
            let (Some((_, lower_end)), Some((upper_start, _))) = (along(lower), along(upper)) else {
                continue;
            };
            let (Some((la, lb)), Some((ua, ub))) = (across(lower), across(upper)) else {
                continue;
            };
            if lower_end == upper_start && la < ub && ua < lb {
                pairs.push((a, b));
            }
        }
    }
    pairs
}
