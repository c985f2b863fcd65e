//! Aggregation of clean samples into the pre-binning grid
//!
//! The two split arrays induce an `m x n` grid of right-open cells. Each
//! cell keeps the count, sum, mean and squared deviations of the target;
//! every later statistic is derived from these matrices.

use faer::Mat;
use serde::Serialize;

use super::prebin::CellBlock;

/// Interval index of `value`: the number of splits less than or equal to it.
///
/// With splits `s_0 < s_1 < ...`, index `k` is the interval `[s_{k-1}, s_k)`.
#[inline]
pub fn digitize(value: f64, splits: &[f64]) -> usize {
    splits.partition_point(|&s| s <= value)
}

/// Interval index of every value
pub fn digitize_all(values: &[f64], splits: &[f64]) -> Vec<usize> {
    values.iter().map(|&v| digitize(v, splits)).collect()
}

/// Sufficient statistics of a set of target values.
///
/// Spread is kept as `m2`, the sum of squared deviations from the running
/// mean, so that sets far from zero keep their variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CellStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub m2: f64,
}

impl CellStats {
    /// Statistics of a raw slice of target values
    pub fn from_values(values: &[f64]) -> Self {
        let mut stats = Self::default();
        for &v in values {
            stats.push(v);
        }
        stats
    }

    /// Welford update with one value
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Mean, or zero for an empty set
    pub fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }

    /// Population standard deviation, or zero for an empty set
    pub fn std(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sse() / self.count as f64).sqrt()
    }

    /// Within-set sum of squared deviations from the mean
    pub fn sse(&self) -> f64 {
        self.m2.max(0.0)
    }
}

impl std::ops::Add for CellStats {
    type Output = CellStats;

    /// Pairwise merge of two disjoint sets
    fn add(self, other: CellStats) -> CellStats {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;
        CellStats {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            mean: self.mean + delta * n_b / n,
            m2: self.m2 + other.m2 + delta * delta * n_a * n_b / n,
        }
    }
}

/// Per-cell count, sum, mean and squared-deviation matrices
#[derive(Debug, Clone)]
pub struct CellGrid {
    counts: Mat<f64>,
    sums: Mat<f64>,
    means: Mat<f64>,
    m2s: Mat<f64>,
}

impl CellGrid {
    /// Assign every clean sample to its cell and accumulate statistics.
    pub fn aggregate(splits_x: &[f64], splits_y: &[f64], x: &[f64], y: &[f64], z: &[f64]) -> Self {
        let m = splits_x.len() + 1;
        let n = splits_y.len() + 1;

        let mut counts = Mat::<f64>::zeros(m, n);
        let mut sums = Mat::<f64>::zeros(m, n);
        let mut means = Mat::<f64>::zeros(m, n);
        let mut m2s = Mat::<f64>::zeros(m, n);

        for ((&xi, &yi), &zi) in x.iter().zip(y).zip(z) {
            let cell = (digitize(xi, splits_x), digitize(yi, splits_y));
            counts[cell] += 1.0;
            sums[cell] += zi;
            let delta = zi - means[cell];
            means[cell] += delta / counts[cell];
            m2s[cell] += delta * (zi - means[cell]);
        }

        Self {
            counts,
            sums,
            means,
            m2s,
        }
    }

    /// Grid shape `(m, n)`: x pre-bins by y pre-bins
    pub fn shape(&self) -> (usize, usize) {
        (self.counts.nrows(), self.counts.ncols())
    }

    pub fn n_cells(&self) -> usize {
        self.counts.nrows() * self.counts.ncols()
    }

    pub fn cell(&self, i: usize, j: usize) -> CellStats {
        CellStats {
            count: self.counts[(i, j)] as usize,
            sum: self.sums[(i, j)],
            mean: self.means[(i, j)],
            m2: self.m2s[(i, j)],
        }
    }

    /// Statistics of the union of cells in `block`
    ///
    /// Cells are merged directly in row-major order so that the same block
    /// always yields bit-identical statistics.
    pub fn block(&self, block: &CellBlock) -> CellStats {
        let mut stats = CellStats::default();
        for i in block.x_start..=block.x_end {
            for j in block.y_start..=block.y_end {
                stats = stats + self.cell(i, j);
            }
        }
        stats
    }

    /// Statistics of the whole grid
    pub fn total(&self) -> CellStats {
        let (m, n) = self.shape();
        self.block(&CellBlock {
            x_start: 0,
            x_end: m - 1,
            y_start: 0,
            y_end: n - 1,
        })
    }
}
