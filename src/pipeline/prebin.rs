//! Per-axis pre-binning and the optional joint refinement over the grid
//!
//! Each axis is discretized independently into at most `max_bins` intervals.
//! The joint refinement is a shallow two-feature regression tree fit on the
//! (x pre-bin, y pre-bin) indices; its leaves restrict which rectangles the
//! optimizer may consider, without changing the split arrays.

use super::config::PrebinningMethod;
use super::tree::fit_tree;

/// Proposes split points for one axis
pub trait AxisPrebinner {
    /// Return strictly increasing split points inducing at most `max_bins`
    /// intervals, each holding at least `ceil(min_bin_fraction * n)` samples.
    fn discretize(&self, values: &[f64], target: &[f64], max_bins: usize, min_bin_fraction: f64)
        -> Vec<f64>;
}

/// Regression tree splits maximizing squared-error reduction
#[derive(Debug, Clone, Copy, Default)]
pub struct CartPrebinner;

/// Equal-frequency splits
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantilePrebinner;

/// Equal-width splits
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformPrebinner;

fn min_leaf_count(min_bin_fraction: f64, n: usize) -> usize {
    ((min_bin_fraction * n as f64).ceil() as usize).max(1)
}

impl AxisPrebinner for CartPrebinner {
    fn discretize(
        &self,
        values: &[f64],
        target: &[f64],
        max_bins: usize,
        min_bin_fraction: f64,
    ) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }
        let min_leaf = min_leaf_count(min_bin_fraction, values.len());
        fit_tree(&[values], target, max_bins, min_leaf).thresholds(0)
    }
}

impl AxisPrebinner for QuantilePrebinner {
    fn discretize(
        &self,
        values: &[f64],
        _target: &[f64],
        max_bins: usize,
        min_bin_fraction: f64,
    ) -> Vec<f64> {
        if values.is_empty() || max_bins < 2 {
            return Vec::new();
        }
        let sorted = sorted_values(values);
        let n = sorted.len();

        let splits: Vec<f64> = (1..max_bins)
            .map(|k| {
                // Linear interpolation between closest ranks
                let position = k as f64 / max_bins as f64 * (n - 1) as f64;
                let lower = position.floor() as usize;
                let upper = (lower + 1).min(n - 1);
                let weight = position - lower as f64;
                sorted[lower] + weight * (sorted[upper] - sorted[lower])
            })
            .collect();

        let min_leaf = min_leaf_count(min_bin_fraction, n);
        enforce_min_leaf(&sorted, clean_splits(splits, &sorted), min_leaf)
    }
}

impl AxisPrebinner for UniformPrebinner {
    fn discretize(
        &self,
        values: &[f64],
        _target: &[f64],
        max_bins: usize,
        min_bin_fraction: f64,
    ) -> Vec<f64> {
        if values.is_empty() || max_bins < 2 {
            return Vec::new();
        }
        let sorted = sorted_values(values);
        let (lo, hi) = (sorted[0], sorted[sorted.len() - 1]);
        if lo == hi {
            return Vec::new();
        }

        let width = (hi - lo) / max_bins as f64;
        let splits: Vec<f64> = (1..max_bins).map(|k| lo + k as f64 * width).collect();

        let min_leaf = min_leaf_count(min_bin_fraction, sorted.len());
        enforce_min_leaf(&sorted, clean_splits(splits, &sorted), min_leaf)
    }
}

/// Prebinner implementing `method`
pub fn prebinner_for(method: PrebinningMethod) -> Box<dyn AxisPrebinner + Send + Sync> {
    match method {
        PrebinningMethod::Quantile => Box::new(QuantilePrebinner),
        PrebinningMethod::Uniform => Box::new(UniformPrebinner),
        // Mdlp is rejected by configuration validation
        PrebinningMethod::Cart | PrebinningMethod::Mdlp => Box::new(CartPrebinner),
    }
}

/// Discretize one axis and round the splits to `split_digits` decimals.
pub fn fit_prebinning(
    method: PrebinningMethod,
    values: &[f64],
    target: &[f64],
    max_bins: usize,
    min_bin_fraction: f64,
    split_digits: Option<u32>,
) -> Vec<f64> {
    let splits = prebinner_for(method).discretize(values, target, max_bins, min_bin_fraction);

    match split_digits {
        Some(digits) => round_splits(&splits, digits),
        None => splits,
    }
}

/// Round to `digits` decimals, keeping the result strictly increasing
pub fn round_splits(splits: &[f64], digits: u32) -> Vec<f64> {
    let scale = 10f64.powi(digits as i32);
    let mut rounded: Vec<f64> = splits.iter().map(|s| (s * scale).round() / scale).collect();
    rounded.sort_by(|a, b| a.total_cmp(b));
    rounded.dedup();
    rounded
}

fn sorted_values(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Deduplicate and drop splits that would leave the first interval empty
fn clean_splits(mut splits: Vec<f64>, sorted: &[f64]) -> Vec<f64> {
    splits.sort_by(|a, b| a.total_cmp(b));
    splits.dedup();
    splits.retain(|&s| s > sorted[0] && s <= sorted[sorted.len() - 1]);
    splits
}

/// Drop splits until every interval holds at least `min_leaf` samples.
///
/// Intervals are right-open: values below a split fall to its left.
fn enforce_min_leaf(sorted: &[f64], splits: Vec<f64>, min_leaf: usize) -> Vec<f64> {
    let mut kept = Vec::with_capacity(splits.len());
    let mut start = 0;

    for split in splits {
        let end = sorted.partition_point(|&v| v < split);
        if end - start >= min_leaf {
            kept.push(split);
            start = end;
        }
    }

    if sorted.len() - start < min_leaf {
        kept.pop();
    }

    kept
}

/// A block of grid cells, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBlock {
    pub x_start: usize,
    pub x_end: usize,
    pub y_start: usize,
    pub y_end: usize,
}

/// Leaves of a joint regression tree over (x pre-bin, y pre-bin) indices.
///
/// The leaves tile the `m x n` grid.
#[derive(Debug, Clone)]
pub struct JointRefinement {
    leaves: Vec<CellBlock>,
}

impl JointRefinement {
    /// Fit the joint tree on per-sample cell coordinates.
    pub fn fit(
        cell_x: &[usize],
        cell_y: &[usize],
        target: &[f64],
        shape: (usize, usize),
        max_leaf_nodes: usize,
        min_samples_leaf: usize,
    ) -> Self {
        let (m, n) = shape;
        let xt: Vec<f64> = cell_x.iter().map(|&i| i as f64).collect();
        let yt: Vec<f64> = cell_y.iter().map(|&j| j as f64).collect();

        let tree = fit_tree(&[&xt, &yt], target, max_leaf_nodes, min_samples_leaf);

        let to_range = |(lower, upper): (f64, f64), size: usize| -> (usize, usize) {
            let start = if lower.is_finite() { lower.ceil().max(0.0) as usize } else { 0 };
            let end = if upper.is_finite() {
                ((upper.ceil() as usize).saturating_sub(1)).min(size - 1)
            } else {
                size - 1
            };
            (start, end)
        };

        let leaves = tree
            .leaves()
            .iter()
            .map(|leaf| {
                let (x_start, x_end) = to_range(leaf.bounds[0], m);
                let (y_start, y_end) = to_range(leaf.bounds[1], n);
                CellBlock {
                    x_start,
                    x_end,
                    y_start,
                    y_end,
                }
            })
            .collect();

        Self { leaves }
    }

    pub fn leaves(&self) -> &[CellBlock] {
        &self.leaves
    }

    /// True when `block` does not cut through any leaf.
    pub fn admits(&self, block: &CellBlock) -> bool {
        self.leaves.iter().all(|leaf| {
            let disjoint = leaf.x_end < block.x_start
                || leaf.x_start > block.x_end
                || leaf.y_end < block.y_start
                || leaf.y_start > block.y_end;
            let inside = leaf.x_start >= block.x_start
                && leaf.x_end <= block.x_end
                && leaf.y_start >= block.y_start
                && leaf.y_end <= block.y_end;
            disjoint || inside
        })
    }
}
