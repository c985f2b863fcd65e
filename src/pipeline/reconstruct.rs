//! Conversion of a solver selection into the fitted binning
//!
//! The selected candidates are laid over the grid to build the cell to bin
//! map, per-bin statistics are recomputed from the merged cell statistics,
//! and the split arrays are reduced to the boundaries the tiling actually
//! uses.

use serde::Serialize;

use super::grid::{digitize, CellStats};
use super::solver::{full_candidate_count, Candidate};

const UNASSIGNED: usize = usize::MAX;

/// Kind of entry in the bin table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinKind {
    /// A rectangle of the grid
    Clean,
    /// Samples carrying a special code on either axis
    Special,
    /// Samples with a non-finite coordinate
    Missing,
}

/// Statistics of one final bin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinStats {
    pub kind: BinKind,
    /// Right-open x interval; None for the virtual bins
    pub x_interval: Option<(f64, f64)>,
    /// Right-open y interval; None for the virtual bins
    pub y_interval: Option<(f64, f64)>,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub std: f64,
}

impl BinStats {
    fn from_stats(
        kind: BinKind,
        x_interval: Option<(f64, f64)>,
        y_interval: Option<(f64, f64)>,
        stats: &CellStats,
    ) -> Self {
        Self {
            kind,
            x_interval,
            y_interval,
            count: stats.count,
            sum: stats.sum,
            // Recomputed from count and sum, never taken from the candidate
            mean: stats.mean(),
            std: stats.std(),
        }
    }
}

/// Immutable state of a fitted 2D binning
#[derive(Debug, Clone, Serialize)]
pub struct FittedBinning {
    /// Grid shape `(m, n)`
    pub shape: (usize, usize),
    /// Pre-binning splits that define the grid
    pub prebin_splits_x: Vec<f64>,
    pub prebin_splits_y: Vec<f64>,
    /// Splits realized by the optimal tiling
    pub splits_x: Vec<f64>,
    pub splits_y: Vec<f64>,
    /// Clean bin index of every row-major cell
    pub cell_bins: Vec<usize>,
    /// Clean bins followed by the special and missing virtual bins
    pub bins: Vec<BinStats>,
    /// Rectangles removed from the full enumeration before solving
    pub n_refinements: usize,
}

impl FittedBinning {
    /// Number of clean bins
    pub fn n_bins(&self) -> usize {
        self.bins.len() - 2
    }

    pub fn clean_bins(&self) -> &[BinStats] {
        &self.bins[..self.n_bins()]
    }

    pub fn special(&self) -> &BinStats {
        &self.bins[self.bins.len() - 2]
    }

    pub fn missing(&self) -> &BinStats {
        &self.bins[self.bins.len() - 1]
    }

    /// Clean bin index of a finite (x, y) pair
    pub fn bin_of(&self, x: f64, y: f64) -> usize {
        let i = digitize(x, &self.prebin_splits_x);
        let j = digitize(y, &self.prebin_splits_y);
        self.cell_bins[i * self.shape.1 + j]
    }
}

/// Build the fitted binning from a selection over `candidates`.
///
/// # Panics
///
/// Panics when the selected candidates do not tile the grid exactly. This
/// means the solver returned a selection violating the model.
pub fn reconstruct(
    candidates: &[Candidate],
    selection: &[bool],
    prebin_splits_x: &[f64],
    prebin_splits_y: &[f64],
    special: &CellStats,
    missing: &CellStats,
) -> FittedBinning {
    let m = prebin_splits_x.len() + 1;
    let n = prebin_splits_y.len() + 1;
    assert_eq!(selection.len(), candidates.len(), "selection does not match candidates");

    let edges_x = edges(prebin_splits_x);
    let edges_y = edges(prebin_splits_y);

    let mut cell_bins = vec![UNASSIGNED; m * n];
    let mut bins = Vec::new();

    for candidate in candidates.iter().filter(|c| selection[c.id]) {
        let bin = bins.len();
        for cell in candidate.cells(n) {
            assert_eq!(cell_bins[cell], UNASSIGNED, "cell {} covered by more than one bin", cell);
            cell_bins[cell] = bin;
        }

        let block = candidate.block;
        bins.push(BinStats::from_stats(
            BinKind::Clean,
            Some((edges_x[block.x_start], edges_x[block.x_end + 1])),
            Some((edges_y[block.y_start], edges_y[block.y_end + 1])),
            &candidate.stats,
        ));
    }

    assert!(
        cell_bins.iter().all(|&b| b != UNASSIGNED),
        "selection leaves grid cells uncovered"
    );

    bins.push(BinStats::from_stats(BinKind::Special, None, None, special));
    bins.push(BinStats::from_stats(BinKind::Missing, None, None, missing));

    let splits_x = (0..m.saturating_sub(1))
        .filter(|&k| (0..n).any(|j| cell_bins[k * n + j] != cell_bins[(k + 1) * n + j]))
        .map(|k| prebin_splits_x[k])
        .collect();
    let splits_y = (0..n.saturating_sub(1))
        .filter(|&k| (0..m).any(|i| cell_bins[i * n + k] != cell_bins[i * n + k + 1]))
        .map(|k| prebin_splits_y[k])
        .collect();

    FittedBinning {
        shape: (m, n),
        prebin_splits_x: prebin_splits_x.to_vec(),
        prebin_splits_y: prebin_splits_y.to_vec(),
        splits_x,
        splits_y,
        cell_bins,
        bins,
        n_refinements: full_candidate_count(m, n) - candidates.len(),
    }
}

/// Interval edges `[-inf, s_0, ..., s_k, inf]`
fn edges(splits: &[f64]) -> Vec<f64> {
    std::iter::once(f64::NEG_INFINITY)
        .chain(splits.iter().copied())
        .chain(std::iter::once(f64::INFINITY))
        .collect()
}
