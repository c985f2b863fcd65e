//! Solver-ready model data
//!
//! Backends share one description of the selection problem: a binary choice
//! per candidate, every grid cell covered exactly once, the bin count kept
//! within bounds, pairwise conflicts from monotonic trends, and a linear
//! objective.

use super::super::grid::{CellGrid, CellStats};
use super::candidates::{connected_x, connected_y, full_candidate_count, Candidate};
use super::monotonicity::MonotonicTrend;

/// Constraint and objective settings consumed by [`ModelData::build`]
#[derive(Debug, Clone, Default)]
pub struct ModelSettings {
    pub min_n_bins: Option<usize>,
    pub max_n_bins: Option<usize>,
    pub monotonic_trend_x: Option<MonotonicTrend>,
    pub monotonic_trend_y: Option<MonotonicTrend>,
    pub min_mean_diff_x: f64,
    pub min_mean_diff_y: f64,
    pub gamma: f64,
}

/// Candidate arena plus the constraint structure over it
#[derive(Debug, Clone)]
pub struct ModelData {
    /// Grid shape `(m, n)`
    pub shape: (usize, usize),
    pub candidates: Vec<Candidate>,
    /// Candidate ids covering each row-major cell
    pub covers: Vec<Vec<usize>>,
    /// Objective coefficient of each candidate, bin penalty included
    pub weights: Vec<f64>,
    /// Explained-variance contribution of each single cell
    pub cell_values: Vec<f64>,
    /// Candidate pairs that may not be selected together
    pub conflicts: Vec<(usize, usize)>,
    pub n_connected_x: usize,
    pub n_connected_y: usize,
    pub min_n_bins: Option<usize>,
    pub max_n_bins: Option<usize>,
    pub gamma: f64,
}

/// Between-bin explained variance of one bin, normalized by the sample count
fn explained_variance(stats: &CellStats, n_total: usize) -> f64 {
    if stats.count == 0 || n_total == 0 {
        0.0
    } else {
        stats.sum * stats.sum / stats.count as f64 / n_total as f64
    }
}

impl ModelData {
    pub fn build(grid: &CellGrid, candidates: Vec<Candidate>, settings: &ModelSettings) -> Self {
        let (m, n) = grid.shape();
        let n_total = grid.total().count;

        let mut covers = vec![Vec::new(); m * n];
        for c in &candidates {
            for cell in c.cells(n) {
                covers[cell].push(c.id);
            }
        }

        let weights = candidates
            .iter()
            .map(|c| explained_variance(&c.stats, n_total) - settings.gamma)
            .collect();

        let cell_values = (0..m)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| explained_variance(&grid.cell(i, j), n_total))
            .collect();

        let pairs_x = connected_x(&candidates, m);
        let pairs_y = connected_y(&candidates, n);

        let mut conflicts = Vec::new();
        for (trend, diff, pairs) in [
            (settings.monotonic_trend_x, settings.min_mean_diff_x, &pairs_x),
            (settings.monotonic_trend_y, settings.min_mean_diff_y, &pairs_y),
        ] {
            let Some(trend) = trend else {
                continue;
            };
            for &(lower, upper) in pairs {
                let (a, b) = (&candidates[lower], &candidates[upper]);
                // Empty rectangles carry no mean
                if a.is_empty() || b.is_empty() {
                    continue;
                }
                if trend.violates(a.mean, b.mean, diff) {
                    conflicts.push((lower, upper));
                }
            }
        }

        Self {
            shape: (m, n),
            candidates,
            covers,
            weights,
            cell_values,
            conflicts,
            n_connected_x: pairs_x.len(),
            n_connected_y: pairs_y.len(),
            min_n_bins: settings.min_n_bins,
            max_n_bins: settings.max_n_bins,
            gamma: settings.gamma,
        }
    }

    pub fn n_cells(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    pub fn n_candidates(&self) -> usize {
        self.candidates.len()
    }

    /// Rectangles dropped from the full enumeration by refinement or size bounds
    pub fn n_refinements(&self) -> usize {
        full_candidate_count(self.shape.0, self.shape.1) - self.n_candidates()
    }

    /// True when some cell has no covering candidate, so no tiling exists
    pub fn has_uncoverable_cell(&self) -> bool {
        self.covers.iter().any(|c| c.is_empty())
    }

    /// Objective value of a set of selected candidate ids
    pub fn objective(&self, selected: &[usize]) -> f64 {
        selected.iter().map(|&r| self.weights[r]).sum()
    }

    /// Whether `selected` covers every cell exactly once and meets the
    /// bin-count bounds and the conflicts.
    pub fn is_feasible(&self, selected: &[usize]) -> bool {
        let mut coverage = vec![0usize; self.n_cells()];
        for &r in selected {
            for cell in self.candidates[r].cells(self.shape.1) {
                coverage[cell] += 1;
            }
        }
        if coverage.iter().any(|&c| c != 1) {
            return false;
        }

        let k = selected.len();
        if self.min_n_bins.is_some_and(|min| k < min) || self.max_n_bins.is_some_and(|max| k > max) {
            return false;
        }

        let mut chosen = vec![false; self.n_candidates()];
        for &r in selected {
            chosen[r] = true;
        }
        self.conflicts.iter().all(|&(a, b)| !(chosen[a] && chosen[b]))
    }
}

#[cfg(test)]
mod tests {
    use super::super::candidates::enumerate_candidates;
    use super::*;

    /// 2 x 1 grid: cell 0 holds z = {0, 0}, cell 1 holds z = {10, 10}
    fn step_grid() -> CellGrid {
        CellGrid::aggregate(&[0.0], &[], &[-1.0, -1.0, 1.0, 1.0], &[0.0; 4], &[0.0, 0.0, 10.0, 10.0])
    }

    #[test]
    fn test_covers_and_weights() {
        let grid = step_grid();
        let candidates = enumerate_candidates(&grid, None, None, None);
        let model = ModelData::build(&grid, candidates, &ModelSettings::default());

        assert_eq!(model.n_candidates(), 3);
        assert_eq!(model.covers[0].len(), 2);
        assert_eq!(model.covers[1].len(), 2);
        // 20^2 / 2 / 4 for the upper cell, 20^2 / 4 / 4 for the whole grid
        assert_eq!(model.cell_values, vec![0.0, 50.0]);
        let whole = model.candidates.iter().find(|c| c.area() == 2).unwrap().id;
        assert_eq!(model.weights[whole], 25.0);
    }

    #[test]
    fn test_gamma_penalizes_every_bin() {
        let grid = step_grid();
        let candidates = enumerate_candidates(&grid, None, None, None);
        let settings = ModelSettings {
            gamma: 1.5,
            ..Default::default()
        };
        let model = ModelData::build(&grid, candidates, &settings);
        let singles: Vec<usize> = model
            .candidates
            .iter()
            .filter(|c| c.area() == 1)
            .map(|c| c.id)
            .collect();
        assert_eq!(model.objective(&singles), 50.0 - 3.0);
    }

    #[test]
    fn test_descending_trend_creates_conflict() {
        let grid = step_grid();
        let candidates = enumerate_candidates(&grid, None, None, None);
        let settings = ModelSettings {
            monotonic_trend_x: Some(MonotonicTrend::Descending),
            ..Default::default()
        };
        let model = ModelData::build(&grid, candidates, &settings);
        assert_eq!(model.n_connected_x, 1);
        assert_eq!(model.conflicts.len(), 1);

        let singles: Vec<usize> = model
            .candidates
            .iter()
            .filter(|c| c.area() == 1)
            .map(|c| c.id)
            .collect();
        assert!(!model.is_feasible(&singles));

        let whole = model.candidates.iter().find(|c| c.area() == 2).unwrap().id;
        assert!(model.is_feasible(&[whole]));
    }

    #[test]
    fn test_ascending_trend_allows_step() {
        let grid = step_grid();
        let candidates = enumerate_candidates(&grid, None, None, None);
        let settings = ModelSettings {
            monotonic_trend_x: Some(MonotonicTrend::Ascending),
            min_mean_diff_x: 5.0,
            ..Default::default()
        };
        let model = ModelData::build(&grid, candidates, &settings);
        assert!(model.conflicts.is_empty());
    }

    #[test]
    fn test_feasibility_checks_tiling_and_counts() {
        let grid = step_grid();
        let candidates = enumerate_candidates(&grid, None, None, None);
        let settings = ModelSettings {
            min_n_bins: Some(2),
            ..Default::default()
        };
        let model = ModelData::build(&grid, candidates, &settings);
        let whole = model.candidates.iter().find(|c| c.area() == 2).unwrap().id;
        let first = model.covers[0].iter().copied().find(|&r| r != whole).unwrap();

        assert!(!model.is_feasible(&[whole]));
        assert!(!model.is_feasible(&[first]));
        assert!(!model.is_feasible(&[first, whole]));
        assert!(!model.has_uncoverable_cell());
    }
}
