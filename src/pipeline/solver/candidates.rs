//! Enumeration of candidate rectangles over the pre-binning grid
//!
//! Every candidate is a block of contiguous cells with its aggregated
//! statistics. Candidates live in an arena and are referenced by their
//! integer id everywhere else (cover lists, conflicts, selections).

use super::super::grid::{CellGrid, CellStats};
use super::super::prebin::{CellBlock, JointRefinement};

/// A feasible bin proposal
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Position in the candidate arena
    pub id: usize,
    pub block: CellBlock,
    pub stats: CellStats,
    /// Mean of the target, zero when empty
    pub mean: f64,
    /// Population standard deviation, zero when empty
    pub std: f64,
}

impl Candidate {
    /// Number of grid cells in the rectangle
    pub fn area(&self) -> usize {
        (self.block.x_end - self.block.x_start + 1) * (self.block.y_end - self.block.y_start + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.stats.count == 0
    }

    /// Row-major indices `i * n + j` of the covered cells
    pub fn cells(&self, n: usize) -> impl Iterator<Item = usize> + '_ {
        (self.block.x_start..=self.block.x_end)
            .flat_map(move |i| (self.block.y_start..=self.block.y_end).map(move |j| i * n + j))
    }
}

/// Number of axis-aligned rectangles of contiguous cells in an `m x n` grid
pub fn full_candidate_count(m: usize, n: usize) -> usize {
    m * n * (m + 1) * (n + 1) / 4
}

/// Enumerate candidate rectangles.
///
/// With a joint refinement only rectangles that do not cut through one of
/// its leaves are generated. Rectangles whose count lies outside
/// `[min_size, max_size]` are skipped.
pub fn enumerate_candidates(
    grid: &CellGrid,
    joint: Option<&JointRefinement>,
    min_size: Option<usize>,
    max_size: Option<usize>,
) -> Vec<Candidate> {
    let (m, n) = grid.shape();
    let mut candidates = Vec::new();

    for height in 1..=m {
        for width in 1..=n {
            for x_start in 0..=(m - height) {
                for y_start in 0..=(n - width) {
                    let block = CellBlock {
                        x_start,
                        x_end: x_start + height - 1,
                        y_start,
                        y_end: y_start + width - 1,
                    };

                    if let Some(joint) = joint {
                        if !joint.admits(&block) {
                            continue;
                        }
                    }

                    let stats = grid.block(&block);
                    if min_size.is_some_and(|min| stats.count < min)
                        || max_size.is_some_and(|max| stats.count > max)
                    {
                        continue;
                    }

                    candidates.push(Candidate {
                        id: candidates.len(),
                        block,
                        stats,
                        mean: stats.mean(),
                        std: stats.std(),
                    });
                }
            }
        }
    }

    candidates
}

/// Pairs `(lower, upper)` of candidates that touch along the x axis.
///
/// `upper` starts on the x pre-bin right after `lower` ends and the two
/// overlap on y.
pub fn connected_x(candidates: &[Candidate], m: usize) -> Vec<(usize, usize)> {
    connected_pairs(
        candidates,
        m,
        |b| (b.x_start, b.x_end),
        |b| (b.y_start, b.y_end),
    )
}

/// Pairs `(lower, upper)` of candidates that touch along the y axis.
pub fn connected_y(candidates: &[Candidate], n: usize) -> Vec<(usize, usize)> {
    connected_pairs(
        candidates,
        n,
        |b| (b.y_start, b.y_end),
        |b| (b.x_start, b.x_end),
    )
}

fn connected_pairs(
    candidates: &[Candidate],
    size: usize,
    along: impl Fn(&CellBlock) -> (usize, usize),
    across: impl Fn(&CellBlock) -> (usize, usize),
) -> Vec<(usize, usize)> {
    let mut by_start: Vec<Vec<usize>> = vec![Vec::new(); size];
    for c in candidates {
        by_start[along(&c.block).0].push(c.id);
    }

    let mut pairs = Vec::new();
    for lower in candidates {
        let (_, end) = along(&lower.block);
        if end + 1 >= size {
            continue;
        }
        let (lo_start, lo_end) = across(&lower.block);
        for &upper in &by_start[end + 1] {
            let (up_start, up_end) = across(&candidates[upper].block);
            if up_start <= lo_end && lo_start <= up_end {
                pairs.push((lower.id, upper));
            }
        }
    }
    pairs
}
