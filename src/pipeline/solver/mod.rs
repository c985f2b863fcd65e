//! Optimal tiling of the pre-binning grid
//!
//! The grid and the binning constraints are turned into [`ModelData`]: an
//! arena of candidate rectangles, the cells each one covers, monotonic
//! conflicts and an objective. A [`BinningSolver`] backend then selects the
//! subset of candidates that tiles the grid with the best objective:
//!
//! * `cp`: exact branch-and-bound over tilings on a rayon worker pool
//! * `mip`: binary program solved by HiGHS through good_lp

mod candidates;
mod cp;
mod mip;
mod model;
mod monotonicity;

use std::time::Duration;

use serde::Serialize;

use super::config::SolverKind;

pub use candidates::{connected_x, connected_y, enumerate_candidates, full_candidate_count, Candidate};
pub use cp::CpSolver;
pub use mip::MipSolver;
pub use model::{ModelData, ModelSettings};
pub use monotonicity::{parse_trend, MonotonicTrend};

/// Termination status reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverStatus {
    /// Best tiling found and proven optimal
    Optimal,
    /// A tiling was found but the time limit stopped the proof
    Feasible,
    /// No tiling satisfies the constraints
    Infeasible,
    /// The time limit was reached before any tiling was found
    TimeLimit,
    /// The backend failed
    Error,
}

impl SolverStatus {
    /// Whether a selection accompanies this status
    pub fn has_solution(&self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::Optimal => write!(f, "OPTIMAL"),
            SolverStatus::Feasible => write!(f, "FEASIBLE"),
            SolverStatus::Infeasible => write!(f, "INFEASIBLE"),
            SolverStatus::TimeLimit => write!(f, "TIME_LIMIT"),
            SolverStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Worker count and wall-clock budget handed to a backend
#[derive(Debug, Clone, Copy)]
pub struct SolveBudget {
    pub n_jobs: usize,
    pub time_limit: Duration,
}

impl SolveBudget {
    /// Budget from a time limit in seconds; out-of-range limits mean unbounded
    pub fn new(n_jobs: usize, time_limit_secs: f64) -> Self {
        Self {
            n_jobs: n_jobs.max(1),
            time_limit: Duration::try_from_secs_f64(time_limit_secs).unwrap_or(Duration::MAX),
        }
    }
}

/// Result of a solve
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub status: SolverStatus,
    /// One flag per candidate; empty when the status has no solution
    pub selection: Vec<bool>,
    pub objective: f64,
    pub elapsed: Duration,
}

impl SolverOutcome {
    pub(crate) fn with_selection(
        status: SolverStatus,
        model: &ModelData,
        selected: &[usize],
        elapsed: Duration,
    ) -> Self {
        let mut selection = vec![false; model.n_candidates()];
        for &r in selected {
            selection[r] = true;
        }
        Self {
            status,
            selection,
            objective: model.objective(selected),
            elapsed,
        }
    }

    pub(crate) fn without_solution(status: SolverStatus, elapsed: Duration) -> Self {
        Self {
            status,
            selection: Vec::new(),
            objective: f64::NAN,
            elapsed,
        }
    }

    /// Ids of the selected candidates in arena order
    pub fn selected_ids(&self) -> Vec<usize> {
        self.selection
            .iter()
            .enumerate()
            .filter_map(|(id, &on)| on.then_some(id))
            .collect()
    }
}

/// A combinatorial backend selecting a tiling from [`ModelData`]
pub trait BinningSolver: Send {
    fn name(&self) -> &'static str;

    /// Translate the model into the backend's own representation.
    fn build(&mut self, model: &ModelData);

    /// Run the search within `budget`. Calling before `build` yields `Error`.
    fn solve(&mut self, budget: &SolveBudget) -> SolverOutcome;
}

/// Backend implementing `kind`
pub fn solver_for(kind: SolverKind) -> Box<dyn BinningSolver> {
    match kind {
        SolverKind::Cp => Box::new(CpSolver::new()),
        SolverKind::Mip => Box::new(MipSolver::new()),
    }
}
