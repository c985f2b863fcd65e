//! Exact branch-and-bound over grid tilings
//!
//! Each search node covers the first uncovered cell (row-major) with a
//! candidate anchored there, so every tiling is visited at most once.
//! Branches are pruned by monotonic conflicts, bin-count bounds and an
//! admissible upper bound on the value of the uncovered cells. The first
//! level of the tree is distributed over a rayon pool that shares one
//! incumbent.
//!
//! The search is exponential in the number of cells. Grids up to about
//! 6 x 6 solve quickly; larger grids are better served by the MIP backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use rayon::prelude::*;

use super::model::ModelData;
use super::{BinningSolver, SolveBudget, SolverOutcome, SolverStatus};

/// Nodes visited between two deadline checks
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Branch-and-bound backend
#[derive(Debug, Default)]
pub struct CpSolver {
    search: Option<SearchModel>,
}

impl CpSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Backend-side view of the model
#[derive(Debug, Clone)]
struct SearchModel {
    data: ModelData,
    /// Covered cells of each candidate
    cells: Vec<Vec<usize>>,
    /// Candidates whose top-left cell is the given cell, largest gain first
    anchored: Vec<Vec<usize>>,
    /// Conflicting candidates of each candidate
    conflicts: Vec<Vec<usize>>,
    /// Objective share per covered cell of each candidate
    density: Vec<f64>,
    /// Upper bound on any tiling's objective share of each cell
    density_bound: Vec<f64>,
    min_bins: usize,
    max_bins: usize,
}

/// Mutable state of one depth-first worker
struct SearchState {
    covered: Vec<bool>,
    blocked: Vec<u32>,
    chosen: Vec<usize>,
    value: f64,
    density_left: f64,
    cell_value_left: f64,
    uncovered: usize,
    saved: Vec<(f64, f64, f64)>,
    /// Per-cell scratch for the fit-aware bound
    cell_best: Vec<f64>,
    nodes: u64,
}

/// Best tiling found so far, shared by all workers
struct Incumbent {
    value_bits: AtomicU64,
    best: Mutex<Option<(f64, Vec<usize>)>>,
    timed_out: AtomicBool,
    deadline: Option<Instant>,
}

impl Incumbent {
    fn new(deadline: Option<Instant>) -> Self {
        Self {
            value_bits: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
            best: Mutex::new(None),
            timed_out: AtomicBool::new(false),
            deadline,
        }
    }

    fn value(&self) -> f64 {
        f64::from_bits(self.value_bits.load(Ordering::Acquire))
    }

    fn offer(&self, value: f64, chosen: &[usize]) {
        let mut best = self.best.lock().unwrap_or_else(|e| e.into_inner());
        let improves = best.as_ref().map_or(true, |(current, _)| value > *current);
        if improves {
            *best = Some((value, chosen.to_vec()));
            self.value_bits.store(value.to_bits(), Ordering::Release);
        }
    }

    fn stopped(&self) -> bool {
        self.timed_out.load(Ordering::Relaxed)
    }

    fn check_deadline(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    fn into_best(self) -> Option<(f64, Vec<usize>)> {
        self.best.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl SearchModel {
    fn new(data: &ModelData) -> Self {
        let (m, n) = data.shape;
        let n_cells = m * n;

        let cells: Vec<Vec<usize>> = data.candidates.iter().map(|c| c.cells(n).collect()).collect();

        let density: Vec<f64> = data
            .candidates
            .iter()
            .map(|c| data.weights[c.id] / c.area() as f64)
            .collect();

        // Gain of a candidate over covering its cells with single-cell bins
        let gain: Vec<f64> = data
            .candidates
            .iter()
            .zip(&cells)
            .map(|(c, covered)| {
                let singles: f64 = covered.iter().map(|&cell| data.cell_values[cell] - data.gamma).sum();
                data.weights[c.id] - singles
            })
            .collect();

        let mut anchored = vec![Vec::new(); n_cells];
        for c in &data.candidates {
            anchored[c.block.x_start * n + c.block.y_start].push(c.id);
        }
        for list in &mut anchored {
            list.sort_by(|&a, &b| gain[b].total_cmp(&gain[a]).then(a.cmp(&b)));
        }

        let mut conflicts = vec![Vec::new(); data.n_candidates()];
        for &(a, b) in &data.conflicts {
            conflicts[a].push(b);
            conflicts[b].push(a);
        }

        let density_bound = data
            .covers
            .iter()
            .map(|cover| {
                cover
                    .iter()
                    .map(|&r| density[r])
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();

        Self {
            data: data.clone(),
            cells,
            anchored,
            conflicts,
            density,
            density_bound,
            min_bins: data.min_n_bins.unwrap_or(0),
            max_bins: data.max_n_bins.unwrap_or(usize::MAX),
        }
    }

    fn initial_state(&self) -> SearchState {
        SearchState {
            covered: vec![false; self.data.n_cells()],
            blocked: vec![0; self.data.n_candidates()],
            chosen: Vec::new(),
            value: 0.0,
            density_left: self.density_bound.iter().sum(),
            cell_value_left: self.data.cell_values.iter().sum(),
            uncovered: self.data.n_cells(),
            saved: Vec::new(),
            cell_best: vec![f64::NEG_INFINITY; self.data.n_cells()],
            nodes: 0,
        }
    }

    fn fits(&self, state: &SearchState, r: usize) -> bool {
        state.blocked[r] == 0 && self.cells[r].iter().all(|&c| !state.covered[c])
    }

    fn apply(&self, state: &mut SearchState, r: usize) {
        state.saved.push((state.value, state.density_left, state.cell_value_left));
        for &c in &self.cells[r] {
            state.covered[c] = true;
            state.density_left -= self.density_bound[c];
            state.cell_value_left -= self.data.cell_values[c];
        }
        for &other in &self.conflicts[r] {
            state.blocked[other] += 1;
        }
        state.value += self.data.weights[r];
        state.uncovered -= self.cells[r].len();
        state.chosen.push(r);
    }

    fn undo(&self, state: &mut SearchState, r: usize) {
        for &c in &self.cells[r] {
            state.covered[c] = false;
        }
        for &other in &self.conflicts[r] {
            state.blocked[other] -= 1;
        }
        state.uncovered += self.cells[r].len();
        state.chosen.pop();
        if let Some((value, density_left, cell_value_left)) = state.saved.pop() {
            state.value = value;
            state.density_left = density_left;
            state.cell_value_left = cell_value_left;
        }
    }

    /// Upper bound on the objective still obtainable from uncovered cells.
    ///
    /// Merging cells never increases explained variance, so the sum of
    /// single-cell values bounds any tiling of the remaining cells.
    fn bound(&self, state: &SearchState) -> f64 {
        let bins_needed = self.min_bins.saturating_sub(state.chosen.len()).max(1);
        let by_cells = state.cell_value_left - self.data.gamma * bins_needed as f64;
        state.density_left.min(by_cells)
    }

    /// Bound that only counts candidates still placeable at this node.
    ///
    /// Each uncovered cell takes the best density among unblocked candidates
    /// lying wholly on uncovered cells. Returns negative infinity when some
    /// uncovered cell can no longer be covered.
    fn fit_aware_bound(&self, state: &mut SearchState) -> f64 {
        let n_cells = state.covered.len();
        state.cell_best.iter_mut().for_each(|v| *v = f64::NEG_INFINITY);

        // Any candidate covering an uncovered cell is anchored at an uncovered cell
        for anchor in 0..n_cells {
            if state.covered[anchor] {
                continue;
            }
            for &r in &self.anchored[anchor] {
                if !self.fits(state, r) {
                    continue;
                }
                let d = self.density[r];
                for &c in &self.cells[r] {
                    if d > state.cell_best[c] {
                        state.cell_best[c] = d;
                    }
                }
            }
        }

        let mut total = 0.0;
        for c in 0..n_cells {
            if state.covered[c] {
                continue;
            }
            let best = state.cell_best[c];
            if best == f64::NEG_INFINITY {
                return f64::NEG_INFINITY;
            }
            total += best;
        }
        total
    }

    fn search(&self, state: &mut SearchState, cursor: usize, incumbent: &Incumbent) {
        if incumbent.stopped() {
            return;
        }
        state.nodes += 1;
        if state.nodes % DEADLINE_CHECK_INTERVAL == 0 && incumbent.check_deadline() {
            return;
        }

        let Some(cell) = (cursor..state.covered.len()).find(|&c| !state.covered[c]) else {
            if state.chosen.len() >= self.min_bins {
                incumbent.offer(state.value, &state.chosen);
            }
            return;
        };

        if state.chosen.len() >= self.max_bins || state.chosen.len() + state.uncovered < self.min_bins {
            return;
        }
        if state.value + self.bound(state) <= incumbent.value() {
            return;
        }
        if state.value + self.fit_aware_bound(state) <= incumbent.value() {
            return;
        }

        for &r in &self.anchored[cell] {
            if self.fits(state, r) {
                self.apply(state, r);
                self.search(state, cell + 1, incumbent);
                self.undo(state, r);
            }
        }
    }

    fn run(&self, n_jobs: usize, incumbent: &Incumbent) {
        let first = &self.anchored[0];
        let branch = |r: usize| {
            let mut state = self.initial_state();
            if self.fits(&state, r) {
                self.apply(&mut state, r);
                self.search(&mut state, 1, incumbent);
            }
        };

        if n_jobs > 1 && first.len() > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(n_jobs).build() {
                Ok(pool) => pool.install(|| first.par_iter().for_each(|&r| branch(r))),
                Err(e) => {
                    log::warn!("Could not start {} search workers, searching sequentially: {}", n_jobs, e);
                    first.iter().for_each(|&r| branch(r));
                }
            }
        } else {
            first.iter().for_each(|&r| branch(r));
        }
    }
}

impl BinningSolver for CpSolver {
    fn name(&self) -> &'static str {
        "cp"
    }

    fn build(&mut self, model: &ModelData) {
        self.search = Some(SearchModel::new(model));
    }

    fn solve(&mut self, budget: &SolveBudget) -> SolverOutcome {
        let start = Instant::now();
        let Some(search) = self.search.as_ref() else {
            return SolverOutcome::without_solution(SolverStatus::Error, start.elapsed());
        };

        if search.data.n_cells() == 0 || search.data.has_uncoverable_cell() {
            return SolverOutcome::without_solution(SolverStatus::Infeasible, start.elapsed());
        }

        let incumbent = Incumbent::new(start.checked_add(budget.time_limit));
        search.run(budget.n_jobs, &incumbent);

        let timed_out = incumbent.stopped();
        let best = incumbent.into_best();
        let elapsed = start.elapsed();

        match (best, timed_out) {
            (Some((_, chosen)), false) => {
                SolverOutcome::with_selection(SolverStatus::Optimal, &search.data, &chosen, elapsed)
            }
            (Some((_, chosen)), true) => {
                SolverOutcome::with_selection(SolverStatus::Feasible, &search.data, &chosen, elapsed)
            }
            (None, true) => SolverOutcome::without_solution(SolverStatus::TimeLimit, elapsed),
            (None, false) => SolverOutcome::without_solution(SolverStatus::Infeasible, elapsed),
        }
    }
}
