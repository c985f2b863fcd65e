//! Binary program backend using HiGHS through good_lp
//!
//! One binary variable per candidate. Every cell must be covered exactly
//! once, the number of selected candidates is bounded, and each monotonic
//! conflict forbids selecting both members of the pair.

use std::time::Instant;

use good_lp::solvers::highs::{highs, HighsProblem};
use good_lp::solvers::SolutionStatus;
use good_lp::{constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable};

use super::model::ModelData;
use super::{BinningSolver, SolveBudget, SolverOutcome, SolverStatus};

/// Mixed-integer backend
#[derive(Default)]
pub struct MipSolver {
    program: Option<Program>,
}

enum Program {
    /// Some cell has no covering candidate
    Infeasible,
    Ready {
        problem: HighsProblem,
        vars: Vec<Variable>,
        model: ModelData,
    },
}

impl MipSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BinningSolver for MipSolver {
    fn name(&self) -> &'static str {
        "mip"
    }

    fn build(&mut self, model: &ModelData) {
        if model.n_cells() == 0 || model.has_uncoverable_cell() {
            self.program = Some(Program::Infeasible);
            return;
        }

        let mut problem_vars = ProblemVariables::new();
        let vars: Vec<Variable> = (0..model.n_candidates())
            .map(|_| problem_vars.add(variable().binary()))
            .collect();

        // Objective: explained variance minus the per-bin penalty
        let objective: Expression = vars
            .iter()
            .zip(&model.weights)
            .map(|(&var, &weight)| weight * var)
            .sum();

        let mut problem = problem_vars.maximise(objective).using(highs);

        // Each cell is covered by exactly one selected candidate
        for cover in &model.covers {
            let coverage: Expression = cover.iter().map(|&r| vars[r]).sum();
            problem = problem.with(constraint!(coverage == 1.0));
        }

        if let Some(min) = model.min_n_bins {
            let bin_count: Expression = vars.iter().copied().sum();
            problem = problem.with(constraint!(bin_count >= min as f64));
        }
        if let Some(max) = model.max_n_bins {
            let bin_count: Expression = vars.iter().copied().sum();
            problem = problem.with(constraint!(bin_count <= max as f64));
        }

        // Monotonic trend: conflicting neighbours cannot both be selected
        for &(a, b) in &model.conflicts {
            let pair: Expression = vars[a] + vars[b];
            problem = problem.with(constraint!(pair <= 1.0));
        }

        self.program = Some(Program::Ready {
            problem,
            vars,
            model: model.clone(),
        });
    }

    fn solve(&mut self, budget: &SolveBudget) -> SolverOutcome {
        let start = Instant::now();

        let (problem, vars, model) = match self.program.take() {
            Some(Program::Ready { problem, vars, model }) => (problem, vars, model),
            Some(Program::Infeasible) => {
                return SolverOutcome::without_solution(SolverStatus::Infeasible, start.elapsed());
            }
            None => return SolverOutcome::without_solution(SolverStatus::Error, start.elapsed()),
        };

        let time_limit = budget.time_limit.as_secs_f64();
        let problem = problem
            .set_time_limit(time_limit)
            .set_threads(budget.n_jobs as u32);

        match problem.solve() {
            Ok(solution) => {
                let elapsed = start.elapsed();
                let selected: Vec<usize> = vars
                    .iter()
                    .enumerate()
                    .filter(|(_, &var)| solution.value(var) > 0.5)
                    .map(|(r, _)| r)
                    .collect();

                let tiles = model.is_feasible(&selected);
                let status = solution_status(solution.status(), tiles);
                if !tiles {
                    if status == SolverStatus::Error {
                        log::warn!("MIP backend returned a selection that does not tile the grid");
                    }
                    return SolverOutcome::without_solution(status, elapsed);
                }
                SolverOutcome::with_selection(status, &model, &selected, elapsed)
            }
            Err(ResolutionError::Infeasible) => {
                SolverOutcome::without_solution(SolverStatus::Infeasible, start.elapsed())
            }
            Err(e) => {
                log::warn!("MIP backend failed: {}", e);
                SolverOutcome::without_solution(SolverStatus::Error, start.elapsed())
            }
        }
    }
}

/// Binning status of a HiGHS solution, given whether its selection tiles the grid.
///
/// HiGHS stops on its own gap tolerances and still reports the model optimal,
/// so a gap-limited solution counts as proven.
fn solution_status(status: SolutionStatus, tiles: bool) -> SolverStatus {
    let proven = matches!(status, SolutionStatus::Optimal | SolutionStatus::GapLimit);
    match (proven, tiles) {
        (true, true) => SolverStatus::Optimal,
        (false, true) => SolverStatus::Feasible,
        (false, false) => SolverStatus::TimeLimit,
        (true, false) => SolverStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::super::candidates::enumerate_candidates;
    use super::super::model::ModelSettings;
    use super::super::{CpSolver, MonotonicTrend};
    use super::*;
    use crate::pipeline::grid::CellGrid;

    fn checker_grid() -> CellGrid {
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut z = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..5 {
                    x.push(i as f64);
                    y.push(j as f64);
                    z.push(((i + 2 * j) % 4) as f64 * 3.0 + k as f64 * 0.2);
                }
            }
        }
        CellGrid::aggregate(&[0.5, 1.5], &[0.5, 1.5], &x, &y, &z)
    }

    fn model(settings: &ModelSettings) -> ModelData {
        let grid = checker_grid();
        let candidates = enumerate_candidates(&grid, None, None, None);
        ModelData::build(&grid, candidates, settings)
    }

    #[test]
    fn test_solve_before_build_is_error() {
        let mut solver = MipSolver::new();
        let outcome = solver.solve(&SolveBudget::new(1, 10.0));
        assert_eq!(outcome.status, SolverStatus::Error);
    }

    #[test]
    fn test_mip_and_cp_reach_same_objective() {
        for settings in [
            ModelSettings {
                gamma: 2.0,
                ..Default::default()
            },
            ModelSettings {
                max_n_bins: Some(4),
                monotonic_trend_y: Some(MonotonicTrend::Ascending),
                ..Default::default()
            },
        ] {
            let model = model(&settings);
            let budget = SolveBudget::new(1, 60.0);

            let mut mip = MipSolver::new();
            mip.build(&model);
            let mip_outcome = mip.solve(&budget);

            let mut cp = CpSolver::new();
            cp.build(&model);
            let cp_outcome = cp.solve(&budget);

            assert_eq!(mip_outcome.status, SolverStatus::Optimal);
            assert_eq!(cp_outcome.status, SolverStatus::Optimal);
            assert!(model.is_feasible(&mip_outcome.selected_ids()));
            assert!((mip_outcome.objective - cp_outcome.objective).abs() < 1e-6);
        }
    }

    #[test]
    fn test_untileable_candidates_are_infeasible() {
        let grid = checker_grid();
        // Only the 2 x 2 blocks hold exactly 20 samples and they cannot tile 3 x 3
        let candidates = enumerate_candidates(&grid, None, Some(20), Some(20));
        let model = ModelData::build(&grid, candidates, &ModelSettings::default());
        assert!(!model.has_uncoverable_cell());

        let mut solver = MipSolver::new();
        solver.build(&model);
        let outcome = solver.solve(&SolveBudget::new(1, 30.0));
        assert_eq!(outcome.status, SolverStatus::Infeasible);
        assert!(outcome.selection.is_empty());
    }

    #[test]
    fn test_uncoverable_cell_is_infeasible() {
        // The first cell alone holds more samples than the size bound allows
        let mut x = vec![0.0; 50];
        let mut y = vec![0.0; 50];
        let mut z = vec![1.0; 50];
        x.extend([1.0, 1.0, 0.0]);
        y.extend([0.0, 1.0, 1.0]);
        z.extend([2.0, 3.0, 4.0]);
        let grid = CellGrid::aggregate(&[0.5], &[0.5], &x, &y, &z);

        let candidates = enumerate_candidates(&grid, None, None, Some(10));
        let model = ModelData::build(&grid, candidates, &ModelSettings::default());
        assert!(model.has_uncoverable_cell());

        let mut solver = MipSolver::new();
        solver.build(&model);
        let outcome = solver.solve(&SolveBudget::new(1, 30.0));
        assert_eq!(outcome.status, SolverStatus::Infeasible);
    }

    #[test]
    fn test_status_follows_solver_not_clock() {
        assert_eq!(solution_status(SolutionStatus::Optimal, true), SolverStatus::Optimal);
        assert_eq!(solution_status(SolutionStatus::GapLimit, true), SolverStatus::Optimal);
        assert_eq!(solution_status(SolutionStatus::TimeLimit, true), SolverStatus::Feasible);
        assert_eq!(solution_status(SolutionStatus::TimeLimit, false), SolverStatus::TimeLimit);
        assert_eq!(solution_status(SolutionStatus::Optimal, false), SolverStatus::Error);
    }
}
