//! Fit and transform orchestration for optimal 2D binning of a continuous target
//!
//! `fit` runs the stages in order: segmentation, per-axis pre-binning, grid
//! aggregation, model construction, solving and reconstruction. The fitted
//! state is replaced only once every stage has finished.

use std::time::{Duration, Instant};

use log::info;
use serde::Serialize;

use super::config::{BinningConfig, PartitionStrategy, SolverKind};
use super::error::BinningError;
use super::grid::{digitize_all, CellGrid, CellStats};
use super::prebin::{fit_prebinning, JointRefinement};
use super::reconstruct::{reconstruct, FittedBinning};
use super::segment::split_data;
use super::solver::{enumerate_candidates, solver_for, ModelData, ModelSettings, SolveBudget, SolverStatus};
use super::transform::{transform, TransformOptions, Transformed};

/// Largest grid the branch-and-bound backend handles without a warning
const CP_COMFORTABLE_CELLS: usize = 36;

/// Scale applied to the smaller pre-bin fraction for the joint refinement leaves
const JOINT_MIN_LEAF_SCALE: f64 = 0.25;

/// Diagnostics of the last fit
#[derive(Debug, Clone, Serialize)]
pub struct FitInfo {
    pub status: SolverStatus,
    pub solver: SolverKind,
    pub strategy: PartitionStrategy,
    pub n_samples: usize,
    pub n_clean: usize,
    pub n_missing: usize,
    pub n_special: usize,
    /// Pre-bins on each axis
    pub n_prebins_x: usize,
    pub n_prebins_y: usize,
    pub n_candidates: usize,
    pub n_refinements: usize,
    pub n_conflicts: usize,
    /// Objective of the selected tiling, if any
    pub objective: Option<f64>,
    pub time_preprocessing: f64,
    pub time_prebinning: f64,
    pub time_model_data: f64,
    pub time_solver: f64,
    pub time_postprocessing: f64,
    pub time_total: f64,
}

impl FitInfo {
    /// Number of grid cells
    pub fn n_prebins(&self) -> usize {
        self.n_prebins_x * self.n_prebins_y
    }
}

/// Optimal 2D binning of a continuous target over two numerical variables
#[derive(Debug, Clone)]
pub struct ContinuousOptimalBinning2D {
    config: BinningConfig,
    fitted: Option<FittedBinning>,
    info: Option<FitInfo>,
}

impl ContinuousOptimalBinning2D {
    /// Create an unfitted instance, validating the configuration.
    pub fn new(config: BinningConfig) -> Result<Self, BinningError> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: None,
            info: None,
        })
    }

    pub fn config(&self) -> &BinningConfig {
        &self.config
    }

    /// Solver status of the last fit, None before any fit
    pub fn status(&self) -> Option<SolverStatus> {
        self.info.as_ref().map(|info| info.status)
    }

    pub fn info(&self) -> Option<&FitInfo> {
        self.info.as_ref()
    }

    /// Fitted state; fails when no fit has produced a solution
    pub fn fitted(&self) -> Result<&FittedBinning, BinningError> {
        self.fitted.as_ref().ok_or(BinningError::NotFitted)
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Realized x split points
    pub fn splits_x(&self) -> Result<&[f64], BinningError> {
        Ok(&self.fitted()?.splits_x)
    }

    /// Realized y split points
    pub fn splits_y(&self) -> Result<&[f64], BinningError> {
        Ok(&self.fitted()?.splits_y)
    }

    /// Fit the binning on parallel x, y and z arrays.
    ///
    /// Returns the solver status. When it carries no solution the instance
    /// is left unfitted and the status explains why.
    pub fn fit(&mut self, x: &[f64], y: &[f64], z: &[f64]) -> Result<SolverStatus, BinningError> {
        let config = &self.config;
        let verbose = config.verbose;
        let time_init = Instant::now();

        if verbose {
            info!("Optimal binning started.");
            info!("Options: check parameters.");
        }
        config.validate()?;

        // Pre-processing
        if verbose {
            info!("Pre-processing started.");
        }
        let phase = Instant::now();
        let segments = split_data(
            x,
            y,
            z,
            &config.special_codes_x,
            &config.special_codes_y,
            config.check_input,
        )?;
        let clean = &segments.clean;
        let special_stats = CellStats::from_values(&segments.special.z);
        let missing_stats = CellStats::from_values(&segments.missing.z);
        let time_preprocessing = phase.elapsed();

        if verbose {
            info!("Pre-processing: number of samples: {}", z.len());
            info!("Pre-processing: number of clean samples: {}", clean.len());
            info!("Pre-processing: number of missing samples: {}", segments.missing.len());
            info!("Pre-processing: number of special samples: {}", segments.special.len());
            info!("Pre-processing terminated. Time: {:.4}s", time_preprocessing.as_secs_f64());
        }

        // Pre-binning
        if verbose {
            info!("Pre-binning started.");
        }
        let phase = Instant::now();
        let splits_x = fit_prebinning(
            config.prebinning_method,
            &clean.x,
            &clean.z,
            config.max_n_prebins_x,
            config.min_prebin_size_x,
            config.split_digits,
        );
        let splits_y = fit_prebinning(
            config.prebinning_method,
            &clean.y,
            &clean.z,
            config.max_n_prebins_y,
            config.min_prebin_size_y,
            config.split_digits,
        );
        let shape = (splits_x.len() + 1, splits_y.len() + 1);

        let joint = match config.strategy {
            PartitionStrategy::Cart if !clean.is_empty() => {
                let max_leaf_nodes = splits_x.len().max(1) * splits_y.len().max(1);
                let fraction = config.min_prebin_size_x.min(config.min_prebin_size_y);
                let min_samples_leaf =
                    (JOINT_MIN_LEAF_SCALE * fraction * clean.len() as f64).ceil() as usize;
                Some(JointRefinement::fit(
                    &digitize_all(&clean.x, &splits_x),
                    &digitize_all(&clean.y, &splits_y),
                    &clean.z,
                    shape,
                    max_leaf_nodes,
                    min_samples_leaf,
                ))
            }
            _ => None,
        };
        let time_prebinning = phase.elapsed();

        if verbose {
            info!("Pre-binning: number of prebins: {}", shape.0 * shape.1);
            info!("Pre-binning: number of x splits: {}", splits_x.len());
            info!("Pre-binning: number of y splits: {}", splits_y.len());
            if let Some(joint) = &joint {
                info!("Pre-binning: joint refinement leaves: {}", joint.leaves().len());
            }
            info!("Pre-binning terminated. Time: {:.4}s", time_prebinning.as_secs_f64());
        }

        // Model data
        if verbose {
            info!("Optimizer started.");
            info!("Optimizer: build model data...");
        }
        let phase = Instant::now();
        let grid = CellGrid::aggregate(&splits_x, &splits_y, &clean.x, &clean.y, &clean.z);
        let (min_size, max_size) = config.bin_size_bounds(clean.len());
        let candidates = enumerate_candidates(&grid, joint.as_ref(), min_size, max_size);
        let settings = ModelSettings {
            min_n_bins: config.min_n_bins,
            max_n_bins: config.max_n_bins,
            monotonic_trend_x: config.monotonic_trend_x,
            monotonic_trend_y: config.monotonic_trend_y,
            min_mean_diff_x: config.min_mean_diff_x,
            min_mean_diff_y: config.min_mean_diff_y,
            gamma: config.gamma,
        };
        let model = ModelData::build(&grid, candidates, &settings);
        let time_model_data = phase.elapsed();

        if verbose {
            info!("Optimizer: model data candidates: {}", model.n_candidates());
            info!(
                "Optimizer: connected pairs x/y: {}/{}, conflicts: {}",
                model.n_connected_x,
                model.n_connected_y,
                model.conflicts.len()
            );
            info!("Optimizer: model data terminated. Time: {:.4}s", time_model_data.as_secs_f64());
        }

        // Solve
        let budget = SolveBudget::new(config.effective_n_jobs(), config.time_limit);
        let mut solver = solver_for(config.solver);
        if config.solver == SolverKind::Cp && model.n_cells() > CP_COMFORTABLE_CELLS {
            log::warn!(
                "Branch and bound over {} cells may be slow; consider the mip solver",
                model.n_cells()
            );
        }
        if verbose {
            info!("Optimizer: {} solver with {} worker(s).", solver.name(), budget.n_jobs);
        }
        let phase = Instant::now();
        solver.build(&model);
        let outcome = solver.solve(&budget);
        let time_solver = phase.elapsed();

        if verbose {
            info!("Optimizer: status: {}", outcome.status);
            info!("Optimizer terminated. Time: {:.4}s", time_solver.as_secs_f64());
        }

        // Post-processing
        if verbose {
            info!("Post-processing started.");
        }
        let phase = Instant::now();
        let fitted = outcome.status.has_solution().then(|| {
            reconstruct(
                &model.candidates,
                &outcome.selection,
                &splits_x,
                &splits_y,
                &special_stats,
                &missing_stats,
            )
        });
        let time_postprocessing = phase.elapsed();

        let info = FitInfo {
            status: outcome.status,
            solver: config.solver,
            strategy: config.strategy,
            n_samples: z.len(),
            n_clean: clean.len(),
            n_missing: segments.missing.len(),
            n_special: segments.special.len(),
            n_prebins_x: shape.0,
            n_prebins_y: shape.1,
            n_candidates: model.n_candidates(),
            n_refinements: model.n_refinements(),
            n_conflicts: model.conflicts.len(),
            objective: outcome.status.has_solution().then_some(outcome.objective),
            time_preprocessing: secs(time_preprocessing),
            time_prebinning: secs(time_prebinning),
            time_model_data: secs(time_model_data),
            time_solver: secs(time_solver),
            time_postprocessing: secs(time_postprocessing),
            time_total: secs(time_init.elapsed()),
        };

        if verbose {
            match &fitted {
                Some(f) => info!("Post-processing: number of bins: {}", f.n_bins()),
                None => info!("Post-processing: no solution, binning left unfitted"),
            }
            info!("Post-processing terminated. Time: {:.4}s", info.time_postprocessing);
            info!("Optimal binning terminated. Status: {}. Time: {:.4}s", info.status, info.time_total);
        }

        let status = info.status;
        self.fitted = fitted;
        self.info = Some(info);
        Ok(status)
    }

    /// Map new (x, y) pairs to the requested metric of their bins.
    pub fn transform(&self, x: &[f64], y: &[f64], options: &TransformOptions) -> Result<Transformed, BinningError> {
        let fitted = self.fitted()?;
        transform(
            fitted,
            x,
            y,
            &self.config.special_codes_x,
            &self.config.special_codes_y,
            options,
        )
    }

    /// Fit on (x, y, z), then transform the same (x, y).
    pub fn fit_transform(
        &mut self,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        options: &TransformOptions,
    ) -> Result<Transformed, BinningError> {
        self.fit(x, y, z)?;
        self.transform(x, y, options)
    }
}

fn secs(duration: Duration) -> f64 {
    duration.as_secs_f64()
}
