//! Configuration surface for 2D optimal binning
//!
//! Every option is validated eagerly by [`BinningConfig::validate`], before
//! any data is touched.

use serde::Serialize;

use super::error::BinningError;
use super::solver::MonotonicTrend;

/// Data type of a binning axis. Only numerical axes are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Dtype {
    #[default]
    Numerical,
    Categorical,
}

impl std::fmt::Display for Dtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dtype::Numerical => write!(f, "numerical"),
            Dtype::Categorical => write!(f, "categorical"),
        }
    }
}

impl std::str::FromStr for Dtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "numerical" => Ok(Dtype::Numerical),
            "categorical" => Ok(Dtype::Categorical),
            _ => Err(format!(
                "Unknown dtype: '{}'. Use 'numerical'.",
                s
            )),
        }
    }
}

/// Method used to discretize each axis before optimization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PrebinningMethod {
    /// Regression tree splits that maximize squared-error reduction (default)
    #[default]
    Cart,
    /// Minimum description length; requires a categorical target
    Mdlp,
    /// Equal-frequency cut points
    Quantile,
    /// Equal-width cut points
    Uniform,
}

impl std::fmt::Display for PrebinningMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrebinningMethod::Cart => write!(f, "cart"),
            PrebinningMethod::Mdlp => write!(f, "mdlp"),
            PrebinningMethod::Quantile => write!(f, "quantile"),
            PrebinningMethod::Uniform => write!(f, "uniform"),
        }
    }
}

impl std::str::FromStr for PrebinningMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cart" => Ok(PrebinningMethod::Cart),
            "mdlp" => Ok(PrebinningMethod::Mdlp),
            "quantile" => Ok(PrebinningMethod::Quantile),
            "uniform" => Ok(PrebinningMethod::Uniform),
            _ => Err(format!(
                "Unknown prebinning method: '{}'. Use 'cart', 'quantile' or 'uniform'.",
                s
            )),
        }
    }
}

/// How candidate rectangles are generated from the pre-binning grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PartitionStrategy {
    /// Every axis-aligned rectangle of contiguous cells (exact)
    #[default]
    Grid,
    /// Only rectangles compatible with a joint regression tree over the grid
    Cart,
}

impl std::fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionStrategy::Grid => write!(f, "grid"),
            PartitionStrategy::Cart => write!(f, "cart"),
        }
    }
}

impl std::str::FromStr for PartitionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(PartitionStrategy::Grid),
            "cart" => Ok(PartitionStrategy::Cart),
            _ => Err(format!("Unknown strategy: '{}'. Use 'grid' or 'cart'.", s)),
        }
    }
}

/// Combinatorial backend used to select the optimal tiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SolverKind {
    /// Built-in branch-and-bound search over tilings
    #[default]
    Cp,
    /// Binary program solved by HiGHS
    Mip,
}

impl std::fmt::Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverKind::Cp => write!(f, "cp"),
            SolverKind::Mip => write!(f, "mip"),
        }
    }
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cp" => Ok(SolverKind::Cp),
            "mip" => Ok(SolverKind::Mip),
            _ => Err(format!("Unknown solver: '{}'. Use 'cp' or 'mip'.", s)),
        }
    }
}

/// Options controlling a [`ContinuousOptimalBinning2D`](super::ContinuousOptimalBinning2D) fit
#[derive(Debug, Clone, Serialize)]
pub struct BinningConfig {
    /// Name of the x variable (used in tables and exports)
    pub name_x: String,
    /// Name of the y variable
    pub name_y: String,
    pub dtype_x: Dtype,
    pub dtype_y: Dtype,
    pub prebinning_method: PrebinningMethod,
    pub strategy: PartitionStrategy,
    pub solver: SolverKind,
    /// Maximum number of pre-bins on the x axis
    pub max_n_prebins_x: usize,
    /// Maximum number of pre-bins on the y axis
    pub max_n_prebins_y: usize,
    /// Minimum pre-bin size on x as a fraction of clean samples
    pub min_prebin_size_x: f64,
    /// Minimum pre-bin size on y as a fraction of clean samples
    pub min_prebin_size_y: f64,
    pub min_n_bins: Option<usize>,
    pub max_n_bins: Option<usize>,
    /// Minimum bin size as a fraction of clean samples
    pub min_bin_size: Option<f64>,
    /// Maximum bin size as a fraction of clean samples
    pub max_bin_size: Option<f64>,
    pub monotonic_trend_x: Option<MonotonicTrend>,
    pub monotonic_trend_y: Option<MonotonicTrend>,
    /// Minimum mean difference between x-adjacent bins under a trend
    pub min_mean_diff_x: f64,
    /// Minimum mean difference between y-adjacent bins under a trend
    pub min_mean_diff_y: f64,
    /// Per-bin penalty on the objective
    pub gamma: f64,
    pub special_codes_x: Vec<f64>,
    pub special_codes_y: Vec<f64>,
    /// Decimals kept in pre-bin split points
    pub split_digits: Option<u32>,
    /// Solver workers; negative values count back from the available cores
    pub n_jobs: i32,
    /// Solver wall-clock budget in seconds
    pub time_limit: f64,
    pub verbose: bool,
    /// Reject clean samples whose target is not finite
    pub check_input: bool,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            name_x: String::new(),
            name_y: String::new(),
            dtype_x: Dtype::Numerical,
            dtype_y: Dtype::Numerical,
            prebinning_method: PrebinningMethod::Cart,
            strategy: PartitionStrategy::Grid,
            solver: SolverKind::Cp,
            max_n_prebins_x: 5,
            max_n_prebins_y: 5,
            min_prebin_size_x: 0.05,
            min_prebin_size_y: 0.05,
            min_n_bins: None,
            max_n_bins: None,
            min_bin_size: None,
            max_bin_size: None,
            monotonic_trend_x: None,
            monotonic_trend_y: None,
            min_mean_diff_x: 0.0,
            min_mean_diff_y: 0.0,
            gamma: 0.0,
            special_codes_x: Vec::new(),
            special_codes_y: Vec::new(),
            split_digits: None,
            n_jobs: 1,
            time_limit: 100.0,
            verbose: false,
            check_input: false,
        }
    }
}

impl BinningConfig {
    /// Check every option against its allowed domain.
    pub fn validate(&self) -> Result<(), BinningError> {
        if self.dtype_x != Dtype::Numerical {
            return Err(BinningError::invalid(
                "dtype_x",
                format!("only \"numerical\" is supported; got \"{}\"", self.dtype_x),
            ));
        }
        if self.dtype_y != Dtype::Numerical {
            return Err(BinningError::invalid(
                "dtype_y",
                format!("only \"numerical\" is supported; got \"{}\"", self.dtype_y),
            ));
        }

        if self.prebinning_method == PrebinningMethod::Mdlp {
            return Err(BinningError::invalid(
                "prebinning_method",
                "\"mdlp\" requires a categorical target; use \"cart\", \"quantile\" or \"uniform\"",
            ));
        }

        check_prebins("max_n_prebins_x", self.max_n_prebins_x)?;
        check_prebins("max_n_prebins_y", self.max_n_prebins_y)?;
        check_fraction("min_prebin_size_x", self.min_prebin_size_x, 0.5)?;
        check_fraction("min_prebin_size_y", self.min_prebin_size_y, 0.5)?;

        if self.min_n_bins == Some(0) {
            return Err(BinningError::invalid("min_n_bins", "must be a positive integer; got 0"));
        }
        if self.max_n_bins == Some(0) {
            return Err(BinningError::invalid("max_n_bins", "must be a positive integer; got 0"));
        }
        if let (Some(min), Some(max)) = (self.min_n_bins, self.max_n_bins) {
            if min > max {
                return Err(BinningError::invalid(
                    "min_n_bins",
                    format!("must be <= max_n_bins; got {} > {}", min, max),
                ));
            }
        }

        if let Some(size) = self.min_bin_size {
            check_fraction("min_bin_size", size, 0.5)?;
        }
        if let Some(size) = self.max_bin_size {
            check_fraction("max_bin_size", size, 1.0)?;
        }
        if let (Some(min), Some(max)) = (self.min_bin_size, self.max_bin_size) {
            if min > max {
                return Err(BinningError::invalid(
                    "min_bin_size",
                    format!("must be <= max_bin_size; got {} > {}", min, max),
                ));
            }
        }

        if !self.min_mean_diff_x.is_finite() {
            return Err(BinningError::invalid(
                "min_mean_diff_x",
                format!("must be a finite number; got {}", self.min_mean_diff_x),
            ));
        }
        if !self.min_mean_diff_y.is_finite() {
            return Err(BinningError::invalid(
                "min_mean_diff_y",
                format!("must be a finite number; got {}", self.min_mean_diff_y),
            ));
        }

        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(BinningError::invalid(
                "gamma",
                format!("must be >= 0; got {}", self.gamma),
            ));
        }

        if self.special_codes_x.iter().any(|c| c.is_nan()) {
            return Err(BinningError::invalid("special_codes_x", "codes must not be NaN"));
        }
        if self.special_codes_y.iter().any(|c| c.is_nan()) {
            return Err(BinningError::invalid("special_codes_y", "codes must not be NaN"));
        }

        if let Some(digits) = self.split_digits {
            if digits > 8 {
                return Err(BinningError::invalid(
                    "split_digits",
                    format!("must be an integer in [0, 8]; got {}", digits),
                ));
            }
        }

        if self.n_jobs == 0 {
            return Err(BinningError::invalid("n_jobs", "must be a non-zero integer"));
        }

        if !self.time_limit.is_finite() || self.time_limit < 0.0 {
            return Err(BinningError::invalid(
                "time_limit",
                format!("must be a positive value in seconds; got {}", self.time_limit),
            ));
        }

        Ok(())
    }

    /// Number of solver workers after resolving negative `n_jobs`.
    pub fn effective_n_jobs(&self) -> usize {
        if self.n_jobs > 0 {
            self.n_jobs as usize
        } else {
            let cores = rayon::current_num_threads() as i64;
            (cores + 1 + self.n_jobs as i64).max(1) as usize
        }
    }

    /// Minimum and maximum bin sizes as sample counts.
    pub fn bin_size_bounds(&self, n_samples: usize) -> (Option<usize>, Option<usize>) {
        let scale = |fraction: f64| (fraction * n_samples as f64).ceil() as usize;
        (self.min_bin_size.map(scale), self.max_bin_size.map(scale))
    }
}

fn check_prebins(name: &'static str, value: usize) -> Result<(), BinningError> {
    if value <= 1 {
        return Err(BinningError::invalid(
            name,
            format!("must be an integer greater than 1; got {}", value),
        ));
    }
    Ok(())
}

fn check_fraction(name: &'static str, value: f64, upper: f64) -> Result<(), BinningError> {
    if !(value > 0.0 && value <= upper) {
        return Err(BinningError::invalid(
            name,
            format!("must be in (0, {}]; got {}", upper, value),
        ));
    }
    Ok(())
}
