//! Command-line argument definitions using clap

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::{
    parse_trend, BinningConfig, Dtype, Metric, MetricValue, PartitionStrategy, PrebinningMethod,
    SolverKind, TransformOptions,
};

/// gridbin - Optimal 2D binning of a continuous target over two numerical variables
#[derive(Parser, Debug)]
#[command(name = "gridbin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Column holding the first binning variable
    #[arg(short = 'x', long = "x-column")]
    pub x: String,

    /// Column holding the second binning variable
    #[arg(short = 'y', long = "y-column")]
    pub y: String,

    /// Column holding the continuous target
    #[arg(short = 'z', long = "z-column")]
    pub z: String,

    /// Data type of the x variable. Only "numerical" is supported.
    #[arg(long, default_value = "numerical")]
    pub dtype_x: Dtype,

    /// Data type of the y variable. Only "numerical" is supported.
    #[arg(long, default_value = "numerical")]
    pub dtype_y: Dtype,

    /// Pre-binning method applied to each axis.
    /// Options: "cart" (regression tree splits, default), "quantile" or "uniform"
    #[arg(long, default_value = "cart")]
    pub prebinning_method: PrebinningMethod,

    /// Candidate generation strategy.
    /// "grid" enumerates every rectangle of the pre-bin grid (default);
    /// "cart" keeps only rectangles compatible with a joint regression tree.
    #[arg(long, default_value = "grid")]
    pub strategy: PartitionStrategy,

    /// Solver backend: "cp" (branch and bound, default) or "mip" (HiGHS).
    /// Prefer "mip" for grids larger than about 6x6 pre-bins.
    #[arg(long, default_value = "cp")]
    pub solver: SolverKind,

    /// Maximum number of pre-bins on the x axis
    #[arg(long, default_value = "5")]
    pub max_n_prebins_x: usize,

    /// Maximum number of pre-bins on the y axis
    #[arg(long, default_value = "5")]
    pub max_n_prebins_y: usize,

    /// Minimum x pre-bin size as a fraction of clean samples (0, 0.5]
    #[arg(long, default_value = "0.05", value_parser = validate_prebin_fraction)]
    pub min_prebin_size_x: f64,

    /// Minimum y pre-bin size as a fraction of clean samples (0, 0.5]
    #[arg(long, default_value = "0.05", value_parser = validate_prebin_fraction)]
    pub min_prebin_size_y: f64,

    /// Minimum number of bins
    #[arg(long)]
    pub min_n_bins: Option<usize>,

    /// Maximum number of bins
    #[arg(long)]
    pub max_n_bins: Option<usize>,

    /// Minimum bin size as a fraction of clean samples (0, 0.5]
    #[arg(long, value_parser = validate_prebin_fraction)]
    pub min_bin_size: Option<f64>,

    /// Maximum bin size as a fraction of clean samples (0, 1]
    #[arg(long, value_parser = validate_bin_fraction)]
    pub max_bin_size: Option<f64>,

    /// Monotonic trend of the bin means along x.
    /// Options: "none" (default), "ascending", "descending"
    #[arg(long, default_value = "none")]
    pub monotonic_trend_x: String,

    /// Monotonic trend of the bin means along y.
    /// Options: "none" (default), "ascending", "descending"
    #[arg(long, default_value = "none")]
    pub monotonic_trend_y: String,

    /// Minimum mean difference between x-adjacent bins under a trend
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    pub min_mean_diff_x: f64,

    /// Minimum mean difference between y-adjacent bins under a trend
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    pub min_mean_diff_y: f64,

    /// Penalty subtracted from the objective for every bin
    #[arg(long, default_value = "0.0")]
    pub gamma: f64,

    /// Special codes of the x variable (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub special_codes_x: Vec<f64>,

    /// Special codes of the y variable (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub special_codes_y: Vec<f64>,

    /// Decimals kept in pre-bin split points (0 to 8)
    #[arg(long)]
    pub split_digits: Option<u32>,

    /// Solver workers. Negative values count back from the available cores (-1 = all).
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    pub n_jobs: i32,

    /// Solver time limit in seconds
    #[arg(long, default_value = "100")]
    pub time_limit: f64,

    /// Reject clean samples whose target is not finite
    #[arg(long, default_value = "false")]
    pub check_input: bool,

    /// Write the binning table, fit diagnostics and metadata to this JSON file
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Write the input data with an appended transformed column (CSV or Parquet)
    #[arg(long)]
    pub transform_output: Option<PathBuf>,

    /// Name of the appended transformed column.
    /// Defaults to "<x>_<y>_<metric>".
    #[arg(long)]
    pub transform_column: Option<String>,

    /// Transform metric: "mean" (default), "indices" or "bins"
    #[arg(long, default_value = "mean")]
    pub metric: Metric,

    /// Value for special samples under the mean metric: a number or "empirical"
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub metric_special: MetricValue,

    /// Value for missing samples under the mean metric: a number or "empirical"
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub metric_missing: MetricValue,

    /// Decimals shown in bin labels
    #[arg(long, default_value = "2")]
    pub show_digits: usize,

    /// Log every fitting phase
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Binning configuration described by the flags
    pub fn to_config(&self) -> Result<BinningConfig> {
        let monotonic_trend_x = parse_trend(&self.monotonic_trend_x).map_err(anyhow::Error::msg)?;
        let monotonic_trend_y = parse_trend(&self.monotonic_trend_y).map_err(anyhow::Error::msg)?;

        Ok(BinningConfig {
            name_x: self.x.clone(),
            name_y: self.y.clone(),
            dtype_x: self.dtype_x,
            dtype_y: self.dtype_y,
            prebinning_method: self.prebinning_method,
            strategy: self.strategy,
            solver: self.solver,
            max_n_prebins_x: self.max_n_prebins_x,
            max_n_prebins_y: self.max_n_prebins_y,
            min_prebin_size_x: self.min_prebin_size_x,
            min_prebin_size_y: self.min_prebin_size_y,
            min_n_bins: self.min_n_bins,
            max_n_bins: self.max_n_bins,
            min_bin_size: self.min_bin_size,
            max_bin_size: self.max_bin_size,
            monotonic_trend_x,
            monotonic_trend_y,
            min_mean_diff_x: self.min_mean_diff_x,
            min_mean_diff_y: self.min_mean_diff_y,
            gamma: self.gamma,
            special_codes_x: self.special_codes_x.clone(),
            special_codes_y: self.special_codes_y.clone(),
            split_digits: self.split_digits,
            n_jobs: self.n_jobs,
            time_limit: self.time_limit,
            verbose: self.verbose,
            check_input: self.check_input,
        })
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            metric: self.metric,
            metric_special: self.metric_special,
            metric_missing: self.metric_missing,
            show_digits: self.show_digits,
        }
    }

    /// Name of the column appended by `--transform-output`
    pub fn transform_column_name(&self) -> String {
        self.transform_column
            .clone()
            .unwrap_or_else(|| format!("{}_{}_{}", self.x, self.y, self.metric))
    }

    /// Schema inference length, None meaning a full scan
    pub fn schema_length(&self) -> Option<usize> {
        (self.infer_schema_length > 0).then_some(self.infer_schema_length)
    }
}

/// Validator for minimum pre-bin and bin size fractions
fn validate_prebin_fraction(s: &str) -> Result<f64, String> {
    validate_fraction(s, 0.5)
}

/// Validator for the maximum bin size fraction
fn validate_bin_fraction(s: &str) -> Result<f64, String> {
    validate_fraction(s, 1.0)
}

fn validate_fraction(s: &str, upper: f64) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= upper {
        Ok(value)
    } else {
        Err(format!(
            "value must be in (0, {}], got {}",
            upper, value
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::MonotonicTrend;

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec!["gridbin", "-i", "data.csv", "-x", "a", "-y", "b", "-z", "t"];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let config = parse(&[]).to_config().unwrap();
        let defaults = BinningConfig::default();
        assert_eq!(config.max_n_prebins_x, defaults.max_n_prebins_x);
        assert_eq!(config.min_prebin_size_y, defaults.min_prebin_size_y);
        assert_eq!(config.solver, defaults.solver);
        assert_eq!(config.strategy, defaults.strategy);
        assert_eq!(config.time_limit, defaults.time_limit);
        assert_eq!(config.n_jobs, defaults.n_jobs);
        assert_eq!(config.name_x, "a");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parses_options() {
        let cli = parse(&[
            "--solver",
            "mip",
            "--strategy",
            "cart",
            "--monotonic-trend-y",
            "descending",
            "--special-codes-x",
            "-999,-998",
            "--n-jobs",
            "-1",
            "--metric",
            "bins",
            "--metric-missing",
            "empirical",
        ]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.solver, SolverKind::Mip);
        assert_eq!(config.strategy, PartitionStrategy::Cart);
        assert_eq!(config.monotonic_trend_x, None);
        assert_eq!(config.monotonic_trend_y, Some(MonotonicTrend::Descending));
        assert_eq!(config.special_codes_x, vec![-999.0, -998.0]);
        assert_eq!(config.n_jobs, -1);

        let options = cli.transform_options();
        assert_eq!(options.metric, Metric::Bins);
        assert_eq!(options.metric_missing, MetricValue::Empirical);
        assert_eq!(cli.transform_column_name(), "a_b_bins");
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = ["gridbin", "-i", "d.csv", "-x", "a", "-y", "b", "-z", "t"];
        for bad in [
            vec!["--min-prebin-size-x", "0.7"],
            vec!["--max-bin-size", "0"],
            vec!["--solver", "sat"],
            vec!["--metric", "woe"],
        ] {
            let mut args = base.to_vec();
            args.extend(bad);
            assert!(Cli::try_parse_from(args).is_err());
        }

        let cli = parse(&["--monotonic-trend-x", "peak"]);
        assert!(cli.to_config().is_err());
    }

    #[test]
    fn test_schema_length_zero_means_full_scan() {
        assert_eq!(parse(&[]).schema_length(), Some(10000));
        assert_eq!(parse(&["--infer-schema-length", "0"]).schema_length(), None);
    }
}
