//! Pipeline module - segmentation, pre-binning, optimization and scoring

pub mod binning;
pub mod config;
pub mod error;
pub mod grid;
pub mod loader;
pub mod prebin;
pub mod reconstruct;
pub mod segment;
pub mod solver;
pub mod transform;
pub mod tree;

pub use binning::{ContinuousOptimalBinning2D, FitInfo};
pub use config::{BinningConfig, Dtype, PartitionStrategy, PrebinningMethod, SolverKind};
pub use error::BinningError;
pub use grid::{digitize, CellGrid, CellStats};
pub use loader::*;
pub use reconstruct::{BinKind, BinStats, FittedBinning};
pub use segment::{classify, split_data, SampleKind, Segments, Triplets};
pub use solver::{parse_trend, MonotonicTrend, SolverStatus};
pub use transform::{bin_label, interval_label, Metric, MetricValue, TransformOptions, Transformed};
