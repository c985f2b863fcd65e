//! gridbin: Optimal 2D Binning Library
//!
//! Partitions the plane of two numerical variables into rectangular bins
//! that best explain a continuous target, optionally under monotonic-trend
//! and bin-count constraints, and scores new data against the partition.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
