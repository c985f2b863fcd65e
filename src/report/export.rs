//! JSON export of a fitted binning

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::table::BinningTable;
use crate::pipeline::{BinningConfig, FitInfo};

/// Metadata about the binning run
#[derive(Serialize)]
pub struct ExportMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    /// gridbin version
    pub gridbin_version: String,
    /// Input file path
    pub input_file: String,
    pub column_x: String,
    pub column_y: String,
    /// Target column name
    pub column_z: String,
}

/// Complete export: metadata, options, diagnostics and the table
#[derive(Serialize)]
pub struct BinningExport<'a> {
    pub metadata: ExportMetadata,
    pub config: &'a BinningConfig,
    pub fit: &'a FitInfo,
    /// Realized split points; empty when the fit produced no solution
    pub splits_x: Vec<f64>,
    pub splits_y: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<&'a BinningTable>,
}

/// Parameters for the export metadata
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub column_x: &'a str,
    pub column_y: &'a str,
    pub column_z: &'a str,
}

impl ExportMetadata {
    pub fn new(params: &ExportParams) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            gridbin_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            column_x: params.column_x.to_string(),
            column_y: params.column_y.to_string(),
            column_z: params.column_z.to_string(),
        }
    }
}

/// Serialize an export to a pretty-printed JSON string
pub fn export_to_string(export: &BinningExport) -> Result<String> {
    serde_json::to_string_pretty(export).context("Failed to serialize binning to JSON")
}

/// Write a binning export to a JSON file
pub fn export_binning(export: &BinningExport, output_path: &Path) -> Result<()> {
    let json = export_to_string(export)?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write binning export to {}", output_path.display()))?;

    Ok(())
}
