//! Dataset loading and saving for CSV and Parquet files

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: Option<usize>) -> Result<DataFrame> {
    let extension = file_extension(path);

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(infer_schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    lf.collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Extract a column as f64 values; nulls become NaN so they segment as missing
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name).with_context(|| {
        let available: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        format!("Column '{}' not found in dataset. Available columns: {:?}", name, available)
    })?;

    let float_col = column
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' cannot be read as numeric", name))?;

    let values = float_col
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    Ok(values)
}

/// Save a dataset to a file (CSV or Parquet based on extension)
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = file_extension(path);

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}

fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
