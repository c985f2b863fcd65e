//! gridbin: Optimal 2D Binning CLI Tool
//!
//! Fits an optimal rectangular binning of two numerical columns against a
//! continuous target column, prints the binning table and optionally exports
//! it or scores the input data.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use polars::prelude::*;

use gridbin::cli::Cli;
use gridbin::pipeline::{
    column_as_f64, load_dataset, save_dataset, ContinuousOptimalBinning2D, Transformed,
};
use gridbin::report::{
    display_fit_info, export_binning, BinningExport, BinningTable, ExportMetadata, ExportParams,
};
use gridbin::utils::{
    create_fit_spinner, create_spinner, finish_fit, finish_with_success, print_banner,
    print_completion, print_config, print_info, print_step_header, print_step_time,
    print_success, print_warning, ConfigCard,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = cli.to_config()?;
    let mut binning = ContinuousOptimalBinning2D::new(config.clone())
        .context("Invalid binning configuration")?;

    // Print styled banner
    print_banner(env!("CARGO_PKG_VERSION"));

    print_config(&ConfigCard {
        input: &cli.input,
        column_x: &cli.x,
        column_y: &cli.y,
        column_z: &cli.z,
        solver: config.solver.to_string(),
        strategy: config.strategy.to_string(),
        max_prebins: (config.max_n_prebins_x, config.max_n_prebins_y),
    });

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");

    let step_start = Instant::now();
    let spinner = create_spinner("Loading dataset...");
    let mut df = load_dataset(&cli.input, cli.schema_length())?;
    let x = column_as_f64(&df, &cli.x)?;
    let y = column_as_f64(&df, &cli.y)?;
    let z = column_as_f64(&df, &cli.z)?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", df.height());
    println!("      Columns: {}", df.width());
    print_step_time(step_start.elapsed());

    // Step 2: Fit
    print_step_header(2, "Optimal Binning");

    let step_start = Instant::now();
    let spinner = create_fit_spinner(&config.solver.to_string(), config.time_limit);
    let status = binning.fit(&x, &y, &z)?;
    finish_fit(&spinner, status);
    print_step_time(step_start.elapsed());

    if let Some(info) = binning.info() {
        display_fit_info(info);
    }

    let table = match binning.fitted() {
        Ok(fitted) => {
            let table = BinningTable::build(fitted, &cli.x, &cli.y, cli.show_digits);
            table.display();
            Some(table)
        }
        Err(_) => None,
    };

    // Step 3: Export
    if let Some(path) = &cli.export_json {
        print_step_header(3, "Export");

        let info = binning
            .info()
            .context("Fit diagnostics are missing after fitting")?;
        let (splits_x, splits_y) = match binning.fitted() {
            Ok(fitted) => (fitted.splits_x.clone(), fitted.splits_y.clone()),
            Err(_) => (Vec::new(), Vec::new()),
        };
        let input_file = cli.input.display().to_string();
        let export = BinningExport {
            metadata: ExportMetadata::new(&ExportParams {
                input_file: &input_file,
                column_x: &cli.x,
                column_y: &cli.y,
                column_z: &cli.z,
            }),
            config: binning.config(),
            fit: info,
            splits_x,
            splits_y,
            table: table.as_ref(),
        };
        export_binning(&export, path)?;
        print_success(&format!("Binning exported to {}", path.display()));
    }

    // Step 4: Transform
    if let Some(path) = &cli.transform_output {
        print_step_header(4, "Transform");

        if binning.is_fitted() {
            let step_start = Instant::now();
            let spinner = create_spinner("Transforming data...");
            let transformed = binning.transform(&x, &y, &cli.transform_options())?;
            let name = cli.transform_column_name();
            let series = match transformed {
                Transformed::Mean(values) => Series::new(name.as_str().into(), values),
                Transformed::Indices(values) => Series::new(
                    name.as_str().into(),
                    values.into_iter().map(|v| v as u64).collect::<Vec<u64>>(),
                ),
                Transformed::Bins(values) => Series::new(name.as_str().into(), values),
            };
            df.with_column(series)
                .with_context(|| format!("Failed to append column '{}'", name))?;
            save_dataset(&mut df, path)?;
            finish_with_success(&spinner, &format!("Saved to {}", path.display()));
            print_step_time(step_start.elapsed());
        } else {
            print_warning("Binning is not fitted; transform output skipped");
        }
    }

    if !binning.is_fitted() {
        print_info("Relax the bin count, size or trend constraints, or raise --time-limit");
    }

    // Final completion message
    print_completion();

    Ok(())
}
