//! Tests for CLI argument parsing and the gridbin binary

use assert_cmd::Command;
use clap::Parser;
use gridbin::cli::Cli;
use gridbin::pipeline::{column_as_f64, load_dataset, SolverKind};
use predicates::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_cli_default_values() {
    let cli = Cli::parse_from(["gridbin", "-i", "data.csv", "-x", "a", "-y", "b", "-z", "t"]);

    assert_eq!(cli.max_n_prebins_x, 5);
    assert_eq!(cli.min_prebin_size_y, 0.05);
    assert_eq!(cli.solver, SolverKind::Cp);
    assert_eq!(cli.time_limit, 100.0);
    assert_eq!(cli.show_digits, 2);
    assert!(!cli.verbose);
    assert!(cli.export_json.is_none());
}

#[test]
fn test_cli_requires_columns() {
    assert!(Cli::try_parse_from(["gridbin", "-i", "data.csv", "-x", "a", "-y", "b"]).is_err());
}

#[test]
fn test_binary_fits_exports_and_transforms() {
    let mut df = quadrant_dataset().to_dataframe();
    let (dir, input) = create_temp_csv(&mut df);
    let json_path = dir.path().join("binning.json");
    let output_path = dir.path().join("scored.csv");

    Command::cargo_bin("gridbin")
        .unwrap()
        .args(["-i", input.to_str().unwrap()])
        .args(["-x", "x", "-y", "y", "-z", "z"])
        .args(["--gamma", "0.1", "--metric", "indices"])
        .args(["--export-json", json_path.to_str().unwrap()])
        .args(["--transform-output", output_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("BINNING TABLE"))
        .stdout(predicate::str::contains("OPTIMAL"));

    let json = std::fs::read_to_string(&json_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["fit"]["status"], "Optimal");
    assert_eq!(value["metadata"]["column_z"], "z");
    assert_eq!(value["splits_x"], serde_json::json!([5.0]));
    // Three clean rows plus the Special and Missing rows
    assert_eq!(value["table"]["rows"].as_array().unwrap().len(), 5);
    assert_eq!(value["table"]["totals"]["count"], 400);

    let scored = load_dataset(&output_path, None).unwrap();
    assert_eq!(scored.width(), 4);
    let indices = column_as_f64(&scored, "x_y_indices").unwrap();
    assert!(indices.iter().all(|&i| (0.0..3.0).contains(&i)));
}

#[test]
fn test_binary_reports_unknown_column() {
    let mut df = quadrant_dataset().to_dataframe();
    let (_dir, input) = create_temp_csv(&mut df);

    Command::cargo_bin("gridbin")
        .unwrap()
        .args(["-i", input.to_str().unwrap()])
        .args(["-x", "x", "-y", "w", "-z", "z"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Column 'w' not found"));
}

#[test]
fn test_binary_rejects_invalid_config() {
    Command::cargo_bin("gridbin")
        .unwrap()
        .args(["-i", "data.csv", "-x", "x", "-y", "y", "-z", "z"])
        .args(["--max-n-prebins-x", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_n_prebins_x"));
}

#[test]
fn test_binary_infeasible_fit_skips_transform() {
    let mut df = quadrant_dataset().to_dataframe();
    let (dir, input) = create_temp_csv(&mut df);
    let output_path = dir.path().join("scored.csv");

    Command::cargo_bin("gridbin")
        .unwrap()
        .args(["-i", input.to_str().unwrap()])
        .args(["-x", "x", "-y", "y", "-z", "z", "--min-n-bins", "5"])
        .args(["--transform-output", output_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("INFEASIBLE"));

    assert!(!output_path.exists());
}
