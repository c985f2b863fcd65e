//! Spinners for the load, fit and transform steps

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::SolverStatus;

const TICK_CHARS: &str = "▖▘▝▗▚▞█";

/// Spinner with the elapsed time shown after the message
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(TICK_CHARS);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Spinner for the tiling search, naming the backend and its time budget
pub fn create_fit_spinner(solver: &str, time_limit: f64) -> ProgressBar {
    create_spinner(&format!(
        "Searching optimal tiling ({} solver, limit {}s)...",
        solver, time_limit
    ))
}

/// Close the fit spinner according to the solver status
pub fn finish_fit(pb: &ProgressBar, status: SolverStatus) {
    match status {
        SolverStatus::Optimal => finish_with_success(pb, "Optimal binning found"),
        SolverStatus::Feasible => {
            finish_with_warning(pb, "Time limit reached, keeping the best binning found")
        }
        other => finish_with_warning(pb, &format!("No binning found ({})", other)),
    }
}

pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✅ {}", message));
}

pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠️  {}", message));
}
