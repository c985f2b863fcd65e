//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static GRID: Emoji<'_, '_> = Emoji("🔲 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ┌────┬────┬─────────┐
    │    │    │         │   g r i d b i n
    ├────┴────┼────┬────┤
    │         │    │    │
    └─────────┴────┴────┘
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Optimal 2D binning of a continuous target").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown on the configuration card
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub column_x: &'a str,
    pub column_y: &'a str,
    pub column_z: &'a str,
    pub solver: String,
    pub strategy: String,
    pub max_prebins: (usize, usize),
}

/// Print configuration card
pub fn print_config(card: &ConfigCard) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Input:  {:<39}│",
        FOLDER,
        truncate_path(card.input, 38)
    );
    println!(
        "    │  {} x / y:  {:<39}│",
        GRID,
        truncate_string(&format!("{} / {}", card.column_x, card.column_y), 38)
    );
    println!(
        "    │  {} Target: {:<39}│",
        TARGET,
        truncate_string(card.column_z, 38)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {} Solver / strategy:  {:<27}│",
        GEAR,
        style(format!("{} / {}", card.solver, card.strategy)).yellow()
    );
    println!(
        "    │  {} Max pre-bins x, y:  {:<27}│",
        CHART,
        style(format!("{}, {}", card.max_prebins.0, card.max_prebins.1)).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", style("!").yellow().bold(), style(message).yellow());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print the elapsed time of a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("took {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("gridbin complete!").green().bold()
    );
    println!();
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
        assert_eq!(truncate_string("ééééééé", 6), "...ééé");
    }
}
