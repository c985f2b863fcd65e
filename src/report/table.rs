//! Binning table rendering

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::{interval_label, BinKind, FitInfo, FittedBinning};

/// One row of the binning table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinningTableRow {
    pub bin_x: String,
    pub bin_y: String,
    pub count: usize,
    /// Share of all samples in percent
    pub count_pct: f64,
    pub sum: f64,
    /// None on the totals row
    pub std: Option<f64>,
    pub mean: f64,
}

/// Per-bin statistics of a fitted binning, virtual bins and totals included
#[derive(Debug, Clone, Serialize)]
pub struct BinningTable {
    pub name_x: String,
    pub name_y: String,
    /// Clean bins followed by the Special and Missing rows
    pub rows: Vec<BinningTableRow>,
    pub totals: BinningTableRow,
}

impl BinningTable {
    pub fn build(fitted: &FittedBinning, name_x: &str, name_y: &str, show_digits: usize) -> Self {
        let n_total: usize = fitted.bins.iter().map(|b| b.count).sum();
        let pct = |count: usize| {
            if n_total > 0 {
                count as f64 / n_total as f64 * 100.0
            } else {
                0.0
            }
        };

        let rows: Vec<BinningTableRow> = fitted
            .bins
            .iter()
            .map(|bin| {
                let (bin_x, bin_y) = match bin.kind {
                    BinKind::Clean => (
                        interval_label(bin.x_interval, show_digits),
                        interval_label(bin.y_interval, show_digits),
                    ),
                    BinKind::Special => ("Special".to_string(), "Special".to_string()),
                    BinKind::Missing => ("Missing".to_string(), "Missing".to_string()),
                };
                BinningTableRow {
                    bin_x,
                    bin_y,
                    count: bin.count,
                    count_pct: pct(bin.count),
                    sum: bin.sum,
                    std: Some(bin.std),
                    mean: bin.mean,
                }
            })
            .collect();

        let total_sum: f64 = fitted.bins.iter().map(|b| b.sum).sum();
        let totals = BinningTableRow {
            bin_x: String::new(),
            bin_y: String::new(),
            count: n_total,
            count_pct: if n_total > 0 { 100.0 } else { 0.0 },
            sum: total_sum,
            std: None,
            mean: if n_total > 0 {
                total_sum / n_total as f64
            } else {
                0.0
            },
        };

        Self {
            name_x: if name_x.is_empty() { "x".to_string() } else { name_x.to_string() },
            name_y: if name_y.is_empty() { "y".to_string() } else { name_y.to_string() },
            rows,
            totals,
        }
    }

    /// Clean rows only
    pub fn clean_rows(&self) -> &[BinningTableRow] {
        &self.rows[..self.rows.len().saturating_sub(2)]
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("").add_attribute(Attribute::Bold),
            Cell::new(format!("Bin {}", self.name_x)).add_attribute(Attribute::Bold),
            Cell::new(format!("Bin {}", self.name_y)).add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
            Cell::new("Count (%)").add_attribute(Attribute::Bold),
            Cell::new("Sum").add_attribute(Attribute::Bold),
            Cell::new("Std").add_attribute(Attribute::Bold),
            Cell::new("Mean").add_attribute(Attribute::Bold),
        ]);

        for (idx, row) in self.rows.iter().enumerate() {
            let label = if idx < self.clean_rows().len() {
                Cell::new(idx)
            } else {
                Cell::new(idx).fg(Color::DarkGrey)
            };
            table.add_row(row_cells(label, row));
        }

        let mut totals = row_cells(
            Cell::new("Totals").add_attribute(Attribute::Bold),
            &self.totals,
        );
        totals[3] = Cell::new(self.totals.count)
            .add_attribute(Attribute::Bold)
            .set_alignment(CellAlignment::Right);
        table.add_row(totals);

        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("BINNING TABLE").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        // Indent the table
        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }
    }
}

fn row_cells(label: Cell, row: &BinningTableRow) -> Vec<Cell> {
    let number = |value: String| Cell::new(value).set_alignment(CellAlignment::Right);
    vec![
        label,
        Cell::new(&row.bin_x),
        Cell::new(&row.bin_y),
        number(row.count.to_string()),
        number(format!("{:.2}%", row.count_pct)),
        number(format!("{:.4}", row.sum)),
        number(row.std.map(|s| format!("{:.4}", s)).unwrap_or_default()),
        number(format!("{:.4}", row.mean)),
    ]
}

/// Print the diagnostics of a fit
pub fn display_fit_info(info: &FitInfo) {
    println!();
    println!(
        "    {} {}",
        style("📊").cyan(),
        style("FIT SUMMARY").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Metric").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);

    let status_color = if info.status.has_solution() {
        Color::Green
    } else {
        Color::Red
    };
    table.add_row(vec![
        Cell::new("Status"),
        Cell::new(info.status)
            .fg(status_color)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("Solver"), Cell::new(info.solver)]);
    table.add_row(vec![Cell::new("Strategy"), Cell::new(info.strategy)]);
    table.add_row(vec![Cell::new("Samples"), Cell::new(info.n_samples)]);
    table.add_row(vec![
        Cell::new("Clean / Special / Missing"),
        Cell::new(format!(
            "{} / {} / {}",
            info.n_clean, info.n_special, info.n_missing
        )),
    ]);
    table.add_row(vec![
        Cell::new("Pre-bins (x by y)"),
        Cell::new(format!(
            "{} x {} = {}",
            info.n_prebins_x,
            info.n_prebins_y,
            info.n_prebins()
        )),
    ]);
    table.add_row(vec![Cell::new("Candidates"), Cell::new(info.n_candidates)]);
    table.add_row(vec![Cell::new("Refinements"), Cell::new(info.n_refinements)]);
    table.add_row(vec![Cell::new("Conflicts"), Cell::new(info.n_conflicts)]);
    if let Some(objective) = info.objective {
        table.add_row(vec![
            Cell::new("Objective"),
            Cell::new(format!("{:.6}", objective)),
        ]);
    }

    for (name, seconds) in [
        ("Time pre-processing", info.time_preprocessing),
        ("Time pre-binning", info.time_prebinning),
        ("Time model data", info.time_model_data),
        ("Time solver", info.time_solver),
        ("Time post-processing", info.time_postprocessing),
    ] {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.4}s", seconds)).fg(Color::DarkGrey),
        ]);
    }
    table.add_row(vec![
        Cell::new("Time total"),
        Cell::new(format!("{:.4}s", info.time_total)).add_attribute(Attribute::Bold),
    ]);

    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}
