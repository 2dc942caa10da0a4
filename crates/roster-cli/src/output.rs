//! Operator-facing status lines and tables
//!
//! Tracing goes to stderr; everything here is stdout.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use roster_core::{ColumnOutcome, RunObserver, RunReport};

pub fn section(text: &str) {
    println!("\n{}", text.bold());
}

pub fn success(text: &str) {
    println!("{}", text.green());
}

pub fn warning(text: &str) {
    println!("{}", text.yellow());
}

pub fn failure(text: &str) {
    println!("{}", text.red());
}

/// Prints each column's progress as the driver reports it
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn column_started(&mut self, column: &str) {
        section(&format!("Integration: {column}"));
    }

    fn connector_selected(&mut self, _column: &str, slug: &str) {
        println!("Service: {slug}");
    }

    fn column_finished(&mut self, outcome: &ColumnOutcome) {
        match outcome {
            ColumnOutcome::Updated {
                updated, remaining, ..
            } => {
                success(&format!("Updated {updated} rows!"));
                if *remaining > 0 {
                    warning(&format!("There are {remaining} blanks."));
                }
            }
            ColumnOutcome::UpToDate { .. } => println!("{}", "No blanks to fill.".dimmed()),
            ColumnOutcome::Failed { error, .. } => failure(&format!("Error: {error}")),
            ColumnOutcome::Skipped { .. } => println!("{}", "Skipped.".dimmed()),
        }
    }
}

/// Final per-column summary
pub fn summary_table(report: &RunReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Column", "Service", "Status", "Updated", "Blanks"]);

    for outcome in &report.outcomes {
        let row = match outcome {
            ColumnOutcome::Updated {
                column,
                slug,
                updated,
                remaining,
            } => vec![
                Cell::new(column),
                Cell::new(slug),
                Cell::new("updated").fg(Color::Green),
                Cell::new(updated),
                Cell::new(remaining),
            ],
            ColumnOutcome::UpToDate { column, slug } => vec![
                Cell::new(column),
                Cell::new(slug),
                Cell::new("up to date"),
                Cell::new(0),
                Cell::new(0),
            ],
            ColumnOutcome::Failed { column, slug, .. } => vec![
                Cell::new(column),
                Cell::new(slug),
                Cell::new("failed").fg(Color::Red),
                Cell::new(""),
                Cell::new(""),
            ],
            ColumnOutcome::Skipped { column } => vec![
                Cell::new(column),
                Cell::new(""),
                Cell::new("skipped").fg(Color::Yellow),
                Cell::new(""),
                Cell::new(""),
            ],
        };
        table.add_row(row);
    }
    table
}
