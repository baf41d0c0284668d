//! Human-readable run summaries.

use std::fmt::Write;

use graphcopy::{CopyReport, CopyStats};
use owo_colors::OwoColorize;

/// Render a copy report as one line per table, in copy order.
pub fn copy_summary(report: &CopyReport, colored: bool) -> String {
    let width = report
        .tables
        .iter()
        .map(|t| t.name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for table in &report.tables {
        let name = format!("{:width$}", table.name);
        if table.skipped {
            let line = format!("{name}  skipped");
            if colored {
                let _ = writeln!(out, "  {}", line.dimmed());
            } else {
                let _ = writeln!(out, "  {line}");
            }
            continue;
        }

        let rows = format!("{} rows", table.rows);
        let detail = format!("({} batches, {} replaced)", table.batches, table.deleted);
        if colored {
            let _ = writeln!(out, "  {}  {} {}", name.bold(), rows.green(), detail.dimmed());
        } else {
            let _ = writeln!(out, "  {name}  {rows} {detail}");
        }
    }

    let copied = report.tables.iter().filter(|t| !t.skipped).count();
    let _ = write!(
        out,
        "Copied {} rows across {} tables",
        report.total_rows(),
        copied
    );
    out
}

pub fn permissions_summary(schema: &str, stats: &CopyStats) -> String {
    format!(
        "Synced {} subjects into {} ({} batches)",
        stats.rows, schema, stats.batches
    )
}
