//! Deterministic Markdown rendering.
//!
//! The Markdown artifact is a pure function of the validated report and the
//! run date: same report, same date, same bytes. The lead paragraph is
//! promoted to a blockquote under the title; sections follow in the order
//! the validator emitted them.

use std::fmt::Write as _;

use chrono::NaiveDate;

use crate::models::{ReportTable, StructuredReport};

use super::{COVERAGE_DAYS, REPORT_TITLE};

/// Render the full Markdown artifact.
pub fn render(report: &StructuredReport, run_date: NaiveDate) -> String {
    let mut md = String::new();
    let date = run_date.format("%Y-%m-%d");

    writeln!(md, "# {REPORT_TITLE} ({date})").unwrap();
    writeln!(md).unwrap();
    writeln!(md, "_Covering the {COVERAGE_DAYS} days ending {date}._").unwrap();
    writeln!(md).unwrap();
    writeln!(md, "> {}", report.lead_message).unwrap();

    for section in &report.sections {
        writeln!(md).unwrap();
        writeln!(md, "## {}", section.heading).unwrap();
        if !section.body.is_empty() {
            writeln!(md).unwrap();
            writeln!(md, "{}", section.body).unwrap();
        }
        if let Some(table) = &section.table {
            writeln!(md).unwrap();
            render_table(&mut md, table);
        }
    }

    md
}

fn render_table(md: &mut String, table: &ReportTable) {
    writeln!(md, "| {} |", table.header.join(" | ")).unwrap();
    writeln!(md, "|{}|", vec![" --- "; table.header.len()].join("|")).unwrap();
    for row in &table.rows {
        writeln!(md, "| {} |", row.join(" | ")).unwrap();
    }
}
