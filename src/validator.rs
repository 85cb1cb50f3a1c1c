//! Structural validation of model responses.
//!
//! A response is accepted only when it carries every contract heading exactly
//! once, a well-formed table wherever one is demanded, and a usable lead
//! paragraph in the summary section. Validation is deterministic: the same
//! response text and contract always produce the same [`StructuredReport`]
//! or the same rejection, and sections come out in contract order no matter
//! how the model arranged them.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::contract::{HeadingSpec, ReportContract};
use crate::error::{ValidationError, ValidationErrorKind};
use crate::models::{ReportSection, ReportTable, StructuredReport};

static DELIMITER_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:?-+:?$").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Check a raw model response against the contract and extract the report.
pub fn validate(
    raw_text: &str,
    contract: &ReportContract,
) -> Result<StructuredReport, ValidationError> {
    let text = strip_code_fence(raw_text);
    let blocks = split_sections(text);
    check_heading_set(&blocks, contract)?;

    let mut lead_message = String::new();
    let mut sections = Vec::with_capacity(contract.headings.len());

    for spec in &contract.headings {
        let lines = blocks
            .iter()
            .find(|(title, _)| *title == spec.title)
            .map(|(_, lines)| lines.as_slice())
            .unwrap_or(&[]);
        let (mut body, table) = split_body_and_table(lines, spec)?;

        if spec.is_summary {
            let (lead, rest) = hoist_lead(&body);
            if lead.is_empty() {
                return Err(ValidationError::new(
                    ValidationErrorKind::EmptyLead,
                    format!("no lead paragraph under \"{}\"", spec.title),
                ));
            }
            lead_message = lead;
            body = rest;
        } else if body.is_empty() && table.is_none() {
            return Err(ValidationError::new(
                ValidationErrorKind::StructureMismatch,
                format!("section \"{}\" has no content", spec.title),
            ));
        }

        sections.push(ReportSection {
            heading: spec.title.clone(),
            body,
            table,
        });
    }

    Ok(StructuredReport {
        lead_message,
        sections,
    })
}

/// Drop a single Markdown code fence wrapped around the whole response.
/// Models wrap otherwise-correct reports this way often enough that
/// rejecting for it would burn completions for nothing.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let Some((_, rest)) = trimmed.split_once('\n') else {
        return trimmed;
    };
    let rest = rest.trim_end();
    match rest.strip_suffix("```") {
        Some(body) => body.trim_end(),
        None => rest,
    }
}

/// Split the response into `(heading, lines)` blocks in document order.
/// Text before the first heading is chatter, not report content, and is
/// dropped.
fn split_sections(text: &str) -> Vec<(&str, Vec<&str>)> {
    let mut blocks: Vec<(&str, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(title) = trimmed.strip_prefix("## ") {
            blocks.push((title.trim(), Vec::new()));
        } else if let Some((_, lines)) = blocks.last_mut() {
            lines.push(line.trim_end());
        }
    }
    blocks
}

/// The heading set must be exactly the contract's: nothing unknown, nothing
/// doubled, nothing missing.
fn check_heading_set(
    blocks: &[(&str, Vec<&str>)],
    contract: &ReportContract,
) -> Result<(), ValidationError> {
    for (title, _) in blocks {
        if contract.find(title).is_none() {
            return Err(ValidationError::new(
                ValidationErrorKind::StructureMismatch,
                format!("unexpected heading \"{title}\""),
            ));
        }
    }

    for spec in &contract.headings {
        let count = blocks
            .iter()
            .filter(|(title, _)| *title == spec.title)
            .count();
        if count > 1 {
            return Err(ValidationError::new(
                ValidationErrorKind::StructureMismatch,
                format!("heading \"{}\" appears {count} times", spec.title),
            ));
        }
    }

    let missing: Vec<&str> = contract
        .headings
        .iter()
        .filter(|spec| !blocks.iter().any(|(title, _)| *title == spec.title))
        .map(|spec| spec.title.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::StructureMismatch,
            format!("missing headings: \"{}\"", missing.join("\", \"")),
        ));
    }

    Ok(())
}

/// Separate a section's prose from its first pipe table.
///
/// The first run of consecutive `|` lines is the section's table candidate.
/// In a section that requires a table, a candidate that fails to parse is a
/// `MissingTable` rejection; in a prose section it simply stays in the body.
fn split_body_and_table(
    lines: &[&str],
    spec: &HeadingSpec,
) -> Result<(String, Option<ReportTable>), ValidationError> {
    let mut table_range: Option<(usize, usize)> = None;
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim_start().starts_with('|') {
            let start = i;
            while i < lines.len() && lines[i].trim_start().starts_with('|') {
                i += 1;
            }
            table_range = Some((start, i));
            break;
        }
        i += 1;
    }

    let (table, consumed) = match table_range {
        None => (None, None),
        Some((start, end)) => match parse_table(&lines[start..end]) {
            Ok(table) => (Some(table), Some((start, end))),
            Err(reason) => {
                if spec.requires_table {
                    return Err(ValidationError::new(
                        ValidationErrorKind::MissingTable,
                        format!("table under \"{}\" is unusable: {reason}", spec.title),
                    ));
                }
                (None, None)
            }
        },
    };

    if spec.requires_table && table.is_none() {
        return Err(ValidationError::new(
            ValidationErrorKind::MissingTable,
            format!("no table found under \"{}\"", spec.title),
        ));
    }

    let body_lines: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(index, _)| match consumed {
            Some((start, end)) => *index < start || *index >= end,
            None => true,
        })
        .map(|(_, line)| *line)
        .collect();
    // Excising the table can leave doubled blank lines at the seam.
    let body = body_lines.join("\n");
    let body = BLANK_RUN.replace_all(&body, "\n\n").trim().to_string();

    Ok((body, table))
}

fn parse_table(lines: &[&str]) -> Result<ReportTable, String> {
    if lines.len() < 2 || !is_delimiter_row(lines[1]) {
        return Err("expected a header row followed by a delimiter row".to_string());
    }
    let header = split_row(lines[0]);
    let delimiter = split_row(lines[1]);
    if delimiter.len() != header.len() {
        return Err(format!(
            "delimiter row has {} columns where the header has {}",
            delimiter.len(),
            header.len()
        ));
    }
    if lines.len() == 2 {
        return Err("table has a header but no data rows".to_string());
    }

    let mut rows = Vec::with_capacity(lines.len() - 2);
    for line in &lines[2..] {
        let cells = split_row(line);
        if cells.len() != header.len() {
            return Err(format!(
                "data row has {} cells where the header has {} columns",
                cells.len(),
                header.len()
            ));
        }
        rows.push(cells);
    }

    Ok(ReportTable { header, rows })
}

fn split_row(line: &str) -> Vec<String> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

fn is_delimiter_row(line: &str) -> bool {
    let cells = split_row(line);
    !cells.is_empty() && cells.iter().all(|cell| DELIMITER_CELL.is_match(cell))
}

/// Pull the first paragraph out of the summary body as the report lead.
/// Returns the lead flattened to one line and the remaining body.
fn hoist_lead(body: &str) -> (String, String) {
    let paragraphs: Vec<&str> = body
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let Some((first, rest)) = paragraphs.split_first() else {
        return (String::new(), String::new());
    };
    let lead = first
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    (lead, rest.join("\n\n"))
}
