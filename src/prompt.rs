//! Deterministic prompt construction.
//!
//! Given the same set of collected items and the same contract, this module
//! produces byte-identical prompt text. Items are sorted newest-first with
//! stable tie-breaks, capped, and rendered as numbered blocks; the analyst
//! instructions end with an output constraints block generated from the
//! report contract so the model is told exactly what the validator will
//! later demand.

use std::cmp::Ordering;
use std::fmt::Write as _;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::contract::ReportContract;
use crate::models::{AnalysisRequest, RawItem};

/// Hard cap on items serialized into one prompt. The newest survive.
pub const MAX_PROMPT_ITEMS: usize = 120;

/// Per-item cap on body text, in characters, after whitespace collapsing.
pub const MAX_BODY_CHARS: usize = 1000;

/// Shown to the model in place of an item list on a quiet week.
pub const NO_ITEMS_MARKER: &str = "No items were collected in this reporting window.";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const INSTRUCTION_PREAMBLE: &str = "You are a senior space-industry analyst. \
You write a weekly trend report for executives who follow launch providers, \
satellite operators, space agencies, and the investors behind them. \
Work only from the numbered items you are given. Summarize and connect them; \
never invent events, figures, or company names that do not appear in the items. \
If the item list says no items were collected, still produce the full report \
and state plainly in each section that there was no notable activity.";

/// Assemble the full analyst instructions for a contract, constraints block
/// included.
pub fn instruction_template(contract: &ReportContract) -> String {
    let mut out = String::from(INSTRUCTION_PREAMBLE);
    out.push_str("\n\n");
    out.push_str(&constraints_block(contract));
    out
}

/// The enumerable output rules derived from the contract. Kept mechanical on
/// purpose: every rule stated here is enforced verbatim after the response
/// comes back.
fn constraints_block(contract: &ReportContract) -> String {
    let mut out = String::from("Output constraints:\n");
    let titles = contract
        .headings
        .iter()
        .map(|h| format!("\"{}\"", h.title))
        .join(", ");

    writeln!(
        out,
        "- Respond in GitHub-flavored Markdown only. No code fences, and no text before the first heading."
    )
    .unwrap();
    writeln!(
        out,
        "- Use exactly these {} second-level headings, each exactly once: {}.",
        contract.headings.len(),
        titles
    )
    .unwrap();
    writeln!(
        out,
        "- Do not add any other \"##\" heading, and do not rename, translate, or reorder heading text."
    )
    .unwrap();

    for heading in &contract.headings {
        if heading.is_summary {
            writeln!(
                out,
                "- Open \"{}\" with a lead paragraph of two or three sentences capturing the week.",
                heading.title
            )
            .unwrap();
        }
        if heading.requires_table {
            writeln!(
                out,
                "- Under \"{}\", include a Markdown pipe table with the columns {} and at least one data row. On a quiet week, fill a single row with \"None\" in the first column and \"-\" elsewhere.",
                heading.title,
                heading.table_columns.iter().map(|c| format!("\"{c}\"")).join(", ")
            )
            .unwrap();
        }
    }

    writeln!(
        out,
        "- Keep every section factual and grounded in the numbered items; cite nothing else."
    )
    .unwrap();
    out
}

/// Build the request for one run. Pure: no clock, no randomness, no I/O.
pub fn build(items: &[RawItem], template: &str, model_identifier: &str) -> AnalysisRequest {
    AnalysisRequest {
        instruction_template: template.to_string(),
        serialized_items: serialize_items(items),
        model_identifier: model_identifier.to_string(),
    }
}

/// Render items as numbered blocks in prompt order.
///
/// Ordering is newest-first by publication time with undated items last,
/// then by source id, then by title, so shuffled input files produce the
/// same prompt bytes.
pub fn serialize_items(items: &[RawItem]) -> String {
    if items.is_empty() {
        return NO_ITEMS_MARKER.to_string();
    }

    let mut out = String::new();
    for (index, item) in items
        .iter()
        .sorted_by(|a, b| prompt_order(a, b))
        .take(MAX_PROMPT_ITEMS)
        .enumerate()
    {
        if index > 0 {
            out.push('\n');
        }
        let published = match item.published_at {
            Some(ts) => ts.to_rfc3339(),
            None => "unknown".to_string(),
        };
        let url = if item.url.is_empty() {
            "none"
        } else {
            item.url.as_str()
        };
        writeln!(out, "[{}] Title: {}", index + 1, collapse(&item.title)).unwrap();
        writeln!(out, "    Source: {}", collapse(&item.source_id)).unwrap();
        writeln!(out, "    URL: {url}").unwrap();
        writeln!(out, "    Published: {published}").unwrap();
        writeln!(out, "    Summary: {}", clipped_body(&item.body_text)).unwrap();
    }
    out
}

fn prompt_order(a: &RawItem, b: &RawItem) -> Ordering {
    // Option sorts None first, so comparing b to a puts dated items newest
    // first and undated items last.
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.source_id.cmp(&b.source_id))
        .then_with(|| a.title.cmp(&b.title))
}

fn clipped_body(body: &str) -> String {
    let collapsed = collapse(body);
    if collapsed.is_empty() {
        return "(none)".to_string();
    }
    if collapsed.chars().count() <= MAX_BODY_CHARS {
        return collapsed;
    }
    let mut clipped: String = collapsed.chars().take(MAX_BODY_CHARS).collect();
    clipped.push_str("...");
    clipped
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(source_id: &str, title: &str, day: Option<u32>) -> RawItem {
        RawItem {
            source_id: source_id.to_string(),
            title: title.to_string(),
            body_text: format!("{title} body"),
            published_at: day.map(|d| Utc.with_ymd_and_hms(2025, 8, d, 12, 0, 0).unwrap()),
            url: format!("https://example.com/{source_id}/{day:?}"),
        }
    }

    #[test]
    fn test_items_sort_newest_first_with_undated_last() {
        let items = vec![
            item("arxiv", "old", Some(2)),
            item("manual", "undated", None),
            item("spacenews", "new", Some(20)),
        ];

        let text = serialize_items(&items);
        let new_pos = text.find("Title: new").unwrap();
        let old_pos = text.find("Title: old").unwrap();
        let undated_pos = text.find("Title: undated").unwrap();
        assert!(new_pos < old_pos);
        assert!(old_pos < undated_pos);
        assert!(text.contains("Published: unknown"));
    }

    #[test]
    fn test_same_timestamp_breaks_ties_by_source_then_title() {
        let items = vec![
            item("zeta", "a story", Some(10)),
            item("alpha", "z story", Some(10)),
            item("alpha", "a story", Some(10)),
        ];

        let text = serialize_items(&items);
        let first = text.find("[1]").unwrap();
        let second = text.find("[2]").unwrap();
        let third = text.find("[3]").unwrap();
        assert!(text[first..second].contains("Source: alpha"));
        assert!(text[first..second].contains("Title: a story"));
        assert!(text[second..third].contains("Title: z story"));
        assert!(text[third..].contains("Source: zeta"));
    }

    #[test]
    fn test_serialization_is_order_insensitive() {
        let forward = vec![
            item("spacenews", "one", Some(3)),
            item("arxiv", "two", Some(7)),
            item("gnews", "three", None),
        ];
        let mut shuffled = forward.clone();
        shuffled.reverse();
        shuffled.swap(0, 1);

        assert_eq!(serialize_items(&forward), serialize_items(&shuffled));
    }

    #[test]
    fn test_item_cap_keeps_only_the_newest() {
        let items: Vec<RawItem> = (0..MAX_PROMPT_ITEMS + 15)
            .map(|i| RawItem {
                source_id: "bulk".to_string(),
                title: format!("item {i:04}"),
                body_text: String::new(),
                published_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
                url: format!("https://example.com/{i}"),
            })
            .collect();

        let text = serialize_items(&items);
        assert!(text.contains(&format!("[{}] ", MAX_PROMPT_ITEMS)));
        assert!(!text.contains(&format!("[{}] ", MAX_PROMPT_ITEMS + 1)));
    }

    #[test]
    fn test_body_is_collapsed_and_clipped_on_char_boundaries() {
        let mut noisy = RawItem {
            source_id: "feed".to_string(),
            title: "clip me".to_string(),
            body_text: "多".repeat(MAX_BODY_CHARS + 200),
            published_at: None,
            url: String::new(),
        };
        let text = serialize_items(std::slice::from_ref(&noisy));
        let summary_line = text
            .lines()
            .find(|l| l.trim_start().starts_with("Summary:"))
            .unwrap();
        assert!(summary_line.ends_with("..."));
        assert_eq!(
            summary_line.chars().filter(|c| *c == '多').count(),
            MAX_BODY_CHARS
        );

        noisy.body_text = "  spread \n\n over\tlines  ".to_string();
        let text = serialize_items(std::slice::from_ref(&noisy));
        assert!(text.contains("Summary: spread over lines"));
    }

    #[test]
    fn test_empty_input_gets_the_quiet_week_marker() {
        assert_eq!(serialize_items(&[]), NO_ITEMS_MARKER);
    }

    #[test]
    fn test_template_lists_every_heading_and_table_column() {
        let contract = ReportContract::standard();
        let template = instruction_template(&contract);

        for heading in &contract.headings {
            assert!(
                template.contains(&format!("\"{}\"", heading.title)),
                "template must name {}",
                heading.title
            );
            for column in &heading.table_columns {
                assert!(template.contains(&format!("\"{column}\"")));
            }
        }
        assert!(template.contains("each exactly once"));
        assert!(template.contains("No code fences"));
    }

    #[test]
    fn test_build_carries_template_and_model_verbatim() {
        let contract = ReportContract::standard();
        let template = instruction_template(&contract);
        let request = build(&[], &template, "gpt-4o-mini");

        assert_eq!(request.instruction_template, template);
        assert_eq!(request.model_identifier, "gpt-4o-mini");
        assert_eq!(request.serialized_items, NO_ITEMS_MARKER);
    }
}
