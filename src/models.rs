//! Data models for collected news items and their processed representations.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawItem`]: One collected news item, exactly as the collector stored it
//! - [`AnalysisRequest`] / [`AnalysisResponse`]: The exchange with the completion service
//! - [`StructuredReport`]: The validated report extracted from a model response
//! - [`RenderedArtifact`]: Where a finished run landed on disk
//!
//! `RawItem` carries serde aliases for the collector's historical field names
//! so older capture files keep loading unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One news item as captured by the upstream collector.
///
/// The collector writes a JSON array of these. This pipeline treats the file
/// as read-only input: items are deserialized, ordered, and serialized into a
/// prompt, but never modified or written back.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawItem {
    /// Which feed or collector produced the item, e.g. "spacenews" or "arxiv".
    #[serde(alias = "source")]
    pub source_id: String,
    /// The item headline.
    pub title: String,
    /// Item body or summary text. May be empty for terse feeds.
    #[serde(alias = "summary", default)]
    pub body_text: String,
    /// Publication timestamp, when the feed provided one.
    #[serde(alias = "published", default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Canonical link for the item. Used for de-duplication; may be empty.
    #[serde(default)]
    pub url: String,
}

/// The prompt handed to the completion service for one run.
///
/// Both halves are kept separate so the instruction template can be sent as
/// the system message and the serialized items as the user message.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Fixed analyst instructions, including the output constraints block.
    pub instruction_template: String,
    /// The deterministic rendering of every item in scope for this run.
    pub serialized_items: String,
    /// Which model the service should answer with.
    pub model_identifier: String,
}

impl AnalysisRequest {
    /// The full prompt as a single block, for logging and size accounting.
    pub fn prompt_text(&self) -> String {
        format!("{}\n\n{}", self.instruction_template, self.serialized_items)
    }
}

/// How a single completion attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// The service returned usable text.
    Ok,
    /// The service refused because the account's quota is exhausted.
    QuotaExceeded,
    /// The service answered, but the payload was empty, truncated, or
    /// undecodable.
    Malformed,
    /// Network trouble or a server-side failure worth retrying.
    TransientError,
}

/// The outcome of one completion attempt.
///
/// For non-`Ok` statuses `raw_text` holds whatever error detail the service
/// sent back, so retry decisions and log lines can quote it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    /// The model's answer, or the service's error text.
    pub raw_text: String,
    /// The model that actually answered.
    pub model_identifier: String,
    /// Wall-clock time spent on this attempt.
    pub latency: Duration,
    /// Classification of this attempt.
    pub status: ResponseStatus,
}

/// A report that passed structural validation.
///
/// Section order always follows the report contract, regardless of the order
/// the model chose, so two runs over the same response render identically.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredReport {
    /// The lead paragraph hoisted out of the summary section.
    pub lead_message: String,
    /// One entry per contract heading, in contract order.
    pub sections: Vec<ReportSection>,
}

/// One validated report section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    /// The heading text, without the `##` marker.
    pub heading: String,
    /// Prose under the heading, table lines excluded. May be empty when the
    /// section's content is its table.
    pub body: String,
    /// The first well-formed pipe table under the heading, if any.
    pub table: Option<ReportTable>,
}

/// A parsed Markdown pipe table.
///
/// Validation guarantees at least one data row and that every row's cell
/// count matches the header.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

/// Where a completed run wrote its artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    pub markdown_path: PathBuf,
    pub pdf_path: PathBuf,
    /// When rendering finished, in UTC.
    pub generated_at: DateTime<Utc>,
}
