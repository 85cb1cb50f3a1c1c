//! Read-only access to the collector's capture file.
//!
//! The collector runs on its own schedule and leaves a JSON array of
//! [`RawItem`]s on disk. This module loads that file, drops duplicate links,
//! and hands the pipeline an immutable snapshot. Nothing here ever writes
//! back to the capture file.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument};

use crate::error::RunError;
use crate::models::RawItem;

/// An immutable snapshot of one collection window.
#[derive(Debug, Clone)]
pub struct RawInputStore {
    items: Vec<RawItem>,
}

impl RawInputStore {
    /// Load and deduplicate a capture file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn from_json_file(path: &Path) -> Result<Self, RunError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RunError::Input(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Parse a capture file already in memory. The file must be a JSON array;
    /// an empty array is a valid quiet week.
    pub fn from_json_str(text: &str) -> Result<Self, RunError> {
        let items: Vec<RawItem> = serde_json::from_str(text)
            .map_err(|e| RunError::Input(format!("capture file is not a JSON item array: {e}")))?;
        Ok(Self::from_items(items))
    }

    /// Build a store from already-parsed items, keeping the first occurrence
    /// of each URL. Items without a URL are always kept.
    pub fn from_items(items: Vec<RawItem>) -> Self {
        let collected = items.len();
        let mut seen = HashSet::new();
        let items: Vec<RawItem> = items
            .into_iter()
            .filter(|item| item.url.is_empty() || seen.insert(item.url.clone()))
            .collect();

        if collected > items.len() {
            info!(
                kept = items.len(),
                dropped = collected - items.len(),
                "Dropped duplicate links from capture"
            );
        }

        Self { items }
    }

    pub fn items(&self) -> &[RawItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source_id: &str, title: &str, url: &str) -> RawItem {
        RawItem {
            source_id: source_id.to_string(),
            title: title.to_string(),
            body_text: String::new(),
            published_at: None,
            url: url.to_string(),
        }
    }

    #[test]
    fn test_parses_collector_array() {
        let json = r#"[
            {"source": "spacenews", "title": "A", "summary": "a", "url": "https://e.com/a"},
            {"source": "arxiv", "title": "B", "summary": "b", "url": "https://e.com/b"}
        ]"#;

        let store = RawInputStore::from_json_str(json).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.items()[0].title, "A");
    }

    #[test]
    fn test_empty_array_is_a_valid_quiet_week() {
        let store = RawInputStore::from_json_str("[]").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_rejects_non_array_input() {
        let err = RawInputStore::from_json_str(r#"{"items": []}"#).unwrap_err();
        assert_eq!(err.classification(), "input_error");
    }

    #[test]
    fn test_duplicate_urls_keep_first_occurrence() {
        let store = RawInputStore::from_items(vec![
            item("spacenews", "first", "https://e.com/x"),
            item("gnews", "second", "https://e.com/x"),
            item("arxiv", "other", "https://e.com/y"),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.items()[0].title, "first");
        assert_eq!(store.items()[1].title, "other");
    }

    #[test]
    fn test_items_without_urls_are_all_kept() {
        let store = RawInputStore::from_items(vec![
            item("manual", "note one", ""),
            item("manual", "note two", ""),
        ]);

        assert_eq!(store.len(), 2);
    }
}
