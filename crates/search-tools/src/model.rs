//! Lookup Data Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Caps applied to every lookup
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Number of results requested from the source
    pub top_k_results: usize,

    /// Characters of formatted output handed back to the agent
    pub doc_content_chars_max: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            top_k_results: 1,
            doc_content_chars_max: 200,
        }
    }
}

/// One search hit, normalised across sources
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub published: Option<NaiveDate>,
    /// Date of the latest revision
    pub updated: Option<NaiveDate>,
    pub authors: Vec<String>,
}

impl Document {
    pub fn new(title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            ..Self::default()
        }
    }
}

/// Keep at most `max` characters, never splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Collapse runs of whitespace (feeds wrap titles and abstracts)
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
