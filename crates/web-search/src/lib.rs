//! # Web search augmentation
//!
//! Decides whether a user message needs live search context ([`needs_augmentation`]), queries an
//! ordered list of [`SearchProvider`]s through [`SearchAugmenter`], and renders the results into
//! a prompt block ([`format_results`]).
//!
//! Search never fails from the caller's point of view: every provider error is logged and turns
//! into an empty result.

mod augmenter;
mod duckduckgo;
mod serpapi;
mod trigger;

pub use augmenter::{SearchAugmenter, DEFAULT_SEARCH_TIMEOUT};
pub use duckduckgo::{DuckDuckGoProvider, DUCKDUCKGO_API_URL};
pub use serpapi::{SerpApiProvider, SERPAPI_API_URL};
pub use trigger::{needs_augmentation, TRIGGER_KEYWORDS};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search hit. Transient; only used within the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// A search backend. Implementations return `Err` on transport or decoding failures; the
/// augmenter turns those into an empty result.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Returns up to `count` results for `query`.
    async fn search(&self, query: &str, count: usize) -> anyhow::Result<Vec<SearchResult>>;
}

/// Renders at most `count` results as a numbered list:
///
/// ```text
/// [1] title
/// snippet
/// URL: https://...
/// ```
///
/// Entries are separated by a blank line. Empty input yields an empty string.
pub fn format_results(results: &[SearchResult], count: usize) -> String {
    results
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, r)| format!("[{}] {}\n{}\nURL: {}", i + 1, r.title, r.snippet, r.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}
