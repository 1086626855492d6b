//! Ordered provider fallback with per-call deadlines.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::{format_results, needs_augmentation, SearchProvider, SearchResult};

pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Tries each provider in order; the first non-empty result wins.
#[derive(Clone)]
pub struct SearchAugmenter {
    providers: Vec<Arc<dyn SearchProvider>>,
    timeout: Duration,
}

impl SearchAugmenter {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        Self {
            providers,
            timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    /// Deadline applied to each provider call separately.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Returns at most `count` results, or an empty list when every provider failed or found
    /// nothing. Never returns an error.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, count: usize) -> Vec<SearchResult> {
        for provider in &self.providers {
            match tokio::time::timeout(self.timeout, provider.search(query, count)).await {
                Ok(Ok(mut results)) if !results.is_empty() => {
                    results.truncate(count);
                    return results;
                }
                Ok(Ok(_)) => {
                    debug!(provider = provider.name(), "No search results, trying next provider");
                }
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "Search provider failed");
                }
                Err(_) => {
                    warn!(provider = provider.name(), timeout = ?self.timeout, "Search provider timed out");
                }
            }
        }
        Vec::new()
    }

    /// Formatted search block for `user_message`, or `None` when the message has no trigger
    /// keyword or nothing was found.
    pub async fn augment(&self, user_message: &str, count: usize) -> Option<String> {
        if !needs_augmentation(user_message) {
            return None;
        }

        let results = self.search(user_message, count).await;
        if results.is_empty() {
            info!("Search returned nothing, continuing without augmentation");
            return None;
        }
        Some(format_results(&results, count))
    }
}
