//! Pipeline config: history size, rate window, search and per-call timeouts.

use anyhow::Result;
use std::env;
use std::time::Duration;

use web_search::{DUCKDUCKGO_API_URL, SERPAPI_API_URL};

use super::env_parse;

/// Upper bound for RATE_LIMIT_WINDOW_HOURS: ten years.
pub const MAX_RATE_LIMIT_WINDOW_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// HISTORY_LIMIT: messages of context per request
    pub history_limit: usize,
    /// RATE_LIMIT_CEILING: admissions per window
    pub rate_limit_ceiling: i64,
    /// RATE_LIMIT_WINDOW_HOURS
    pub rate_limit_window_hours: i64,
    pub search_enabled: bool,
    pub search_result_count: usize,
    pub duckduckgo_api_url: String,
    /// SerpApi is used as fallback only when a key is set.
    pub serpapi_api_key: Option<String>,
    pub serpapi_api_url: String,
    pub store_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub reply_timeout_secs: u64,
    /// PROCESSING_DEADLINE_SECS: budget for everything before the reply is sent
    pub processing_deadline_secs: u64,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            history_limit: env_parse("HISTORY_LIMIT", 10)?,
            rate_limit_ceiling: env_parse("RATE_LIMIT_CEILING", 100)?,
            rate_limit_window_hours: env_parse("RATE_LIMIT_WINDOW_HOURS", 72)?,
            search_enabled: env_parse("SEARCH_ENABLED", true)?,
            search_result_count: env_parse("SEARCH_RESULT_COUNT", 5)?,
            duckduckgo_api_url: env::var("DUCKDUCKGO_API_URL")
                .unwrap_or_else(|_| DUCKDUCKGO_API_URL.to_string()),
            serpapi_api_key: env::var("SERPAPI_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            serpapi_api_url: env::var("SERPAPI_API_URL")
                .unwrap_or_else(|_| SERPAPI_API_URL.to_string()),
            store_timeout_secs: env_parse("STORE_TIMEOUT_SECS", 5)?,
            search_timeout_secs: env_parse("SEARCH_TIMEOUT_SECS", 5)?,
            reply_timeout_secs: env_parse("REPLY_TIMEOUT_SECS", 5)?,
            processing_deadline_secs: env_parse("PROCESSING_DEADLINE_SECS", 25)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            anyhow::bail!("HISTORY_LIMIT must be at least 1");
        }
        if self.rate_limit_ceiling <= 0 {
            anyhow::bail!("RATE_LIMIT_CEILING must be positive");
        }
        if self.rate_limit_window_hours <= 0
            || self.rate_limit_window_hours > MAX_RATE_LIMIT_WINDOW_HOURS
        {
            anyhow::bail!(
                "RATE_LIMIT_WINDOW_HOURS must be between 1 and {}",
                MAX_RATE_LIMIT_WINDOW_HOURS
            );
        }
        if self.search_result_count == 0 {
            anyhow::bail!("SEARCH_RESULT_COUNT must be at least 1");
        }
        if self.processing_deadline_secs == 0 {
            anyhow::bail!("PROCESSING_DEADLINE_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn processing_deadline(&self) -> Duration {
        Duration::from_secs(self.processing_deadline_secs)
    }

    /// The rate window; `None` when the hour count is outside chrono's range.
    pub fn rate_limit_window(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_hours(self.rate_limit_window_hours)
    }
}
