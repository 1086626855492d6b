//! DuckDuckGo Instant Answer provider (free, no API key).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::{SearchProvider, SearchResult};

pub const DUCKDUCKGO_API_URL: &str = "https://api.duckduckgo.com/";

const USER_AGENT: &str = "LINE-Bot/1.0";

#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    client: Client,
    api_url: String,
}

impl DuckDuckGoProvider {
    pub fn new() -> Self {
        Self::with_api_url(DUCKDUCKGO_API_URL)
    }

    /// Uses a different endpoint (tests, proxies).
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
        }
    }
}

impl Default for DuckDuckGoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Abstract", default)]
    abstract_text: String,
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Grouped topics (`{Name, Topics}`) have neither field and are skipped.
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

impl InstantAnswer {
    fn into_results(self, count: usize) -> Vec<SearchResult> {
        let mut results = Vec::new();

        if !self.abstract_text.is_empty() {
            let title = if self.heading.is_empty() {
                "概要".to_string()
            } else {
                self.heading
            };
            results.push(SearchResult::new(title, self.abstract_url, self.abstract_text));
        }

        let topics = self.related_topics.into_iter().filter_map(|topic| {
            match (topic.text, topic.first_url) {
                (Some(text), Some(url)) if !text.is_empty() && !url.is_empty() => {
                    let title = text
                        .split(" - ")
                        .next()
                        .filter(|t| !t.is_empty())
                        .unwrap_or("関連情報")
                        .to_string();
                    Some(SearchResult::new(title, url, text))
                }
                _ => None,
            }
        });
        results.extend(topics);

        results.truncate(count);
        results
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &str {
        "DuckDuckGo"
    }

    async fn search(&self, query: &str, count: usize) -> anyhow::Result<Vec<SearchResult>> {
        let response = self
            .client
            .get(&self.api_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("DuckDuckGo API error: {}", status);
        }

        let answer: InstantAnswer = response.json().await?;
        let results = answer.into_results(count);

        info!(
            query = %query,
            result_count = results.len(),
            source = "DuckDuckGo",
            "Search completed"
        );
        Ok(results)
    }
}
