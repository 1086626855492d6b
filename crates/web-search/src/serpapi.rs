//! SerpApi provider (Google results, quota-limited, requires an API key).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::{SearchProvider, SearchResult};

pub const SERPAPI_API_URL: &str = "https://serpapi.com/search";

#[derive(Debug, Clone)]
pub struct SerpApiProvider {
    client: Client,
    api_key: String,
    api_url: String,
}

impl SerpApiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_api_url(api_key, SERPAPI_API_URL)
    }

    pub fn with_api_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    fn name(&self) -> &str {
        "SerpApi"
    }

    async fn search(&self, query: &str, count: usize) -> anyhow::Result<Vec<SearchResult>> {
        let num = count.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                ("num", num.as_str()),
                ("hl", "ja"),
                ("gl", "jp"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("SerpApi error: {}", status);
        }

        let body: SerpResponse = response.json().await?;
        let results: Vec<SearchResult> = body
            .organic_results
            .into_iter()
            .take(count)
            .map(|r| SearchResult::new(r.title, r.link, r.snippet))
            .collect();

        info!(
            query = %query,
            result_count = results.len(),
            source = "SerpApi",
            "Search completed"
        );
        Ok(results)
    }
}
