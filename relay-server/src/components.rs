//! Component factory: builds the store, collaborators and pipeline from config. Isolates assembly
//! logic from the runner.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use llm_client::{LlmClient, ResponseGenerator};
use relay_core::{LineReplyClient, ReplyClient};
use storage::{ConversationRepository, ConversationStore, InMemoryConversationStore, WindowPolicy};
use tracing::{error, info, instrument, warn};
use web_search::{DuckDuckGoProvider, SearchAugmenter, SearchProvider, SerpApiProvider};
use webhook::{PipelineSettings, WebhookPipeline};

use crate::config::{PipelineConfig, RelayConfig};

/// Long-lived handles of a running relay. The store is kept separately so it can be closed at
/// shutdown.
pub struct RelayComponents {
    pub store: Arc<dyn ConversationStore>,
    pub pipeline: Arc<WebhookPipeline>,
}

/// File path behind a SQLite URL, or `None` for in-memory databases.
fn sqlite_file_path(database_url: &str) -> Option<&str> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(path)
    }
}

/// Opens the conversation store selected by STORE_TYPE. Creates the SQLite parent directory.
#[instrument(skip(config))]
pub async fn create_store(config: &RelayConfig) -> Result<Arc<dyn ConversationStore>> {
    let base = config.base();
    match base.store_type.as_str() {
        "memory" => {
            info!("Using in-memory conversation store");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
        _ => {
            if let Some(parent) = sqlite_file_path(&base.database_url)
                .and_then(|p| Path::new(p).parent())
                .filter(|p| !p.as_os_str().is_empty())
            {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            info!(database_url = %base.database_url, "Using SQLite conversation store");
            let repo = ConversationRepository::new(&base.database_url)
                .await
                .map_err(|e| {
                    error!(
                        error = %e,
                        database_url = %base.database_url,
                        "Failed to initialize conversation storage"
                    );
                    anyhow::anyhow!("Failed to initialize conversation storage: {}", e)
                })?;
            Ok(Arc::new(repo))
        }
    }
}

/// DuckDuckGo first, then SerpApi when a key is configured. `None` when search is disabled.
pub fn build_search_augmenter(config: &PipelineConfig) -> Option<SearchAugmenter> {
    if !config.search_enabled {
        info!("Search augmentation disabled");
        return None;
    }

    let mut providers: Vec<Arc<dyn SearchProvider>> = vec![Arc::new(
        DuckDuckGoProvider::with_api_url(config.duckduckgo_api_url.clone()),
    )];
    if let Some(ref key) = config.serpapi_api_key {
        providers.push(Arc::new(SerpApiProvider::with_api_url(
            key.clone(),
            config.serpapi_api_url.clone(),
        )));
    }

    let augmenter = SearchAugmenter::new(providers).with_timeout(config.search_timeout());
    info!(providers = ?augmenter.provider_names(), "Search augmentation enabled");
    Some(augmenter)
}

/// Maps config onto pipeline settings. An out-of-range rate window falls back to the default.
pub fn pipeline_settings(config: &RelayConfig) -> PipelineSettings {
    let pipeline = config.pipeline();
    let window = pipeline.rate_limit_window().unwrap_or_else(|| {
        let fallback = WindowPolicy::default().window;
        warn!(
            rate_limit_window_hours = pipeline.rate_limit_window_hours,
            fallback_hours = fallback.num_hours(),
            "Rate limit window out of range, using default"
        );
        fallback
    });
    PipelineSettings {
        channel_secret: config.base().channel_secret.clone(),
        skip_signature_validation: config.base().skip_signature_validation,
        history_limit: pipeline.history_limit,
        window_policy: WindowPolicy::new(pipeline.rate_limit_ceiling, window),
        search_result_count: pipeline.search_result_count,
        store_timeout: pipeline.store_timeout(),
        reply_timeout: pipeline.reply_timeout(),
        processing_deadline: pipeline.processing_deadline(),
    }
}

/// Builds the pipeline around injected store, reply client and LLM client.
pub fn build_pipeline(
    config: &RelayConfig,
    store: Arc<dyn ConversationStore>,
    reply_client: Arc<dyn ReplyClient>,
    llm: Arc<dyn LlmClient>,
) -> WebhookPipeline {
    let mut generator = ResponseGenerator::new(llm).with_timeout(config.llm().timeout);
    if let Some(ref prompt) = config.llm().system_prompt {
        generator = generator.with_system_prompt(prompt.clone());
    }

    WebhookPipeline::new(
        store,
        build_search_augmenter(config.pipeline()),
        generator,
        reply_client,
        pipeline_settings(config),
    )
}

/// Opens the store and builds the pipeline with the LINE and OpenAI clients from config.
#[instrument(skip(config))]
pub async fn build_relay_components(config: &RelayConfig) -> Result<RelayComponents> {
    let store = create_store(config).await?;

    let reply_client: Arc<dyn ReplyClient> = Arc::new(
        LineReplyClient::new(config.base().channel_access_token.clone())
            .with_api_base(config.base().line_api_url.clone()),
    );
    let llm_client = config.llm().build_client();
    info!(model = %llm_client.model(), "LLM client ready");
    let llm: Arc<dyn LlmClient> = Arc::new(llm_client);

    let pipeline = Arc::new(build_pipeline(config, store.clone(), reply_client, llm));

    Ok(RelayComponents { store, pipeline })
}
