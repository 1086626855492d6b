//! LLM configuration loaded from environment variables.
//!
//! Azure OpenAI is selected when `AZURE_OPENAI_ENDPOINT` is set; otherwise the OpenAI-compatible
//! backend is used with `OPENAI_API_KEY` / `OPENAI_BASE_URL`.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use openai_client::{CompletionOptions, OpenAIClient, DEFAULT_AZURE_API_VERSION};

use crate::generator::DEFAULT_GENERATION_TIMEOUT;
use crate::OpenAILlmClient;

/// Which completion endpoint to talk to.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmBackend {
    OpenAI {
        api_key: String,
        base_url: String,
    },
    Azure {
        api_key: String,
        endpoint: String,
        deployment: String,
        api_version: String,
    },
}

/// LLM config loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvLlmConfig {
    pub backend: LlmBackend,
    pub model: String,
    pub options: CompletionOptions,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
}

/// Reads `key` and parses it; unset or blank means `default`, unparsable is an error.
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        _ => Ok(default),
    }
}

impl EnvLlmConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("AZURE_OPENAI_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty())
        {
            Some(endpoint) => LlmBackend::Azure {
                api_key: env::var("AZURE_OPENAI_API_KEY")
                    .context("AZURE_OPENAI_API_KEY not set")?,
                endpoint,
                deployment: env::var("AZURE_OPENAI_DEPLOYMENT_NAME")
                    .context("AZURE_OPENAI_DEPLOYMENT_NAME not set")?,
                api_version: env::var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|_| DEFAULT_AZURE_API_VERSION.to_string()),
            },
            None => LlmBackend::OpenAI {
                api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            },
        };

        let model = env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let defaults = CompletionOptions::default();
        let options = CompletionOptions {
            max_output_tokens: env_parse("AI_MAX_OUTPUT_TOKENS", defaults.max_output_tokens)?,
            temperature: env_parse("AI_TEMPERATURE", defaults.temperature)?,
        };
        let system_prompt = env::var("SYSTEM_PROMPT")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let timeout = Duration::from_secs(env_parse(
            "AI_TIMEOUT_SECS",
            DEFAULT_GENERATION_TIMEOUT.as_secs(),
        )?);

        Ok(Self {
            backend,
            model,
            options,
            system_prompt,
            timeout,
        })
    }

    /// Builds the OpenAI-backed client described by this config.
    pub fn build_client(&self) -> OpenAILlmClient {
        let client = match &self.backend {
            LlmBackend::OpenAI { api_key, base_url } => {
                OpenAIClient::with_base_url(api_key.clone(), base_url.clone())
            }
            LlmBackend::Azure {
                api_key,
                endpoint,
                deployment,
                api_version,
            } => OpenAIClient::azure(
                api_key.clone(),
                endpoint.clone(),
                deployment.clone(),
                api_version.clone(),
            ),
        };
        OpenAILlmClient::new(client, self.model.clone()).with_options(self.options)
    }
}
