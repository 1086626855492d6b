//! # OpenAI API client
//!
//! Thin wrapper around [async-openai] for non-streaming chat completion against either the
//! OpenAI API (or a compatible endpoint) or an Azure OpenAI deployment.
//! Provides token masking for safe logging and a simple request/response API.

use async_openai::config::{AzureConfig, OpenAIConfig};
use async_openai::types::{
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
};
use async_openai::Client;
use std::sync::Arc;

pub use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};

/// Default Azure OpenAI `api-version` query parameter.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Masks an API key/token for safe logging: shows first 7 chars + "***" + last 4 chars.
/// If length <= 11, returns "***" to avoid leaking any part of the key.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_char_boundary(7) || !token.is_char_boundary(len - 4) {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}

/// Fixed generation parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Upper bound on generated tokens (`max_completion_tokens`).
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 1000,
            temperature: 1.0,
        }
    }
}

#[derive(Clone)]
enum Backend {
    OpenAI(Arc<Client<OpenAIConfig>>),
    Azure(Arc<Client<AzureConfig>>),
}

/// OpenAI chat client. Wraps an async-openai client; holds the API key only for masked logging.
#[derive(Clone)]
pub struct OpenAIClient {
    backend: Backend,
    api_key_for_logging: Option<String>,
}

impl OpenAIClient {
    /// Builds a client using the given API key and default API base URL.
    pub fn new(api_key: String) -> Self {
        let api_key_for_logging = Some(api_key.clone());
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            backend: Backend::OpenAI(Arc::new(Client::with_config(config))),
            api_key_for_logging,
        }
    }

    /// Builds a client with a custom base URL (e.g. for proxies or compatible endpoints).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let api_key_for_logging = Some(api_key.clone());
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            backend: Backend::OpenAI(Arc::new(Client::with_config(config))),
            api_key_for_logging,
        }
    }

    /// Builds a client for an Azure OpenAI deployment. The deployment selects the model, so
    /// the `model` argument of [`chat_completion`](Self::chat_completion) is informational.
    pub fn azure(
        api_key: String,
        endpoint: String,
        deployment_id: String,
        api_version: String,
    ) -> Self {
        let api_key_for_logging = Some(api_key.clone());
        let config = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_key(api_key)
            .with_deployment_id(deployment_id)
            .with_api_version(api_version);
        Self {
            backend: Backend::Azure(Arc::new(Client::with_config(config))),
            api_key_for_logging,
        }
    }

    /// Sends a chat completion request and returns the first choice's text.
    ///
    /// Logs masked API key and token usage. Errors if the response has no choices or the first
    /// choice has no content.
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        options: CompletionOptions,
    ) -> anyhow::Result<String> {
        let masked = self
            .api_key_for_logging
            .as_deref()
            .map(mask_token)
            .unwrap_or_else(|| "***".to_string());

        tracing::info!(
            model = %model,
            message_count = messages.len(),
            max_output_tokens = options.max_output_tokens,
            temperature = options.temperature,
            api_key = %masked,
            "OpenAI chat_completion request"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .max_tokens(options.max_output_tokens)
            .temperature(options.temperature)
            .build()?;

        if let Ok(json) = serde_json::to_string(&request) {
            tracing::debug!(request_json = %json, "OpenAI chat_completion request JSON");
        }

        let response = self.create(request).await?;

        if let Some(ref u) = response.usage {
            tracing::info!(
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                total_tokens = u.total_tokens,
                "OpenAI chat_completion usage"
            );
        }

        match response.choices.first() {
            Some(choice) => match choice.message.content.clone() {
                Some(content) => Ok(content),
                None => anyhow::bail!("OpenAI response choice has no content"),
            },
            None => anyhow::bail!("No response from OpenAI"),
        }
    }

    async fn create(
        &self,
        request: CreateChatCompletionRequest,
    ) -> anyhow::Result<CreateChatCompletionResponse> {
        let response = match &self.backend {
            Backend::OpenAI(client) => client.chat().create(request).await?,
            Backend::Azure(client) => client.chat().create(request).await?,
        };
        Ok(response)
    }
}
