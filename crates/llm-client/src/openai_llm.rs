//! [`LlmClient`] over openai-client. Messages are sent as-is; the system turn is assembled by `prompt`.

use anyhow::Result;
use async_trait::async_trait;
use prompt::ChatMessage;
use tracing::instrument;

use super::{chat_message_to_openai, LlmClient};
use openai_client::CompletionOptions;

/// OpenAI / Azure OpenAI backed [`LlmClient`].
#[derive(Clone)]
pub struct OpenAILlmClient {
    client: openai_client::OpenAIClient,
    model: String,
    options: CompletionOptions,
}

impl OpenAILlmClient {
    pub fn new(client: openai_client::OpenAIClient, model: String) -> Self {
        Self {
            client,
            model,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    #[instrument(skip(self, messages))]
    async fn get_llm_response_with_messages(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let openai_messages = messages
            .iter()
            .map(chat_message_to_openai)
            .collect::<Result<Vec<_>>>()?;
        self.client
            .chat_completion(&self.model, openai_messages, self.options)
            .await
    }
}
