//! Response Generator: one completion request per user turn.
//!
//! Builds System → history → current user turn (with optional search block) via `prompt`, calls
//! the [`LlmClient`] under a deadline and maps every failure to a [`GenerationError`].

use std::sync::Arc;
use std::time::Duration;

use prompt::{build_chat_messages, DEFAULT_SYSTEM_MESSAGE};
use relay_core::HistoryEntry;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::LlmClient;

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("Completion endpoint error: {0}")]
    Endpoint(String),

    #[error("Completion returned no text")]
    EmptyResponse,
}

#[derive(Clone)]
pub struct ResponseGenerator {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    timeout: Duration,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            system_prompt: DEFAULT_SYSTEM_MESSAGE.to_string(),
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Generates the assistant reply for `user_message`.
    ///
    /// `history` must not contain the current message; `augmented_context` is the formatted
    /// search block, `None` or blank for no augmentation.
    #[instrument(skip_all, fields(history_len = history.len(), augmented = augmented_context.is_some()))]
    pub async fn generate(
        &self,
        user_message: &str,
        history: &[HistoryEntry],
        augmented_context: Option<&str>,
    ) -> Result<String, GenerationError> {
        let messages =
            build_chat_messages(&self.system_prompt, history, user_message, augmented_context);

        let response = tokio::time::timeout(
            self.timeout,
            self.llm.get_llm_response_with_messages(messages),
        )
        .await
        .map_err(|_| {
            warn!(timeout = ?self.timeout, "Completion timed out");
            GenerationError::Timeout(self.timeout)
        })?
        .map_err(|e| GenerationError::Endpoint(format!("{:#}", e)))?;

        if response.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        info!(response_len = response.len(), "Completion generated");
        Ok(response)
    }
}
