//! # LLM client abstraction
//!
//! Defines the [`LlmClient`] trait and an OpenAI implementation, the env-based [`EnvLlmConfig`],
//! and the [`ResponseGenerator`] that turns a user turn plus context into a reply.

use anyhow::Result;
use async_trait::async_trait;
use openai_client::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use prompt::{ChatMessage, MessageRole};

mod config;
mod generator;
mod openai_llm;

#[cfg(test)]
mod generator_test;

pub use config::{env_parse, EnvLlmConfig, LlmBackend};
pub use generator::{GenerationError, ResponseGenerator, DEFAULT_GENERATION_TIMEOUT};
pub use openai_client::CompletionOptions;
pub use openai_llm::OpenAILlmClient;

/// LLM client interface: request a completion for a list of messages.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the model reply text for the given messages (system/user/assistant), sent as-is.
    async fn get_llm_response_with_messages(&self, messages: Vec<ChatMessage>) -> Result<String>;
}

/// Converts a single [`ChatMessage`] into OpenAI API message format.
fn chat_message_to_openai(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = msg.content.clone();
    let openai_msg: ChatCompletionRequestMessage = match msg.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(openai_msg)
}
