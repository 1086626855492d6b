//! Reply primitive for delivering messages back to the chat platform.
//!
//! [`ReplyClient`] is transport-agnostic; [`LineReplyClient`] implements it over the LINE
//! Messaging API reply endpoint. A reply token is single-use, so callers invoke `reply` at most
//! once per inbound event and never retry.

use crate::error::{RelayError, Result};
use crate::types::ReplyMessage;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

/// Default LINE Messaging API base URL.
pub const LINE_API_BASE: &str = "https://api.line.me";

/// LINE rejects text messages longer than this many characters.
pub const LINE_MAX_TEXT_CHARS: usize = 5000;

/// Delivers a reply for one inbound event, identified by its reply token.
#[async_trait]
pub trait ReplyClient: Send + Sync {
    async fn reply(&self, reply_token: &str, message: &ReplyMessage) -> Result<()>;
}

/// Cuts `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_reply_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<ReplyMessage>,
}

/// reqwest-based implementation of [`ReplyClient`] for the LINE Messaging API.
#[derive(Clone)]
pub struct LineReplyClient {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl LineReplyClient {
    /// Creates a client using the given channel access token and the public LINE API.
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            api_base: LINE_API_BASE.to_string(),
        }
    }

    /// Points the client at another API base (e.g. a mock server in tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn reply_url(&self) -> String {
        format!("{}/v2/bot/message/reply", self.api_base)
    }
}

#[async_trait]
impl ReplyClient for LineReplyClient {
    #[instrument(skip(self, reply_token, message))]
    async fn reply(&self, reply_token: &str, message: &ReplyMessage) -> Result<()> {
        let message = match message {
            ReplyMessage::Text { text } => {
                ReplyMessage::text(truncate_reply_text(text, LINE_MAX_TEXT_CHARS))
            }
        };
        let body = ReplyRequest {
            reply_token,
            messages: vec![message],
        };

        let response = self
            .client
            .post(self.reply_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Reply(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RelayError::Reply(format!(
                "LINE reply API returned {}: {}",
                status, detail
            )));
        }

        info!(status = %status, "LINE reply sent");
        Ok(())
    }
}
