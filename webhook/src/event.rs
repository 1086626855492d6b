//! Inbound webhook payload.
//!
//! The payload is parsed in two steps: the envelope keeps each event as raw JSON, then every
//! event is decoded on its own so one malformed event does not reject its siblings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `{destination, events: [...]}`. A missing or `null` `events` means no events.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub destination: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One webhook event, keyed by its `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebhookEvent {
    Message(MessageEvent),
    /// follow, unfollow, postback, ...
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub reply_token: String,
    pub source: EventSource,
    pub message: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Message body, keyed by the message `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
    Image,
    /// sticker, video, audio, location, ...
    #[serde(other)]
    Other,
}

impl WebhookEvent {
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}
