//! Transport-neutral request and response of the pipeline.

use serde_json::{json, Value};

/// Raw inbound webhook call.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    /// Header name/value pairs as received (names in any case).
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Body is base64 text that must be decoded to the signed bytes.
    pub is_base64_encoded: bool,
}

impl WebhookRequest {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn base64_encoded(mut self) -> Self {
        self.is_base64_encoded = true;
        self
    }
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: Value,
}

impl WebhookResponse {
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: json!({ "message": "OK" }),
        }
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::error(400, message)
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::error(401, message)
    }

    pub fn internal(message: &str) -> Self {
        Self::error(500, message)
    }

    /// The `error` field, if this is an error response.
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}
