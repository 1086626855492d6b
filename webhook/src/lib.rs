//! # webhook
//!
//! The message-processing pipeline behind the LINE webhook endpoint.
//!
//! - [`signature`] – HMAC-SHA256 signature verification of the raw body
//! - [`rate_limiter`] – rolling-window admission per user
//! - [`event`] – inbound payload and event model
//! - [`request`] – transport-neutral request/response pair
//! - [`pipeline`] – [`WebhookPipeline`]: verify → admit → context → generate → persist → deliver

pub mod event;
pub mod pipeline;
pub mod rate_limiter;
pub mod request;
pub mod signature;

pub use event::{EventSource, MessageContent, MessageEvent, WebhookEvent, WebhookPayload};
pub use pipeline::{
    EventOutcome, PipelineSettings, WebhookPipeline, APOLOGY_TEXT, LIMIT_REACHED_TEXT,
    UNSUPPORTED_INPUT_TEXT,
};
pub use rate_limiter::RateLimiter;
pub use request::{WebhookRequest, WebhookResponse};
pub use signature::{compute_signature, find_signature_header, verify, SIGNATURE_HEADER};
