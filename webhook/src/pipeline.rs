//! Pipeline orchestrator: one webhook request in, one status/body pair out.
//!
//! Request level: credentials → body decode → signature → payload parse. Any failure here
//! answers the request without touching a single event.
//!
//! Event level (text message): upsert user → admit → history → search → store user turn →
//! generate → store reply → deliver. Storage and search failures degrade the context, generation
//! failure sends a fixed apology, delivery failure is only logged. Events of one request run
//! concurrently and never affect each other.
//!
//! Everything before delivery shares one processing deadline, started when the request arrives:
//! each store, search and generation call gets at most the time left. The reply call has its own
//! timeout on top, so a request finishes within `processing_deadline + reply_timeout`.
//!
//! **External interactions:** ConversationStore (users/messages), SearchAugmenter (web search),
//! ResponseGenerator (completion endpoint), ReplyClient (LINE reply API).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use llm_client::ResponseGenerator;
use relay_core::{ReplyClient, ReplyMessage, Role};
use serde_json::Value;
use storage::{ConversationStore, StorageError, WindowPolicy};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{error, info, instrument, warn};
use web_search::SearchAugmenter;

use crate::event::{MessageContent, MessageEvent, WebhookEvent, WebhookPayload};
use crate::rate_limiter::RateLimiter;
use crate::request::{WebhookRequest, WebhookResponse};
use crate::signature::{find_signature_header, verify};

// --- User-facing fixed replies ---
pub const UNSUPPORTED_INPUT_TEXT: &str = "テキストメッセージでお話しいただけると嬉しいです！";
pub const APOLOGY_TEXT: &str =
    "申し訳ございません。エラーが発生しました。しばらく時間をおいてから再度お試しください。";
pub const LIMIT_REACHED_TEXT: &str =
    "ご利用上限に達しました。しばらく時間をおいてから再度お試しください。";

/// Tunables of the pipeline. Defaults follow the production constants.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// HMAC secret; `None` is answered 500 unless verification is skipped.
    pub channel_secret: Option<String>,
    /// Diagnostic bypass of signature verification. Logs a warning on every request.
    pub skip_signature_validation: bool,
    /// Conversation Context size.
    pub history_limit: usize,
    pub window_policy: WindowPolicy,
    pub search_result_count: usize,
    pub store_timeout: Duration,
    pub reply_timeout: Duration,
    /// Budget for all work before delivery, counted from request arrival.
    pub processing_deadline: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_secret: None,
            skip_signature_validation: false,
            history_limit: 10,
            window_policy: WindowPolicy::default(),
            search_result_count: 5,
            store_timeout: Duration::from_secs(5),
            reply_timeout: Duration::from_secs(5),
            processing_deadline: Duration::from_secs(25),
        }
    }
}

/// Terminal state of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Reply generated and delivered. `degraded` when storage was partly unavailable.
    Delivered { degraded: bool },
    /// Ceiling reached; limit text sent, nothing persisted.
    LimitReached,
    /// Non-text input; fixed text sent.
    Unsupported,
    /// Completion failed; apology sent (best effort).
    GenerationFailed,
    /// Processing deadline passed before a reply was ready; apology sent (best effort).
    DeadlineExceeded,
    /// The reply API call failed or timed out.
    DeliveryFailed,
    /// Event type the relay does not act on.
    Ignored,
    /// Event could not be decoded.
    Malformed,
}

#[derive(Clone)]
pub struct WebhookPipeline {
    store: Arc<dyn ConversationStore>,
    rate_limiter: RateLimiter,
    augmenter: Option<SearchAugmenter>,
    generator: ResponseGenerator,
    reply_client: Arc<dyn ReplyClient>,
    settings: PipelineSettings,
}

impl WebhookPipeline {
    // ---------- Construction ----------

    /// `augmenter: None` disables search augmentation.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        augmenter: Option<SearchAugmenter>,
        generator: ResponseGenerator,
        reply_client: Arc<dyn ReplyClient>,
        settings: PipelineSettings,
    ) -> Self {
        let rate_limiter = RateLimiter::new(store.clone(), settings.window_policy);
        Self {
            store,
            rate_limiter,
            augmenter,
            generator,
            reply_client,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    // ---------- Request level ----------

    /// Handles one webhook call. Never fails: every outcome is a status/body pair.
    #[instrument(skip_all, fields(body_len = request.body.len(), base64 = request.is_base64_encoded))]
    pub async fn handle(&self, request: WebhookRequest) -> WebhookResponse {
        let deadline = Instant::now() + self.settings.processing_deadline;
        let skip_signature = self.settings.skip_signature_validation;
        let secret = self
            .settings
            .channel_secret
            .as_deref()
            .filter(|s| !s.is_empty());

        if secret.is_none() && !skip_signature {
            error!("Missing LINE credentials");
            return WebhookResponse::internal("Missing LINE credentials");
        }

        if request.body.is_empty() {
            error!("No request body");
            return WebhookResponse::bad_request("No request body");
        }

        let body = if request.is_base64_encoded {
            match decode_base64_body(&request.body) {
                Some(decoded) => decoded,
                None => {
                    error!("Request body is not valid base64");
                    return WebhookResponse::bad_request("Invalid base64 body");
                }
            }
        } else {
            request.body
        };

        let signature = find_signature_header(&request.headers);
        let secret_state = if secret.is_some() { "present" } else { "missing" };
        info!(
            has_signature = signature.is_some(),
            channel_secret = secret_state,
            body_len = body.len(),
            "Request details"
        );

        if skip_signature {
            warn!("Signature validation is SKIPPED - only for testing!");
        } else {
            let Some(signature) = signature else {
                error!("No signature header");
                return WebhookResponse::unauthorized("No signature header");
            };
            if !verify(&body, signature, secret.unwrap_or_default()) {
                error!("Invalid signature");
                return WebhookResponse::unauthorized("Invalid signature");
            }
        }

        let payload: WebhookPayload = match serde_json::from_slice(&body) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to parse JSON body");
                return WebhookResponse::bad_request("Invalid JSON body");
            }
        };

        info!(
            events = payload.events.len(),
            destination = %payload.destination,
            "Parsed body"
        );

        let outcomes = join_all(
            payload
                .events
                .into_iter()
                .enumerate()
                .map(|(index, event)| self.run_event(index, event, deadline)),
        )
        .await;

        info!(outcomes = ?outcomes, "Webhook handled");
        WebhookResponse::ok()
    }

    // ---------- Event level ----------

    /// Runs one raw event to its terminal state, with a processing deadline starting now.
    pub async fn process_event(&self, event_index: usize, event: Value) -> EventOutcome {
        let deadline = Instant::now() + self.settings.processing_deadline;
        self.run_event(event_index, event, deadline).await
    }

    #[instrument(skip(self, event, deadline))]
    async fn run_event(&self, event_index: usize, event: Value, deadline: Instant) -> EventOutcome {
        let event = match WebhookEvent::from_value(event) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Skipping malformed event");
                return EventOutcome::Malformed;
            }
        };

        let MessageEvent {
            reply_token,
            source,
            message,
        } = match event {
            WebhookEvent::Message(message_event) => message_event,
            WebhookEvent::Other => {
                info!("Ignoring non-message event");
                return EventOutcome::Ignored;
            }
        };

        let token_state = if reply_token.is_empty() { "missing" } else { "present" };
        info!(reply_token = token_state, "Processing message event");

        match message {
            MessageContent::Text { text } => {
                let Some(user_id) = source.user_id.filter(|id| !id.is_empty()) else {
                    warn!("Text message without source userId, skipping");
                    return EventOutcome::Malformed;
                };
                self.process_text(&reply_token, &user_id, &text, deadline)
                    .await
            }
            MessageContent::Image => {
                if self.deliver(&reply_token, UNSUPPORTED_INPUT_TEXT).await {
                    EventOutcome::Unsupported
                } else {
                    EventOutcome::DeliveryFailed
                }
            }
            MessageContent::Other => {
                info!("Ignoring unsupported message type");
                EventOutcome::Ignored
            }
        }
    }

    #[instrument(skip(self, reply_token, text, deadline), fields(message_len = text.len()))]
    async fn process_text(
        &self,
        reply_token: &str,
        user_id: &str,
        text: &str,
        deadline: Instant,
    ) -> EventOutcome {
        info!("User message received");

        let mut degraded = false;

        // Admitted
        let mut storage_ok = match self.bounded(deadline, self.store.upsert_user(user_id)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database error (continuing without history)");
                degraded = true;
                false
            }
        };

        if storage_ok {
            match self.bounded(deadline, self.rate_limiter.admit(user_id)).await {
                Ok(admission) if !admission.allowed => {
                    info!(
                        current_count = admission.current_count,
                        "Rate limit reached"
                    );
                    return if self.deliver(reply_token, LIMIT_REACHED_TEXT).await {
                        EventOutcome::LimitReached
                    } else {
                        EventOutcome::DeliveryFailed
                    };
                }
                Ok(admission) => {
                    info!(current_count = admission.current_count, "Message admitted");
                }
                Err(e) => {
                    warn!(error = %e, "Admission unavailable, continuing");
                    degraded = true;
                }
            }
        }

        // ContextAssembled
        let history = if storage_ok {
            match self
                .bounded(
                    deadline,
                    self.store.recent_history(user_id, self.settings.history_limit),
                )
                .await
            {
                Ok(history) => history,
                Err(e) => {
                    warn!(error = %e, "History unavailable, continuing with empty history");
                    degraded = true;
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        info!(history_count = history.len(), "Conversation history retrieved");

        let search_context = match &self.augmenter {
            Some(augmenter) => {
                let search = augmenter.augment(text, self.settings.search_result_count);
                match timeout_at(deadline, search).await {
                    Ok(context) => context,
                    Err(_) => {
                        warn!("Processing deadline reached during search, continuing without it");
                        None
                    }
                }
            }
            None => None,
        };

        if storage_ok {
            if let Err(e) = self
                .bounded(deadline, self.store.append(user_id, Role::User, text))
                .await
            {
                warn!(error = %e, "Failed to save user message");
                degraded = true;
                storage_ok = false;
            }
        }

        // Generated
        let generation = self
            .generator
            .generate(text, &history, search_context.as_deref());
        let response = match timeout_at(deadline, generation).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to generate response");
                self.deliver(reply_token, APOLOGY_TEXT).await;
                return EventOutcome::GenerationFailed;
            }
            Err(_) => {
                error!(
                    deadline = ?self.settings.processing_deadline,
                    "Processing deadline reached before a response was generated"
                );
                self.deliver(reply_token, APOLOGY_TEXT).await;
                return EventOutcome::DeadlineExceeded;
            }
        };
        info!(
            response_len = response.len(),
            db_available = storage_ok,
            augmented = search_context.is_some(),
            "AI response generated"
        );

        // Persisted
        if storage_ok {
            if let Err(e) = self
                .bounded(deadline, self.store.append(user_id, Role::Assistant, &response))
                .await
            {
                warn!(error = %e, "Failed to save AI response");
                degraded = true;
            }
        }

        // Delivered
        if self.deliver(reply_token, &response).await {
            EventOutcome::Delivered { degraded }
        } else {
            EventOutcome::DeliveryFailed
        }
    }

    // ---------- Collaborator calls ----------

    /// Runs a store call under the store timeout, cut short by the processing deadline.
    async fn bounded<T>(
        &self,
        deadline: Instant,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        let limit = self
            .settings
            .store_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        timeout(limit, call)
            .await
            .map_err(|_| StorageError::Timeout(limit))?
    }

    /// Sends one text reply. Single attempt: the reply token cannot be reused.
    async fn deliver(&self, reply_token: &str, text: &str) -> bool {
        let message = ReplyMessage::text(text);
        match timeout(
            self.settings.reply_timeout,
            self.reply_client.reply(reply_token, &message),
        )
        .await
        {
            Ok(Ok(())) => {
                info!("Reply sent successfully");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to send reply");
                false
            }
            Err(_) => {
                error!(timeout = ?self.settings.reply_timeout, "Reply timed out");
                false
            }
        }
    }
}

/// Decodes a base64 body, ignoring surrounding whitespace.
fn decode_base64_body(body: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(body).ok()?;
    STANDARD.decode(text.trim()).ok()
}
