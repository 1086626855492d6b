//! Rolling-window rate limiter over a [`ConversationStore`].
//!
//! The decision itself (reset, deny or increment) is made atomically by the store, so
//! concurrent admissions for one identity never pass the ceiling or reset a window twice.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use storage::{Admission, ConversationStore, StorageError, WindowPolicy};
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn ConversationStore>,
    policy: WindowPolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn ConversationStore>, policy: WindowPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    /// Admits one message for `user_id` now. The user must already exist.
    pub async fn admit(&self, user_id: &str) -> Result<Admission, StorageError> {
        self.admit_at(user_id, Utc::now()).await
    }

    /// Admits one message for `user_id` at `now`.
    #[instrument(skip(self))]
    pub async fn admit_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Admission, StorageError> {
        let admission = self.store.try_admit(user_id, now, &self.policy).await?;
        debug!(
            allowed = admission.allowed,
            current_count = admission.current_count,
            ceiling = self.policy.ceiling,
            "Admission decided"
        );
        Ok(admission)
    }
}
