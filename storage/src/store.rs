//! Conversation store abstraction shared by the SQLite and in-memory implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::{HistoryEntry, Role};

use crate::error::StorageError;
use crate::models::{Admission, UserRecord, WindowPolicy};

/// Per-user conversation persistence and rate-window bookkeeping.
///
/// Callers must `upsert_user` before `append` or `try_admit`; both fail with
/// [`StorageError::NotFound`] for unknown identities.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates the user on first sight, otherwise touches its `updated_at`. Idempotent.
    async fn upsert_user(&self, user_id: &str) -> Result<(), StorageError>;

    /// Appends one message to the user's log.
    async fn append(&self, user_id: &str, role: Role, content: &str) -> Result<(), StorageError>;

    /// Up to `limit` most recent messages, oldest first. Empty (not an error) for unknown users.
    async fn recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StorageError>;

    /// Atomically resets an expired window, or counts one admission if below the ceiling.
    /// A refused admission leaves the stored count unchanged.
    async fn try_admit(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        policy: &WindowPolicy,
    ) -> Result<Admission, StorageError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError>;

    /// Releases underlying connections. Default: nothing to release.
    async fn close(&self) {}
}
