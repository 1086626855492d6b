//! In-memory [`ConversationStore`]: no persistence, same semantics as the SQLite repository.
//!
//! Selected with `STORE_TYPE=memory`; also used by pipeline tests. Every operation runs under
//! one mutex, so admissions for the same identity are linearizable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::{HistoryEntry, Role};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{Admission, MessageRecord, UserRecord, WindowPolicy};
use crate::store::ConversationStore;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<String, UserRecord>,
    messages: HashMap<i64, Vec<MessageRecord>>,
    next_user_id: i64,
    next_message_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Database("in-memory store lock poisoned".to_string()))
    }

    /// Overwrites a user's window state. Lets tests start from a given count or window age.
    pub fn set_window(
        &self,
        user_id: &str,
        message_count: i64,
        count_reset_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", user_id)))?;
        user.message_count = message_count;
        user.count_reset_at = count_reset_at;
        Ok(())
    }

    /// Total messages stored for a user.
    pub fn message_count(&self, user_id: &str) -> usize {
        let Ok(inner) = self.lock() else {
            return 0;
        };
        inner
            .users
            .get(user_id)
            .and_then(|u| inner.messages.get(&u.id))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn upsert_user(&self, user_id: &str) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut inner = self.lock()?;
        if let Some(user) = inner.users.get_mut(user_id) {
            user.updated_at = now;
            return Ok(());
        }

        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.insert(
            user_id.to_string(),
            UserRecord {
                id,
                line_user_id: user_id.to_string(),
                message_count: 0,
                count_reset_at: now,
                created_at: now,
                updated_at: now,
            },
        );
        info!(user_id = %user_id, "New user created");
        Ok(())
    }

    async fn append(&self, user_id: &str, role: Role, content: &str) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        let owner = inner
            .users
            .get(user_id)
            .map(|u| u.id)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", user_id)))?;

        inner.next_message_id += 1;
        let record = MessageRecord {
            id: inner.next_message_id,
            user_id: owner,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        inner.messages.entry(owner).or_default().push(record);
        debug!(user_id = %user_id, role = %role, "Message saved");
        Ok(())
    }

    async fn recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let inner = self.lock()?;
        let Some(messages) = inner
            .users
            .get(user_id)
            .and_then(|u| inner.messages.get(&u.id))
        else {
            return Ok(Vec::new());
        };

        // Append order is creation order; take the newest `limit`, keep oldest first.
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..]
            .iter()
            .cloned()
            .map(HistoryEntry::from)
            .collect())
    }

    async fn try_admit(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        policy: &WindowPolicy,
    ) -> Result<Admission, StorageError> {
        let mut inner = self.lock()?;
        let user = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", user_id)))?;

        if policy.is_expired(user.count_reset_at, now) {
            user.message_count = 1;
            user.count_reset_at = now;
            user.updated_at = now;
            return Ok(Admission::allowed(1));
        }
        if user.message_count >= policy.ceiling {
            return Ok(Admission::denied(user.message_count));
        }
        user.message_count += 1;
        user.updated_at = now;
        Ok(Admission::allowed(user.message_count))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }
}
