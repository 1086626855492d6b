//! User record model.
//!
//! Maps to the `users` table: one row per platform identity, created lazily on first message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    /// Opaque platform identity (LINE `source.userId`).
    pub line_user_id: String,
    /// Admissions counted in the current rolling window.
    pub message_count: i64,
    /// Start of the current rolling window.
    pub count_reset_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
