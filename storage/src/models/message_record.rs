//! Message record model.
//!
//! Maps to the `messages` table; each row belongs to exactly one user.

use chrono::{DateTime, Utc};
use relay_core::{HistoryEntry, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub user_id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for HistoryEntry {
    fn from(record: MessageRecord) -> Self {
        HistoryEntry::new(record.role, record.content)
    }
}
