//! Conversation repository: users, append-only message log and rolling-window counters in SQLite.
//!
//! Uses SqlitePoolManager; timestamps are stored as UTC epoch milliseconds so window comparisons
//! are numeric. Admission is decided by single conditional UPDATE statements, which SQLite
//! executes atomically, so concurrent callers for one identity cannot lose updates.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use relay_core::{HistoryEntry, Role};
use sqlx::Row;
use tracing::{debug, info, instrument};

use crate::error::StorageError;
use crate::models::{Admission, MessageRecord, UserRecord, WindowPolicy};
use crate::sqlite_pool::SqlitePoolManager;
use crate::store::ConversationStore;

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StorageError::Database(format!("Invalid timestamp: {}", ms)))
}

fn parse_role(raw: &str) -> Result<Role, StorageError> {
    raw.parse()
        .map_err(|e: relay_core::RelayError| StorageError::Database(e.to_string()))
}

#[derive(Clone)]
pub struct ConversationRepository {
    pool_manager: SqlitePoolManager,
}

impl ConversationRepository {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), sqlx::Error> {
        info!("Creating database tables if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                line_user_id TEXT NOT NULL UNIQUE,
                message_count_3days INTEGER NOT NULL DEFAULT 0,
                count_reset_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_user_created ON messages(user_id, created_at)",
        )
        .execute(pool)
        .await?;

        info!("Database tables created successfully");
        Ok(())
    }

    /// All messages of a user, oldest first. Used by tests and diagnostics.
    pub async fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRecord>, StorageError> {
        let pool = self.pool_manager.pool();

        let rows = sqlx::query(
            r#"
            SELECT m.id, m.user_id, m.role, m.content, m.created_at
            FROM messages m
            JOIN users u ON m.user_id = u.id
            WHERE u.line_user_id = ?
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<MessageRecord, StorageError> {
                let role: String = row.try_get("role")?;
                Ok(MessageRecord {
                    id: row.try_get("id")?,
                    user_id: row.try_get("user_id")?,
                    role: parse_role(&role)?,
                    content: row.try_get("content")?,
                    created_at: from_millis(row.try_get("created_at")?)?,
                })
            })
            .collect()
    }

    async fn current_count(&self, user_id: &str) -> Result<Option<i64>, StorageError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT message_count_3days FROM users WHERE line_user_id = ?")
                .bind(user_id)
                .fetch_optional(self.pool_manager.pool())
                .await?;
        Ok(row.map(|r| r.0))
    }
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    #[instrument(skip(self))]
    async fn upsert_user(&self, user_id: &str) -> Result<(), StorageError> {
        let now = Utc::now().timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO users (line_user_id, message_count_3days, count_reset_at, created_at, updated_at)
            VALUES (?, 0, ?, ?, ?)
            ON CONFLICT(line_user_id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(self.pool_manager.pool())
        .await?;

        debug!(user_id = %user_id, "User upserted");
        Ok(())
    }

    #[instrument(skip(self, content))]
    async fn append(&self, user_id: &str, role: Role, content: &str) -> Result<(), StorageError> {
        let now = Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO messages (user_id, role, content, created_at)
            SELECT id, ?, ?, ? FROM users WHERE line_user_id = ?
            "#,
        )
        .bind(role.as_str())
        .bind(content)
        .bind(now)
        .bind(user_id)
        .execute(self.pool_manager.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("user {}", user_id)));
        }

        info!(user_id = %user_id, role = %role, "Message saved");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT m.role, m.content
            FROM messages m
            JOIN users u ON m.user_id = u.id
            WHERE u.line_user_id = ?
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(self.pool_manager.pool())
        .await?;

        let mut history = rows
            .iter()
            .map(|row| -> Result<HistoryEntry, StorageError> {
                let role: String = row.try_get("role")?;
                let content: String = row.try_get("content")?;
                Ok(HistoryEntry::new(parse_role(&role)?, content))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        // Fetched newest first; restore chronological order.
        history.reverse();

        info!(
            user_id = %user_id,
            count = history.len(),
            "Retrieved conversation history"
        );
        Ok(history)
    }

    #[instrument(skip(self, policy))]
    async fn try_admit(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        policy: &WindowPolicy,
    ) -> Result<Admission, StorageError> {
        let pool = self.pool_manager.pool();
        let now_ms = now.timestamp_millis();
        let cutoff_ms = now_ms - policy.window.num_milliseconds();

        // Expired window: start a fresh one with this admission counted. Only one concurrent
        // caller can match, since the winner moves count_reset_at past the cutoff.
        let reset = sqlx::query(
            r#"
            UPDATE users
            SET message_count_3days = 1, count_reset_at = ?, updated_at = ?
            WHERE line_user_id = ? AND count_reset_at <= ?
            "#,
        )
        .bind(now_ms)
        .bind(now_ms)
        .bind(user_id)
        .bind(cutoff_ms)
        .execute(pool)
        .await?;

        if reset.rows_affected() == 1 {
            info!(user_id = %user_id, "Rate window reset");
            return Ok(Admission::allowed(1));
        }

        let incremented: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET message_count_3days = message_count_3days + 1, updated_at = ?
            WHERE line_user_id = ? AND message_count_3days < ? AND count_reset_at > ?
            RETURNING message_count_3days
            "#,
        )
        .bind(now_ms)
        .bind(user_id)
        .bind(policy.ceiling)
        .bind(cutoff_ms)
        .fetch_optional(pool)
        .await?;

        if let Some((count,)) = incremented {
            return Ok(Admission::allowed(count));
        }

        match self.current_count(user_id).await? {
            Some(count) => {
                info!(user_id = %user_id, count = count, "Admission denied, ceiling reached");
                Ok(Admission::denied(count))
            }
            None => Err(StorageError::NotFound(format!("user {}", user_id))),
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, line_user_id, message_count_3days, count_reset_at, created_at, updated_at
            FROM users WHERE line_user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool_manager.pool())
        .await?;

        row.map(|row| -> Result<UserRecord, StorageError> {
            Ok(UserRecord {
                id: row.try_get("id")?,
                line_user_id: row.try_get("line_user_id")?,
                message_count: row.try_get("message_count_3days")?,
                count_reset_at: from_millis(row.try_get("count_reset_at")?)?,
                created_at: from_millis(row.try_get("created_at")?)?,
                updated_at: from_millis(row.try_get("updated_at")?)?,
            })
        })
        .transpose()
    }

    async fn close(&self) {
        self.pool_manager.close().await;
    }
}
