//! SQLite connection pool wrapper for the storage crate.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Manages a single SQLite pool; creates the DB file if missing.
///
/// In-memory URLs (`:memory:`, `sqlite::memory:`) get exactly one connection that never idles
/// out, since every SQLite connection would otherwise open its own empty database.
#[derive(Clone)]
pub struct SqlitePoolManager {
    pool: SqlitePool,
}

fn is_in_memory(database_url: &str) -> bool {
    matches!(database_url, ":memory:" | "sqlite::memory:" | "sqlite://:memory:")
}

impl SqlitePoolManager {
    /// Creates a pool for the given database URL (`sqlite://path`, plain file path, or in-memory).
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        info!("Initializing SQLite pool: {}", database_url);

        let in_memory = is_in_memory(database_url);
        let options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        } else {
            SqliteConnectOptions::new()
                .filename(database_url)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        let options = options
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        Ok(Self { pool })
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes all connections; later queries fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite pool closed");
    }
}
