//! SQLite-backed persistence for the Maritaca bot.
//!
//! Split into focused submodules:
//! - `users` / `groups` — identity upserts keyed by stable platform ids
//! - `messages` — message history, favorites
//! - `whitelist` — the allow-list gating capability dispatch
//! - `reminders` — reminder rows doubling as the scheduler's job registry
//! - `interactions` — per-call token accounting for the consumption report
//! - `media` — gallery rows for inline images

mod groups;
mod interactions;
mod media;
mod messages;
mod reminders;
mod users;
mod whitelist;

pub use groups::Group;
pub use interactions::Consumption;
pub use media::MediaRow;
pub use messages::StoredMessage;
pub use reminders::Reminder;
pub use users::User;
pub use whitelist::SenderType;

use maritaca_core::{config::MemoryConfig, error::MaritacaError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Timestamp format used for all TEXT datetime columns (UTC).
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &MemoryConfig) -> Result<Self, MaritacaError> {
        if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MaritacaError::Store(format!("failed to create data dir: {e}")))?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.db_path))
            .map_err(|e| MaritacaError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| MaritacaError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {}", config.db_path);

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ephemeral in-memory store. Used by tests and the status check.
    pub async fn in_memory() -> Result<Self, MaritacaError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| MaritacaError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| MaritacaError::Store(format!("failed to connect to sqlite: {e}")))?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Run SQL migrations, tracking which have already been applied.
    pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), MaritacaError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        MaritacaError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| MaritacaError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    MaritacaError::Store(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    Store::in_memory().await.unwrap()
}
