//! Gallery rows for inline media admitted by the ingestion gate.

use super::Store;
use maritaca_core::error::MaritacaError;

/// One gallery entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub id: i64,
    pub message_id: String,
    pub user_id: i64,
    pub group_id: Option<i64>,
    pub kind: String,
    pub caption: Option<String>,
    pub inserted_at: String,
}

impl Store {
    /// Record an inline media message. Re-delivery is a no-op.
    pub async fn record_media(
        &self,
        message_id: &str,
        user_id: i64,
        group_id: Option<i64>,
        kind: &str,
        caption: Option<&str>,
    ) -> Result<(), MaritacaError> {
        sqlx::query(
            "INSERT OR IGNORE INTO media (message_id, user_id, group_id, kind, caption)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(group_id)
        .bind(kind)
        .bind(caption)
        .execute(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("media insert failed: {e}")))?;
        Ok(())
    }

    /// Gallery listing for a conversation scope, newest first. When `term`
    /// is set, filters by caption substring.
    pub async fn list_media(
        &self,
        user_id: i64,
        group_id: Option<i64>,
        term: Option<&str>,
        limit: i64,
    ) -> Result<Vec<MediaRow>, MaritacaError> {
        let pattern = term.map(|t| format!("%{t}%"));

        let rows: Vec<(i64, String, i64, Option<i64>, String, Option<String>, String)> =
            match (group_id, &pattern) {
                (Some(gid), Some(p)) => sqlx::query_as(
                    "SELECT id, message_id, user_id, group_id, kind, caption, inserted_at
                     FROM media WHERE group_id = ? AND caption LIKE ?
                     ORDER BY inserted_at DESC LIMIT ?",
                )
                .bind(gid)
                .bind(p)
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
                (Some(gid), None) => sqlx::query_as(
                    "SELECT id, message_id, user_id, group_id, kind, caption, inserted_at
                     FROM media WHERE group_id = ?
                     ORDER BY inserted_at DESC LIMIT ?",
                )
                .bind(gid)
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
                (None, Some(p)) => sqlx::query_as(
                    "SELECT id, message_id, user_id, group_id, kind, caption, inserted_at
                     FROM media WHERE user_id = ? AND group_id IS NULL AND caption LIKE ?
                     ORDER BY inserted_at DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(p)
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
                (None, None) => sqlx::query_as(
                    "SELECT id, message_id, user_id, group_id, kind, caption, inserted_at
                     FROM media WHERE user_id = ? AND group_id IS NULL
                     ORDER BY inserted_at DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
            }
            .map_err(|e| MaritacaError::Store(format!("media query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, message_id, user_id, group_id, kind, caption, inserted_at)| MediaRow {
                    id,
                    message_id,
                    user_id,
                    group_id,
                    kind,
                    caption,
                    inserted_at,
                },
            )
            .collect())
    }
}
