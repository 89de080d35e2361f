//! Message history: one row per platform message id.

use super::{Store, DATETIME_FMT};
use chrono::{DateTime, Utc};
use maritaca_core::error::MaritacaError;

/// A stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    pub message_id: String,
    pub user_id: i64,
    pub group_id: Option<i64>,
    pub content: Option<String>,
    pub created_at: String,
    pub is_favorite: bool,
}

impl Store {
    /// Upsert a message keyed by platform message id.
    ///
    /// Re-delivery with different content updates the row in place — this
    /// is how a transcript replaces an audio placeholder.
    pub async fn upsert_message(
        &self,
        message_id: &str,
        user_id: i64,
        group_id: Option<i64>,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), MaritacaError> {
        sqlx::query(
            "INSERT INTO messages (message_id, user_id, group_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(message_id) DO UPDATE SET
                 content = excluded.content,
                 updated_at = datetime('now')",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(group_id)
        .bind(content)
        .bind(created_at.format(DATETIME_FMT).to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("message upsert failed: {e}")))?;
        Ok(())
    }

    pub async fn find_message(
        &self,
        message_id: &str,
    ) -> Result<Option<StoredMessage>, MaritacaError> {
        let row: Option<(i64, String, i64, Option<i64>, Option<String>, String, i64)> =
            sqlx::query_as(
                "SELECT id, message_id, user_id, group_id, content, created_at, is_favorite
                 FROM messages WHERE message_id = ? AND deleted_at IS NULL",
            )
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("message lookup failed: {e}")))?;

        Ok(row.map(
            |(id, message_id, user_id, group_id, content, created_at, fav)| StoredMessage {
                id,
                message_id,
                user_id,
                group_id,
                content,
                created_at,
                is_favorite: fav != 0,
            },
        ))
    }

    /// Latest messages of a conversation, oldest first — the resume window.
    /// Group scope when `group_id` is set, otherwise the user's direct chat.
    pub async fn recent_messages(
        &self,
        user_id: i64,
        group_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<(String, String)>, MaritacaError> {
        let rows: Vec<(String, String)> = match group_id {
            Some(gid) => sqlx::query_as(
                "SELECT COALESCE(u.name, u.src_id), COALESCE(m.content, '')
                 FROM messages m JOIN users u ON u.id = m.user_id
                 WHERE m.group_id = ? AND m.deleted_at IS NULL
                 ORDER BY m.created_at DESC LIMIT ?",
            )
            .bind(gid)
            .bind(limit)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as(
                "SELECT COALESCE(u.name, u.src_id), COALESCE(m.content, '')
                 FROM messages m JOIN users u ON u.id = m.user_id
                 WHERE m.user_id = ? AND m.group_id IS NULL AND m.deleted_at IS NULL
                 ORDER BY m.created_at DESC LIMIT ?",
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| MaritacaError::Store(format!("recent messages failed: {e}")))?;

        Ok(rows.into_iter().rev().collect())
    }

    /// Flip the favorite flag on a message. Returns whether a row matched.
    pub async fn set_favorite(
        &self,
        message_id: &str,
        favorite: bool,
    ) -> Result<bool, MaritacaError> {
        let result = sqlx::query(
            "UPDATE messages SET is_favorite = ?, updated_at = datetime('now')
             WHERE message_id = ? AND deleted_at IS NULL",
        )
        .bind(favorite as i64)
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("favorite update failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Favorite messages in a conversation scope, newest first.
    pub async fn favorites(
        &self,
        user_id: i64,
        group_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, MaritacaError> {
        let rows: Vec<(i64, String, i64, Option<i64>, Option<String>, String, i64)> =
            match group_id {
                Some(gid) => sqlx::query_as(
                    "SELECT id, message_id, user_id, group_id, content, created_at, is_favorite
                     FROM messages
                     WHERE group_id = ? AND is_favorite = 1 AND deleted_at IS NULL
                     ORDER BY created_at DESC LIMIT ?",
                )
                .bind(gid)
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
                None => sqlx::query_as(
                    "SELECT id, message_id, user_id, group_id, content, created_at, is_favorite
                     FROM messages
                     WHERE user_id = ? AND group_id IS NULL AND is_favorite = 1
                       AND deleted_at IS NULL
                     ORDER BY created_at DESC LIMIT ?",
                )
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await,
            }
            .map_err(|e| MaritacaError::Store(format!("favorites query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, message_id, user_id, group_id, content, created_at, fav)| StoredMessage {
                    id,
                    message_id,
                    user_id,
                    group_id,
                    content,
                    created_at,
                    is_favorite: fav != 0,
                },
            )
            .collect())
    }
}
