//! Reminder rows double as the scheduler's job registry.
//!
//! A reminder is pending while `deleted_at` is null; delivery soft-deletes
//! it, so a process restart never re-fires an already-sent reminder.

use super::{Store, DATETIME_FMT};
use chrono::{DateTime, Utc};
use maritaca_core::error::MaritacaError;
use uuid::Uuid;

/// A scheduled reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: String,
    pub user_id: Option<i64>,
    pub group_id: Option<i64>,
    /// Outbound address the reminder is sent to.
    pub remote_id: String,
    pub remind_at: String,
    pub message: String,
}

impl Store {
    pub async fn create_reminder(
        &self,
        user_id: Option<i64>,
        group_id: Option<i64>,
        remote_id: &str,
        remind_at: DateTime<Utc>,
        message: &str,
    ) -> Result<Reminder, MaritacaError> {
        let id = Uuid::new_v4().to_string();
        let remind_at = remind_at.format(DATETIME_FMT).to_string();

        sqlx::query(
            "INSERT INTO reminders (id, user_id, group_id, remote_id, remind_at, message)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(group_id)
        .bind(remote_id)
        .bind(&remind_at)
        .bind(message)
        .execute(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("reminder insert failed: {e}")))?;

        Ok(Reminder {
            id,
            user_id,
            group_id,
            remote_id: remote_id.to_string(),
            remind_at,
            message: message.to_string(),
        })
    }

    /// Reminders due at or before `now` that have not been delivered.
    pub async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, MaritacaError> {
        let rows: Vec<(String, Option<i64>, Option<i64>, String, String, String)> =
            sqlx::query_as(
                "SELECT id, user_id, group_id, remote_id, remind_at, message
                 FROM reminders
                 WHERE deleted_at IS NULL AND remind_at <= ?
                 ORDER BY remind_at",
            )
            .bind(now.format(DATETIME_FMT).to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("due reminders query failed: {e}")))?;

        Ok(rows.into_iter().map(Reminder::from_row).collect())
    }

    /// All pending reminders, soonest first.
    pub async fn pending_reminders(&self) -> Result<Vec<Reminder>, MaritacaError> {
        let rows: Vec<(String, Option<i64>, Option<i64>, String, String, String)> =
            sqlx::query_as(
                "SELECT id, user_id, group_id, remote_id, remind_at, message
                 FROM reminders WHERE deleted_at IS NULL ORDER BY remind_at",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("pending reminders query failed: {e}")))?;

        Ok(rows.into_iter().map(Reminder::from_row).collect())
    }

    /// Mark a reminder delivered (or explicitly removed). Returns whether
    /// the row was still pending — the at-most-once guard.
    pub async fn soft_delete_reminder(&self, id: &str) -> Result<bool, MaritacaError> {
        let result = sqlx::query(
            "UPDATE reminders SET deleted_at = datetime('now')
             WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("reminder delete failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}

impl Reminder {
    fn from_row(
        (id, user_id, group_id, remote_id, remind_at, message): (
            String,
            Option<i64>,
            Option<i64>,
            String,
            String,
            String,
        ),
    ) -> Self {
        Self {
            id,
            user_id,
            group_id,
            remote_id,
            remind_at,
            message,
        }
    }
}
