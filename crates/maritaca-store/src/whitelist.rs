//! The allow-list gating capability dispatch.
//!
//! History is recorded for everyone; only listed senders get responses.

use super::Store;
use maritaca_core::error::MaritacaError;

/// Which kind of sender a whitelist entry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderType {
    User,
    Group,
}

impl SenderType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl Store {
    pub async fn is_whitelisted(
        &self,
        sender_type: SenderType,
        sender_id: i64,
    ) -> Result<bool, MaritacaError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM whitelist WHERE sender_type = ? AND sender_id = ? LIMIT 1",
        )
        .bind(sender_type.as_str())
        .bind(sender_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("whitelist lookup failed: {e}")))?;
        Ok(row.is_some())
    }

    pub async fn add_to_whitelist(
        &self,
        sender_type: SenderType,
        sender_id: i64,
    ) -> Result<(), MaritacaError> {
        sqlx::query("INSERT OR IGNORE INTO whitelist (sender_type, sender_id) VALUES (?, ?)")
            .bind(sender_type.as_str())
            .bind(sender_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("whitelist insert failed: {e}")))?;
        Ok(())
    }

    pub async fn remove_from_whitelist(
        &self,
        sender_type: SenderType,
        sender_id: i64,
    ) -> Result<bool, MaritacaError> {
        let result = sqlx::query("DELETE FROM whitelist WHERE sender_type = ? AND sender_id = ?")
            .bind(sender_type.as_str())
            .bind(sender_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("whitelist delete failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}
