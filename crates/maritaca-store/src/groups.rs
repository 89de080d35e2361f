//! Group rows, with lazily backfilled platform metadata.

use super::Store;
use maritaca_core::error::MaritacaError;

/// A group conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub group_jid: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Store {
    /// Find or create a group by its bare jid. Idempotent under
    /// concurrent first sightings.
    pub async fn upsert_group(&self, group_jid: &str) -> Result<Group, MaritacaError> {
        sqlx::query("INSERT OR IGNORE INTO groups (group_jid) VALUES (?)")
            .bind(group_jid)
            .execute(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("group upsert failed: {e}")))?;

        let row: (i64, String, Option<String>, Option<String>) = sqlx::query_as(
            "SELECT id, group_jid, name, description FROM groups WHERE group_jid = ?",
        )
        .bind(group_jid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("group lookup failed: {e}")))?;

        Ok(Group {
            id: row.0,
            group_jid: row.1,
            name: row.2,
            description: row.3,
        })
    }

    /// Backfill name/description from the platform lookup.
    pub async fn set_group_info(
        &self,
        group_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), MaritacaError> {
        sqlx::query("UPDATE groups SET name = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(group_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("group info update failed: {e}")))?;
        Ok(())
    }
}
