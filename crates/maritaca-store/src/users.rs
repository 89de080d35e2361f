//! User identity rows, upserted on every admitted message.

use super::Store;
use maritaca_core::error::MaritacaError;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub src_id: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub profile_pic_url: Option<String>,
}

impl Store {
    /// Find or create a user by stable platform id.
    ///
    /// Name and phone are refreshed when the event carries them; a present
    /// stored value is never overwritten by an absent one. The upsert is a
    /// single statement so concurrent first sightings converge on one row.
    pub async fn upsert_user(
        &self,
        src_id: &str,
        name: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<User, MaritacaError> {
        sqlx::query(
            "INSERT INTO users (src_id, name, phone_number) VALUES (?, NULLIF(?, ''), NULLIF(?, ''))
             ON CONFLICT(src_id) DO UPDATE SET
                 name = COALESCE(NULLIF(excluded.name, ''), users.name),
                 phone_number = COALESCE(NULLIF(excluded.phone_number, ''), users.phone_number),
                 updated_at = datetime('now')",
        )
        .bind(src_id)
        .bind(name.unwrap_or(""))
        .bind(phone_number.unwrap_or(""))
        .execute(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("user upsert failed: {e}")))?;

        self.find_user_by_src_id(src_id)
            .await?
            .ok_or_else(|| MaritacaError::Store(format!("user vanished after upsert: {src_id}")))
    }

    pub async fn find_user_by_src_id(&self, src_id: &str) -> Result<Option<User>, MaritacaError> {
        let row: Option<(i64, String, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT id, src_id, name, phone_number, profile_pic_url
                 FROM users WHERE src_id = ?",
            )
            .bind(src_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("user lookup failed: {e}")))?;

        Ok(row.map(User::from_row))
    }

    /// Look up a user by display name — used for the bot's own record.
    pub async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, MaritacaError> {
        let row: Option<(i64, String, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT id, src_id, name, phone_number, profile_pic_url
                 FROM users WHERE name = ?",
            )
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("user lookup failed: {e}")))?;

        Ok(row.map(User::from_row))
    }

    /// Store the latest profile-picture reference for a user.
    pub async fn set_profile_picture(
        &self,
        user_id: i64,
        url: &str,
    ) -> Result<(), MaritacaError> {
        sqlx::query("UPDATE users SET profile_pic_url = ?, updated_at = datetime('now') WHERE id = ?")
            .bind(url)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| MaritacaError::Store(format!("profile pic update failed: {e}")))?;
        Ok(())
    }
}

impl User {
    fn from_row(
        (id, src_id, name, phone_number, profile_pic_url): (
            i64,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
        ),
    ) -> Self {
        Self {
            id,
            src_id,
            name,
            phone_number,
            profile_pic_url,
        }
    }
}
