//! Token accounting: one row per language-model call.

use super::Store;
use chrono::{DateTime, Utc};
use maritaca_core::error::MaritacaError;

use crate::DATETIME_FMT;

/// Aggregated consumption for the report window.
#[derive(Debug, Clone, Default)]
pub struct Consumption {
    pub total_interactions: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    /// Per-model breakdown: (model, interactions, prompt tokens, completion tokens).
    pub by_model: Vec<(String, i64, i64, i64)>,
}

impl Store {
    pub async fn log_interaction(
        &self,
        user_id: Option<i64>,
        group_id: Option<i64>,
        agent: &str,
        model: &str,
        prompt_tokens: i64,
        completion_tokens: i64,
    ) -> Result<(), MaritacaError> {
        sqlx::query(
            "INSERT INTO interactions (user_id, group_id, agent, model, prompt_tokens, completion_tokens)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(group_id)
        .bind(agent)
        .bind(model)
        .bind(prompt_tokens)
        .bind(completion_tokens)
        .execute(&self.pool)
        .await
        .map_err(|e| MaritacaError::Store(format!("interaction insert failed: {e}")))?;
        Ok(())
    }

    /// Consumption since `since`, scoped to a group when `group_id` is set,
    /// otherwise to the user.
    pub async fn consumption_since(
        &self,
        user_id: Option<i64>,
        group_id: Option<i64>,
        since: DateTime<Utc>,
    ) -> Result<Consumption, MaritacaError> {
        let since = since.format(DATETIME_FMT).to_string();

        let by_model: Vec<(String, i64, i64, i64)> = match group_id {
            Some(gid) => sqlx::query_as(
                "SELECT model, COUNT(*), SUM(prompt_tokens), SUM(completion_tokens)
                 FROM interactions
                 WHERE group_id = ? AND inserted_at >= ?
                 GROUP BY model ORDER BY COUNT(*) DESC",
            )
            .bind(gid)
            .bind(&since)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query_as(
                "SELECT model, COUNT(*), SUM(prompt_tokens), SUM(completion_tokens)
                 FROM interactions
                 WHERE user_id = ? AND group_id IS NULL AND inserted_at >= ?
                 GROUP BY model ORDER BY COUNT(*) DESC",
            )
            .bind(user_id)
            .bind(&since)
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(|e| MaritacaError::Store(format!("consumption query failed: {e}")))?;

        let mut report = Consumption::default();
        for (model, count, prompt, completion) in by_model {
            report.total_interactions += count;
            report.prompt_tokens += prompt;
            report.completion_tokens += completion;
            report.by_model.push((model, count, prompt, completion));
        }
        Ok(report)
    }
}
