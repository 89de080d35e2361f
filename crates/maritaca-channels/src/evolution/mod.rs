//! Evolution API client.
//!
//! Evolution fronts a WhatsApp instance with a plain HTTP API: every
//! call is a POST (or GET) against `{base}/{area}/{action}/{instance}`
//! authenticated by an `apikey` header.

mod media;
mod send;

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use maritaca_core::config::EvolutionConfig;
use maritaca_core::error::MaritacaError;

const SEND_TIMEOUT: Duration = Duration::from_secs(60);

pub struct EvolutionClient {
    client: reqwest::Client,
    base_url: String,
    instance: String,
    api_key: String,
}

impl EvolutionClient {
    pub fn from_config(config: &EvolutionConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            instance: config.instance.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, area: &str, action: &str) -> String {
        format!("{}/{area}/{action}/{}", self.base_url, self.instance)
    }

    pub(crate) async fn post(
        &self,
        area: &str,
        action: &str,
        payload: &Value,
    ) -> Result<Value, MaritacaError> {
        let url = self.url(area, action);
        debug!("evolution: POST {area}/{action}");

        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| MaritacaError::Transport(format!("evolution request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(MaritacaError::Transport(format!(
                "evolution {action} returned {status}: {text}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| MaritacaError::Transport(format!("evolution: bad response: {e}")))
    }

    pub(crate) async fn get(
        &self,
        area: &str,
        action: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, MaritacaError> {
        let url = self.url(area, action);
        debug!("evolution: GET {area}/{action}");

        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| MaritacaError::Transport(format!("evolution request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(MaritacaError::Transport(format!(
                "evolution {action} returned {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| MaritacaError::Transport(format!("evolution: bad response: {e}")))
    }
}
