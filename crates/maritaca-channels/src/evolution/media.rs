//! Media download via `getBase64FromMediaMessage`.

use serde_json::{json, Value};

use maritaca_core::error::MaritacaError;
use maritaca_core::traits::MediaDownload;

use super::EvolutionClient;

impl EvolutionClient {
    pub(crate) async fn fetch_media(
        &self,
        message_id: &str,
    ) -> Result<MediaDownload, MaritacaError> {
        let payload = json!({
            "message": { "key": { "id": message_id } },
            "convertToMp4": false,
        });
        let result = self
            .post("chat", "getBase64FromMediaMessage", &payload)
            .await?;

        let base64 = result
            .get("base64")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MaritacaError::Transport(format!(
                    "evolution: no media payload for message {message_id}"
                ))
            })?
            .to_string();

        Ok(MediaDownload {
            base64,
            file_name: result
                .get("fileName")
                .and_then(Value::as_str)
                .map(str::to_string),
            mimetype: result
                .get("mimetype")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
