//! Outbound sends through the Evolution API.

use async_trait::async_trait;
use serde_json::{json, Value};

use maritaca_core::error::MaritacaError;
use maritaca_core::traits::{GroupInfo, MediaDownload, Transport};

use super::EvolutionClient;

fn with_quote(mut payload: Value, reply_to: Option<&str>) -> Value {
    if let Some(id) = reply_to {
        payload["quoted"] = json!({ "key": { "id": id } });
    }
    payload
}

#[async_trait]
impl Transport for EvolutionClient {
    async fn send_text(
        &self,
        remote_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), MaritacaError> {
        let payload = with_quote(json!({ "number": remote_id, "text": text }), reply_to);
        self.post("message", "sendText", &payload).await?;
        Ok(())
    }

    async fn send_audio(
        &self,
        remote_id: &str,
        audio_base64: &str,
        reply_to: Option<&str>,
    ) -> Result<(), MaritacaError> {
        let payload = with_quote(
            json!({ "number": remote_id, "audio": audio_base64 }),
            reply_to,
        );
        self.post("message", "sendWhatsAppAudio", &payload).await?;
        Ok(())
    }

    async fn send_image(
        &self,
        remote_id: &str,
        image_base64: &str,
        caption: Option<&str>,
    ) -> Result<(), MaritacaError> {
        let mut payload = json!({
            "number": remote_id,
            "mediatype": "image",
            "mimetype": "image/png",
            "media": image_base64,
        });
        if let Some(caption) = caption {
            payload["caption"] = json!(caption);
        }
        self.post("message", "sendMedia", &payload).await?;
        Ok(())
    }

    async fn send_sticker(
        &self,
        remote_id: &str,
        webp_base64: &str,
    ) -> Result<(), MaritacaError> {
        let payload = json!({ "number": remote_id, "sticker": webp_base64 });
        self.post("message", "sendSticker", &payload).await?;
        Ok(())
    }

    async fn download_media(&self, message_id: &str) -> Result<MediaDownload, MaritacaError> {
        self.fetch_media(message_id).await
    }

    async fn get_group_info(&self, group_remote_id: &str) -> Result<GroupInfo, MaritacaError> {
        let result = self
            .get(
                "group",
                "findGroupInfos",
                &[("groupJid", group_remote_id)],
            )
            .await?;

        let subject = result
            .get("subject")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MaritacaError::Transport("evolution: group info missing subject".to_string())
            })?
            .to_string();
        let description = result
            .get("desc")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(GroupInfo {
            subject,
            description,
        })
    }

    async fn profile_picture_url(&self, jid: &str) -> Result<Option<String>, MaritacaError> {
        let result = self
            .post(
                "chat",
                "fetchProfilePictureUrl",
                &json!({ "number": jid }),
            )
            .await?;
        Ok(result
            .get("profilePictureUrl")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}
