//! Admission pipeline: everything between a decoded webhook event and the
//! router.
//!
//! Order matters and is uniform across chat kinds: staleness first, then
//! identity and history persistence, then the whitelist gate, then (for
//! groups) mention activation. History is recorded for everyone; only
//! listed senders get responses.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, warn};

use maritaca_core::error::MaritacaError;
use maritaca_core::event::{Conversation, InboundEvent};
use maritaca_core::media::MediaContext;
use maritaca_store::{SenderType, User};

use super::routing::RouteContext;
use super::Gateway;

impl Gateway {
    /// Process one inbound event end to end. Never propagates: the webhook
    /// already acknowledged the delivery, so failures are logged here.
    pub async fn process_event(&self, conversation: Conversation, event: InboundEvent) {
        if let Err(e) = self.admit(conversation, event).await {
            error!("event processing failed: {e}");
        }
    }

    async fn admit(
        &self,
        conversation: Conversation,
        event: InboundEvent,
    ) -> Result<(), MaritacaError> {
        let sent_at = DateTime::<Utc>::from_timestamp(event.message_timestamp, 0)
            .unwrap_or_else(Utc::now);

        // Staleness first: a backlog replayed after downtime must not
        // trigger a burst of late replies. Nothing is persisted.
        let max_age = Duration::minutes(self.config.ingest.max_age_minutes);
        if Utc::now() - sent_at > max_age {
            debug!("dropping stale message {} from {sent_at}", event.key.id);
            return Ok(());
        }

        let media = MediaContext::extract(&event);
        let message_id = event.key.id.clone();

        let (remote_id, user, group_id) = match &conversation {
            Conversation::Group { jid, remote_id } => {
                let Some(participant) = event.participant_id() else {
                    debug!("group message {message_id} without participant, dropping");
                    return Ok(());
                };
                let user = self
                    .store
                    .upsert_user(
                        &participant,
                        event.push_name.as_deref(),
                        event.participant_phone().as_deref(),
                    )
                    .await?;

                let group = self.store.upsert_group(jid).await?;
                if group.name.is_none() {
                    self.backfill_group_info(group.id, remote_id).await;
                }

                (remote_id.clone(), user, Some(group.id))
            }
            Conversation::Direct { lid, phone } => {
                // Some clients omit the alt jid; the phone id must then
                // key the row, or every such sender collapses onto one.
                let src_id = if lid.is_empty() { phone } else { lid };
                let user = self
                    .store
                    .upsert_user(src_id, event.push_name.as_deref(), Some(phone))
                    .await?;
                (phone.clone(), user, None)
            }
        };

        self.backfill_profile_picture(&user, &event).await;

        // Audio arrives with no text; the transcript becomes the message
        // content so routing and history both see words.
        let mut text = media.text.clone().unwrap_or_default();

        self.store
            .upsert_message(&message_id, user.id, group_id, &text, sent_at)
            .await?;

        if media.image_message.is_some() {
            self.store
                .record_media(&message_id, user.id, group_id, "image", media.text.as_deref())
                .await?;
        }

        // The whitelist gate. Groups are denied silently; a direct sender
        // gets told once per message why nothing else happens.
        match group_id {
            Some(gid) => {
                if !self.store.is_whitelisted(SenderType::Group, gid).await? {
                    debug!("group {gid} not whitelisted, recorded only");
                    return Ok(());
                }
            }
            None => {
                if !self.store.is_whitelisted(SenderType::User, user.id).await? {
                    return self
                        .transport
                        .send_text(&remote_id, &self.config.bot.deny_notice, Some(&message_id))
                        .await;
                }
            }
        }

        // Groups require an explicit mention of the bot; direct chats are
        // always addressed to it.
        let bot_src_id = self.bot_src_id().await;
        if group_id.is_some() && !self.is_mentioned(&media, bot_src_id.as_deref()) {
            return Ok(());
        }

        if let Some(ref audio_id) = media.audio_message {
            match self.transcribe_inline(audio_id, user.id, group_id).await {
                Ok(transcript) => {
                    text = transcript;
                    self.store
                        .upsert_message(&message_id, user.id, group_id, &text, sent_at)
                        .await?;
                }
                Err(e) => {
                    warn!("inline transcription failed for {audio_id}: {e}");
                }
            }
        }

        // A bare mention is a liveness check, not a request.
        if self.is_bare_mention(&text, bot_src_id.as_deref()) {
            return self
                .transport
                .send_text(&remote_id, &self.config.bot.ready_notice, Some(&message_id))
                .await;
        }

        let cleaned_text = self.commands.clean_text(&text);
        self.route(RouteContext {
            remote_id,
            message_id,
            user,
            group_id,
            raw_text: text,
            cleaned_text,
            media,
        })
        .await
    }

    /// Download and transcribe an inline voice note.
    async fn transcribe_inline(
        &self,
        audio_message_id: &str,
        user_id: i64,
        group_id: Option<i64>,
    ) -> Result<String, MaritacaError> {
        let download = self.transport.download_media(audio_message_id).await?;
        let response = self.transcriber.transcribe(&download.base64).await?;
        if let Err(e) = self
            .store
            .log_interaction(
                Some(user_id),
                group_id,
                "transcriber",
                &response.model,
                response.prompt_tokens,
                response.completion_tokens,
            )
            .await
        {
            warn!("failed to log transcription interaction: {e}");
        }
        Ok(response.text)
    }

    /// The bot's own stable platform id, once it has seen itself in a chat.
    async fn bot_src_id(&self) -> Option<String> {
        match self.store.find_user_by_name(&self.config.bot.name).await {
            Ok(user) => user.map(|u| u.src_id),
            Err(e) => {
                warn!("bot user lookup failed: {e}");
                None
            }
        }
    }

    /// Mention activation: the instance number or the bot's own user row.
    fn is_mentioned(&self, media: &MediaContext, bot_src_id: Option<&str>) -> bool {
        media.mentions.iter().any(|m| {
            m == &self.config.bot.number || bot_src_id.is_some_and(|src| m == src)
        })
    }

    /// A message that is nothing but the bot's mention.
    fn is_bare_mention(&self, text: &str, bot_src_id: Option<&str>) -> bool {
        let trimmed = text.trim();
        trimmed == format!("@{}", self.config.bot.number)
            || bot_src_id.is_some_and(|src| trimmed == format!("@{src}"))
    }

    /// One-time group metadata backfill. Best effort: the platform lookup
    /// failing must not block the message.
    async fn backfill_group_info(&self, group_db_id: i64, remote_id: &str) {
        match self.transport.get_group_info(remote_id).await {
            Ok(info) => {
                if let Err(e) = self
                    .store
                    .set_group_info(group_db_id, &info.subject, info.description.as_deref())
                    .await
                {
                    warn!("failed to store group info: {e}");
                }
            }
            Err(e) => warn!("group info lookup failed for {remote_id}: {e}"),
        }
    }

    /// Best-effort profile picture backfill on first sight.
    async fn backfill_profile_picture(&self, user: &User, event: &InboundEvent) {
        if user.profile_pic_url.is_some() {
            return;
        }
        let number = match event.participant_phone().or_else(|| user.phone_number.clone()) {
            Some(n) => n,
            None => return,
        };
        match self.transport.profile_picture_url(&number).await {
            Ok(Some(url)) => {
                if let Err(e) = self.store.set_profile_picture(user.id, &url).await {
                    warn!("failed to store profile picture: {e}");
                }
            }
            Ok(None) => {}
            Err(e) => debug!("profile picture lookup failed for {number}: {e}"),
        }
    }
}
