//! Capability handlers — one per explicit command or classified intent.
//!
//! Handlers receive an owned [`RouteContext`] view and are responsible
//! for their own outbound sends. Capability failures that the sender can
//! do something about (no quoted image, unparseable reminder) turn into
//! chat replies instead of errors.

use chrono::{Duration, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use maritaca_core::error::MaritacaError;
use maritaca_core::traits::{ChatRequest, ChatResponse};

use super::routing::RouteContext;
use super::Gateway;

const SUMMARY_SYSTEM_PROMPT: &str = "\
You summarize a WhatsApp conversation. Write a short recap in the language \
of the messages, grouping by topic. Mention who said what only when it \
matters. No preamble.";

const REMEMBER_SYSTEM_PROMPT: &str = "\
You extract a reminder from a WhatsApp message. Reply with a single JSON \
object and nothing else, with keys: `datetime` (UTC, format \
`%Y-%m-%d %H:%M:%S`), `message` (the reminder text, phrased as a note to \
the sender), `feedback_message` (a short confirmation in the language of \
the request).";

const DESCRIBE_PROMPT: &str = "Describe this image in detail.";

/// Reminder plan the model returns for `!remember`.
#[derive(Debug, Deserialize)]
struct ReminderPlan {
    datetime: String,
    message: String,
    feedback_message: String,
}

impl Gateway {
    fn chat_system_prompt(&self) -> String {
        format!(
            "You are {}, a helpful WhatsApp assistant. Answer in the \
             language of the message. Keep replies short; this is a chat, \
             not an essay.",
            self.config.bot.name
        )
    }

    /// Quoted reply into the originating conversation.
    async fn reply(&self, ctx: &RouteContext, text: &str) -> Result<(), MaritacaError> {
        self.transport
            .send_text(&ctx.remote_id, text, Some(&ctx.message_id))
            .await
    }

    async fn log_usage(&self, ctx: &RouteContext, agent: &str, response: &ChatResponse) {
        if let Err(e) = self
            .store
            .log_interaction(
                Some(ctx.user.id),
                ctx.group_id,
                agent,
                &response.model,
                response.prompt_tokens,
                response.completion_tokens,
            )
            .await
        {
            warn!("failed to log {agent} interaction: {e}");
        }
    }

    /// The message id carrying image bytes: an inline image wins over a
    /// quoted one.
    fn image_source<'a>(&self, ctx: &'a RouteContext) -> Option<&'a str> {
        ctx.media
            .image_message
            .as_deref()
            .or(ctx.media.image_quote.as_deref())
    }

    pub(super) async fn handle_help(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        self.reply(ctx, &self.commands.help_text(&self.config.bot.name))
            .await
    }

    pub(super) async fn handle_model(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let o = &self.config.openrouter;
        let text = format!(
            "🧠 *Models in use*\n\
             text: `{}`\naudio: `{}`\nimage: `{}`\nclassifier: `{}`",
            o.text_model, o.audio_model, o.image_model, o.classifier_model
        );
        self.reply(ctx, &text).await
    }

    pub(super) async fn handle_resume(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let window = self.config.memory.resume_window;
        let history = self
            .store
            .recent_messages(ctx.user.id, ctx.group_id, window)
            .await?;
        if history.is_empty() {
            return self.reply(ctx, "Nothing to summarize yet.").await;
        }

        let transcript: String = history
            .iter()
            .filter(|(_, content)| !content.is_empty())
            .map(|(name, content)| format!("{name}: {content}\n"))
            .collect();

        let response = self
            .provider
            .complete(&ChatRequest {
                system_prompt: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
                prompt: transcript,
                ..ChatRequest::default()
            })
            .await?;
        self.log_usage(ctx, "resume", &response).await;
        self.reply(ctx, &response.text).await
    }

    pub(super) async fn handle_search(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        if ctx.cleaned_text.is_empty() {
            return self.reply(ctx, "What should I search for?").await;
        }
        let response = self
            .provider
            .complete(&ChatRequest {
                system_prompt: Some(self.chat_system_prompt()),
                prompt: ctx.cleaned_text.clone(),
                web_search: true,
                ..ChatRequest::default()
            })
            .await?;
        self.log_usage(ctx, "search", &response).await;
        self.reply(ctx, &response.text).await
    }

    /// Generate an image from the prompt, or modify the referenced one.
    /// Generation failures are reported in-chat; the models refuse often
    /// enough that this is a conversation, not an error.
    pub(super) async fn handle_image(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let source = match self.image_source(ctx) {
            Some(id) => match self.transport.download_media(id).await {
                Ok(download) => Some(download.base64),
                Err(e) => {
                    warn!("image download failed for {id}: {e}");
                    return self.reply(ctx, "I could not fetch that image.").await;
                }
            },
            None => None,
        };

        if source.is_none() && ctx.cleaned_text.is_empty() {
            return self
                .reply(ctx, "Tell me what to generate, or quote an image to modify.")
                .await;
        }

        match self
            .images
            .generate(&ctx.cleaned_text, source.as_deref())
            .await
        {
            Ok(image_base64) => {
                self.transport
                    .send_image(&ctx.remote_id, &image_base64, None)
                    .await?;
                let caption = (!ctx.cleaned_text.is_empty()).then_some(ctx.cleaned_text.as_str());
                self.store
                    .record_media(&ctx.message_id, ctx.user.id, ctx.group_id, "generated", caption)
                    .await
            }
            Err(e) => {
                warn!("image generation failed: {e}");
                self.reply(ctx, "The image model declined that one. Try rephrasing.")
                    .await
            }
        }
    }

    pub(super) async fn handle_describe(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let Some(source_id) = self.image_source(ctx) else {
            return self
                .reply(ctx, "Send or quote an image for me to describe.")
                .await;
        };
        let download = self.transport.download_media(source_id).await?;
        let prompt = if ctx.cleaned_text.is_empty() {
            DESCRIBE_PROMPT
        } else {
            &ctx.cleaned_text
        };
        let response = self.images.describe(&download.base64, prompt).await?;
        self.log_usage(ctx, "describe", &response).await;
        self.reply(ctx, &response.text).await
    }

    pub(super) async fn handle_sticker(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let Some(source_id) = self.image_source(ctx) else {
            if ctx.media.video_message.is_some() || ctx.media.video_quote.is_some() {
                return self
                    .reply(
                        ctx,
                        "Animated stickers from videos are not supported yet. \
                         Send a still image instead.",
                    )
                    .await;
            }
            return self
                .reply(ctx, "Send or quote an image to turn into a sticker.")
                .await;
        };
        let download = self.transport.download_media(source_id).await?;

        // `top | bottom` captions; either side may be empty.
        let (top, bottom) = match ctx.cleaned_text.split_once('|') {
            Some((t, b)) => (some_trimmed(t), some_trimmed(b)),
            None => (some_trimmed(&ctx.cleaned_text), None),
        };

        let sticker = self
            .images
            .sticker(&download.base64, top.as_deref(), bottom.as_deref())
            .await?;
        self.transport.send_sticker(&ctx.remote_id, &sticker).await
    }

    pub(super) async fn handle_transcribe(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let Some(ref audio_id) = ctx.media.audio_quote else {
            return self.reply(ctx, "Quote a voice note to transcribe.").await;
        };
        let download = self.transport.download_media(audio_id).await?;
        let response = self.transcriber.transcribe(&download.base64).await?;
        self.log_usage(ctx, "transcriber", &response).await;
        self.reply(ctx, &format!("_{}_", response.text)).await
    }

    pub(super) async fn handle_remember(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let prompt = format!(
            "Current UTC time: {}\n\nRequest:\n{}",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            ctx.cleaned_text
        );
        let response = self
            .provider
            .complete(&ChatRequest {
                system_prompt: Some(REMEMBER_SYSTEM_PROMPT.to_string()),
                prompt,
                ..ChatRequest::default()
            })
            .await?;
        self.log_usage(ctx, "remember", &response).await;

        let Some(plan) = parse_reminder_plan(&response.text) else {
            warn!("unparseable reminder plan: {}", response.text);
            return self
                .reply(ctx, "I could not work out when to remind you. Include a day and time.")
                .await;
        };
        let Ok(remind_at) = NaiveDateTime::parse_from_str(&plan.datetime, "%Y-%m-%d %H:%M:%S")
        else {
            return self
                .reply(ctx, "I could not work out when to remind you. Include a day and time.")
                .await;
        };

        self.store
            .create_reminder(
                Some(ctx.user.id),
                ctx.group_id,
                &ctx.remote_id,
                remind_at.and_utc(),
                &plan.message,
            )
            .await?;
        self.reply(ctx, &plan.feedback_message).await
    }

    pub(super) async fn handle_consumption(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let since = Utc::now() - Duration::hours(24);
        let report = self
            .store
            .consumption_since(Some(ctx.user.id), ctx.group_id, since)
            .await?;

        if report.total_interactions == 0 {
            return self.reply(ctx, "No usage in the last 24 hours.").await;
        }

        let mut text = format!(
            "📊 *Usage, last 24h*\n\
             interactions: {}\nprompt tokens: {}\ncompletion tokens: {}\n",
            report.total_interactions, report.prompt_tokens, report.completion_tokens
        );
        for (model, count, prompt, completion) in &report.by_model {
            text.push_str(&format!("\n`{model}`: {count}x ({prompt} in / {completion} out)"));
        }
        self.reply(ctx, &text).await
    }

    pub(super) async fn handle_gallery(&self, ctx: &RouteContext) -> Result<(), MaritacaError> {
        let term = (!ctx.cleaned_text.is_empty()).then_some(ctx.cleaned_text.as_str());
        let rows = self
            .store
            .list_media(ctx.user.id, ctx.group_id, term, 10)
            .await?;

        if rows.is_empty() {
            let text = match term {
                Some(t) => format!("No gallery entries matching \"{t}\"."),
                None => "The gallery is empty.".to_string(),
            };
            return self.reply(ctx, &text).await;
        }

        let mut text = String::from("🖼️ *Gallery*\n");
        for row in &rows {
            let caption = row.caption.as_deref().unwrap_or("(no caption)");
            text.push_str(&format!("\n• [{}] {} — {}", row.kind, caption, row.inserted_at));
        }
        self.reply(ctx, &text).await
    }

    /// Mark (or unmark) the quoted message as favorite.
    pub(super) async fn handle_favorite(
        &self,
        ctx: &RouteContext,
        favorite: bool,
    ) -> Result<(), MaritacaError> {
        let quoted = ctx.media.image_quote.clone().or_else(|| {
            ctx.media
                .text_quote
                .as_ref()
                .and_then(|q| q.message_id.clone())
        });
        let Some(message_id) = quoted else {
            return self.reply(ctx, "Quote the message you want to favorite.").await;
        };

        let matched = self.store.set_favorite(&message_id, favorite).await?;
        let text = match (matched, favorite) {
            (true, true) => "⭐ Saved to favorites.",
            (true, false) => "Removed from favorites.",
            (false, _) => "I do not have that message on record.",
        };
        self.reply(ctx, text).await
    }

    pub(super) async fn handle_favorite_list(
        &self,
        ctx: &RouteContext,
    ) -> Result<(), MaritacaError> {
        let rows = self.store.favorites(ctx.user.id, ctx.group_id, 10).await?;
        if rows.is_empty() {
            return self.reply(ctx, "No favorites yet.").await;
        }

        let mut text = String::from("⭐ *Favorites*\n");
        for row in &rows {
            let content = row.content.as_deref().unwrap_or("(media)");
            text.push_str(&format!("\n• {} — {}", content, row.created_at));
        }
        self.reply(ctx, &text).await
    }

    /// The fall-through: plain conversation, optionally spoken.
    pub(super) async fn handle_conversation(
        &self,
        ctx: &RouteContext,
        wants_audio: bool,
    ) -> Result<(), MaritacaError> {
        let prompt = if ctx.cleaned_text.is_empty() {
            ctx.raw_text.clone()
        } else {
            ctx.cleaned_text.clone()
        };
        if prompt.is_empty() {
            return Ok(());
        }

        let response = self
            .provider
            .complete(&ChatRequest {
                system_prompt: Some(self.chat_system_prompt()),
                prompt,
                ..ChatRequest::default()
            })
            .await?;
        self.log_usage(ctx, "chat", &response).await;

        let lower = ctx.raw_text.to_lowercase();
        let speak = wants_audio || lower.contains("!audio");
        if speak {
            let english = lower.contains("!english");
            match self.speech.synthesize(&response.text, english).await {
                Ok(audio) => {
                    return self
                        .transport
                        .send_audio(&ctx.remote_id, &audio, Some(&ctx.message_id))
                        .await;
                }
                Err(e) => warn!("speech synthesis failed, sending text instead: {e}"),
            }
        }
        self.reply(ctx, &response.text).await
    }
}

fn some_trimmed(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Pull the JSON object out of a completion that may be fenced or padded.
fn parse_reminder_plan(raw: &str) -> Option<ReminderPlan> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    serde_json::from_str(&raw[start..=end]).ok()
}
