//! Command detection and dispatch.
//!
//! Routing resolves every admitted message to exactly one handler.
//! Explicit bang commands win in a fixed first-match order; messages
//! without one go through the intent classifier.

use maritaca_core::error::MaritacaError;
use maritaca_core::media::MediaContext;
use maritaca_store::User;

use super::intent::Intent;
use super::Gateway;

/// Explicit command carried by the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExplicitCommand {
    Help,
    Model,
    Resume,
    Transcribe,
    Search,
    Image,
    Describe,
    Sticker,
    Remember,
    Consumption,
    Gallery,
    FavoriteList,
    FavoriteRemove,
    Favorite,
}

/// Detection order is fixed: the first matching token decides, so a
/// message mixing commands behaves deterministically. The `!favorite`
/// subcommands check before the bare form.
pub(super) fn detect_explicit(text: &str) -> Option<ExplicitCommand> {
    let lower = text.to_lowercase();
    let has = |token: &str| lower.contains(token);

    if has("!help") {
        Some(ExplicitCommand::Help)
    } else if has("!model") {
        Some(ExplicitCommand::Model)
    } else if has("!resume") {
        Some(ExplicitCommand::Resume)
    } else if has("!transcribe") {
        Some(ExplicitCommand::Transcribe)
    } else if has("!search") {
        Some(ExplicitCommand::Search)
    } else if has("!image") {
        Some(ExplicitCommand::Image)
    } else if has("!describe") {
        Some(ExplicitCommand::Describe)
    } else if has("!sticker") {
        Some(ExplicitCommand::Sticker)
    } else if has("!remember") {
        Some(ExplicitCommand::Remember)
    } else if has("!consumption") {
        Some(ExplicitCommand::Consumption)
    } else if has("!gallery") {
        Some(ExplicitCommand::Gallery)
    } else if has("!favorite") {
        if has(":list") {
            Some(ExplicitCommand::FavoriteList)
        } else if has(":remove") {
            Some(ExplicitCommand::FavoriteRemove)
        } else {
            Some(ExplicitCommand::Favorite)
        }
    } else {
        None
    }
}

/// Everything a handler needs about the admitted message. Owned so
/// handlers can run detached from the webhook request.
pub(super) struct RouteContext {
    /// Outbound address of the conversation.
    pub remote_id: String,
    pub message_id: String,
    pub user: User,
    pub group_id: Option<i64>,
    /// Message text as received (post-transcription for audio).
    pub raw_text: String,
    /// Text with command tokens and mentions stripped.
    pub cleaned_text: String,
    pub media: MediaContext,
}

impl Gateway {
    /// Dispatch an admitted message to exactly one handler.
    pub(super) async fn route(&self, ctx: RouteContext) -> Result<(), MaritacaError> {
        if self.commands.has_explicit_command(&ctx.raw_text) {
            return match detect_explicit(&ctx.raw_text) {
                Some(command) => self.dispatch_explicit(command, ctx).await,
                // `!audio` / `!english` alone are modifiers, not commands;
                // the conversation handler reads them off the raw text.
                // Explicit tokens never consult the classifier.
                None => self.handle_conversation(&ctx, false).await,
            };
        }

        let (intent, wants_audio) = self
            .classify(
                &ctx.raw_text,
                &ctx.media,
                ctx.user.id,
                ctx.group_id,
            )
            .await;
        self.dispatch_intent(intent, wants_audio, ctx).await
    }

    async fn dispatch_explicit(
        &self,
        command: ExplicitCommand,
        ctx: RouteContext,
    ) -> Result<(), MaritacaError> {
        match command {
            ExplicitCommand::Help => self.handle_help(&ctx).await,
            ExplicitCommand::Model => self.handle_model(&ctx).await,
            ExplicitCommand::Resume => self.handle_resume(&ctx).await,
            ExplicitCommand::Transcribe => self.handle_transcribe(&ctx).await,
            ExplicitCommand::Search => self.handle_search(&ctx).await,
            ExplicitCommand::Image => self.handle_image(&ctx).await,
            ExplicitCommand::Describe => self.handle_describe(&ctx).await,
            ExplicitCommand::Sticker => self.handle_sticker(&ctx).await,
            ExplicitCommand::Remember => self.handle_remember(&ctx).await,
            ExplicitCommand::Consumption => self.handle_consumption(&ctx).await,
            ExplicitCommand::Gallery => self.handle_gallery(&ctx).await,
            ExplicitCommand::FavoriteList => self.handle_favorite_list(&ctx).await,
            ExplicitCommand::FavoriteRemove => self.handle_favorite(&ctx, false).await,
            ExplicitCommand::Favorite => self.handle_favorite(&ctx, true).await,
        }
    }

    async fn dispatch_intent(
        &self,
        intent: Intent,
        wants_audio: bool,
        ctx: RouteContext,
    ) -> Result<(), MaritacaError> {
        match intent {
            Intent::Remember => self.handle_remember(&ctx).await,
            Intent::Search => self.handle_search(&ctx).await,
            Intent::Image => self.handle_image(&ctx).await,
            Intent::Sticker => self.handle_sticker(&ctx).await,
            Intent::Transcribe => self.handle_transcribe(&ctx).await,
            Intent::Resume => self.handle_resume(&ctx).await,
            Intent::Model => self.handle_model(&ctx).await,
            Intent::Help => self.handle_help(&ctx).await,
            Intent::Conversation => self.handle_conversation(&ctx, wants_audio).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_token_wins() {
        assert_eq!(
            detect_explicit("!help me pick a !sticker"),
            Some(ExplicitCommand::Help)
        );
        assert_eq!(
            detect_explicit("!sticker with !remember later"),
            Some(ExplicitCommand::Sticker)
        );
    }

    #[test]
    fn test_favorite_subcommands_before_bare_form() {
        assert_eq!(
            detect_explicit("!favorite:list"),
            Some(ExplicitCommand::FavoriteList)
        );
        assert_eq!(
            detect_explicit("!favorite:remove"),
            Some(ExplicitCommand::FavoriteRemove)
        );
        assert_eq!(detect_explicit("!favorite"), Some(ExplicitCommand::Favorite));
    }

    #[test]
    fn test_detection_is_case_insensitive() {
        assert_eq!(detect_explicit("!TRANSCRIBE"), Some(ExplicitCommand::Transcribe));
    }

    #[test]
    fn test_plain_text_has_no_command() {
        assert_eq!(detect_explicit("bom dia, tudo bem?"), None);
    }
}
