//! Intent classification for messages without an explicit command.
//!
//! The classifier is a cheap model returning a comma-separated label list.
//! The first label is the intent; a literal `audio` anywhere in the list
//! means the sender wants the answer spoken. Anything outside the closed
//! set degrades to plain conversation — the classifier can suggest, never
//! invent, a capability.

use tracing::warn;

use maritaca_core::media::MediaContext;
use maritaca_core::traits::ChatRequest;

use super::Gateway;

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You classify WhatsApp messages for a chat assistant. Reply with a single \
comma-separated list of labels and nothing else. The first label must be \
one of: conversation, remember, search, image, sticker, transcribe, \
resume, model, help. Append the label `audio` when the sender asks for a \
spoken reply. Pick `conversation` whenever unsure.";

/// The closed set of classifier-selectable intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Intent {
    Conversation,
    Remember,
    Search,
    Image,
    Sticker,
    Transcribe,
    Resume,
    Model,
    Help,
}

impl Intent {
    fn from_label(label: &str) -> Self {
        match label {
            "remember" => Self::Remember,
            "search" => Self::Search,
            "image" => Self::Image,
            "sticker" => Self::Sticker,
            "transcribe" => Self::Transcribe,
            "resume" => Self::Resume,
            "model" => Self::Model,
            "help" => Self::Help,
            // Unknown labels and a bare `audio` both mean plain chat.
            _ => Self::Conversation,
        }
    }
}

/// Parse a raw classifier completion into `(intent, wants_audio)`.
pub(super) fn parse_labels(raw: &str) -> (Intent, bool) {
    let labels: Vec<String> = raw
        .split(',')
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();

    let intent = labels
        .first()
        .map(|l| Intent::from_label(l))
        .unwrap_or(Intent::Conversation);
    let wants_audio = labels.iter().any(|l| l == "audio");

    (intent, wants_audio)
}

impl Gateway {
    /// Classify one message. Classifier failure is never fatal: the
    /// message falls through to plain conversation.
    pub(super) async fn classify(
        &self,
        text: &str,
        media: &MediaContext,
        user_id: i64,
        group_id: Option<i64>,
    ) -> (Intent, bool) {
        let prompt = format!(
            "Message:\n{text}\n\nAttachments:\n{}",
            media.describe_for_classifier()
        );
        let request = ChatRequest {
            system_prompt: Some(CLASSIFIER_SYSTEM_PROMPT.to_string()),
            prompt,
            model: Some(self.config.openrouter.classifier_model.clone()),
            web_search: false,
        };

        match self.provider.complete(&request).await {
            Ok(response) => {
                if let Err(e) = self
                    .store
                    .log_interaction(
                        Some(user_id),
                        group_id,
                        "intent-classifier",
                        &response.model,
                        response.prompt_tokens,
                        response.completion_tokens,
                    )
                    .await
                {
                    warn!("failed to log classifier interaction: {e}");
                }
                parse_labels(&response.text)
            }
            Err(e) => {
                warn!("intent classification failed, treating as conversation: {e}");
                (Intent::Conversation, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_label_is_the_intent() {
        assert_eq!(parse_labels("sticker, audio"), (Intent::Sticker, true));
        assert_eq!(parse_labels("search"), (Intent::Search, false));
    }

    #[test]
    fn test_unknown_label_degrades_to_conversation() {
        assert_eq!(parse_labels("banana"), (Intent::Conversation, false));
        assert_eq!(parse_labels(""), (Intent::Conversation, false));
    }

    #[test]
    fn test_bare_audio_is_spoken_conversation() {
        assert_eq!(parse_labels("audio"), (Intent::Conversation, true));
    }

    #[test]
    fn test_labels_are_trimmed_and_lowercased() {
        assert_eq!(parse_labels(" Remember , AUDIO "), (Intent::Remember, true));
    }
}
