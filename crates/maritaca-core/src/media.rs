//! Media-context extraction.
//!
//! Normalizes one inbound event into the flat set of content signals the
//! router reasons about. Presence of a signal means the corresponding
//! `Option` is `Some` (or the mention list is non-empty) — downstream code
//! must never infer absence from an empty-but-present value.
//!
//! Quoted-message context lives either in a top-level `contextInfo` or
//! behind the ephemeral envelope
//! (`message.ephemeralMessage.message.extendedTextMessage.contextInfo`).
//! Each signal tries both roots independently: an event can carry a
//! top-level contextInfo and still need the ephemeral path for mentions.

use serde_json::Value;

use crate::event::{strip_suffixes, InboundEvent};

/// Self-reference shorthand in conversation text.
const SELF_MENTION: &str = "@me";

const EPHEMERAL_CONTEXT: &[&str] = &[
    "ephemeralMessage",
    "message",
    "extendedTextMessage",
    "contextInfo",
];

/// A quoted plain-text message, paired with its source message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuote {
    pub text: String,
    pub message_id: Option<String>,
}

/// Detected content signals of one inbound event.
///
/// Built fresh per event; never partially updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaContext {
    /// Resolved conversation text, first non-empty of: inline image
    /// caption, `conversation`, ephemeral extended text, video caption.
    pub text: Option<String>,
    /// Message id of an inline audio/image/video message.
    pub audio_message: Option<String>,
    pub image_message: Option<String>,
    pub video_message: Option<String>,
    /// Quoted stanza id of a quoted audio/image/video message.
    pub audio_quote: Option<String>,
    pub image_quote: Option<String>,
    pub video_quote: Option<String>,
    pub text_quote: Option<TextQuote>,
    /// Mentioned jids with platform suffixes stripped.
    pub mentions: Vec<String>,
}

impl MediaContext {
    /// Extract all content signals from one inbound event. Pure.
    pub fn extract(event: &InboundEvent) -> Self {
        let contexts = context_roots(event);

        let quoted_id = contexts
            .iter()
            .find_map(|ctx| string_at(ctx, &["stanzaId"]));

        let text = conversation_text(event);

        let mut mentions: Vec<String> = contexts
            .iter()
            .find_map(|ctx| value_at(ctx, &["mentionedJid"]).and_then(Value::as_array))
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // "@me" is shorthand for mentioning the sender themself.
        if let Some(ref t) = text {
            if t.contains(SELF_MENTION) {
                if let Some(own) = sender_phone(event) {
                    mentions.push(own);
                }
            }
        }
        let mentions = mentions
            .iter()
            .map(|m| strip_suffixes(m.trim_start_matches('@').trim()))
            .collect();

        let quote_signal = |kind: &str| -> Option<String> {
            contexts
                .iter()
                .find_map(|ctx| {
                    first_present(
                        ctx,
                        &[
                            &["quotedMessage", kind],
                            &["quotedMessage", "ephemeralMessage", "message", kind],
                        ],
                    )
                })
                // A quoted media body without a stanza id cannot be
                // downloaded later; treat it as no signal.
                .and_then(|_| quoted_id.clone())
        };

        let text_quote = contexts
            .iter()
            .find_map(|ctx| {
                first_present(
                    ctx,
                    &[
                        &["quotedMessage", "conversation"],
                        &[
                            "quotedMessage",
                            "ephemeralMessage",
                            "message",
                            "extendedTextMessage",
                            "text",
                        ],
                    ],
                )
            })
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(|t| TextQuote {
                text: t.to_string(),
                message_id: quoted_id.clone(),
            });

        let own_kind = |tag: &str| -> Option<String> {
            (event.message_type.as_deref() == Some(tag)).then(|| event.key.id.clone())
        };

        Self {
            text,
            audio_message: own_kind("audioMessage"),
            image_message: own_kind("imageMessage"),
            video_message: own_kind("videoMessage"),
            audio_quote: quote_signal("audioMessage"),
            image_quote: quote_signal("imageMessage"),
            video_quote: quote_signal("videoMessage"),
            text_quote,
            mentions,
        }
    }

    /// Compact yes/no description of the media signals, fed to the
    /// intent classifier.
    pub fn describe_for_classifier(&self) -> String {
        let flag = |present: bool| if present { "yes" } else { "no" };
        format!(
            "audio message: {}\nattached image: {}\nquoted audio: {}\nquoted image: {}",
            flag(self.audio_message.is_some()),
            flag(self.image_message.is_some()),
            flag(self.audio_quote.is_some()),
            flag(self.image_quote.is_some()),
        )
    }
}

/// Ordered candidate roots for quoted-message context.
fn context_roots(event: &InboundEvent) -> Vec<&Value> {
    let mut roots = Vec::with_capacity(2);
    if event.context_info.is_object() {
        roots.push(&event.context_info);
    }
    if let Some(ctx) = value_at(&event.message, EPHEMERAL_CONTEXT) {
        roots.push(ctx);
    }
    roots
}

/// Conversation text resolution: first non-empty along the fixed order.
fn conversation_text(event: &InboundEvent) -> Option<String> {
    const PATHS: &[&[&str]] = &[
        &["imageMessage", "caption"],
        &["conversation"],
        &["ephemeralMessage", "message", "extendedTextMessage", "text"],
        &["videoMessage", "caption"],
    ];
    PATHS
        .iter()
        .find_map(|path| string_at(&event.message, path))
}

/// The sender's own phone-style id, for `@me` expansion.
fn sender_phone(event: &InboundEvent) -> Option<String> {
    event
        .participant_phone()
        .or_else(|| match event.key.remote_jid_alt.as_str() {
            "" => None,
            alt => Some(strip_suffixes(alt)),
        })
}

/// Walk `path` down `root`, returning the value if every step exists.
fn value_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let v = path.iter().try_fold(root, |acc, key| acc.get(key))?;
    (!v.is_null()).then_some(v)
}

/// First present value along an ordered list of access paths.
fn first_present<'a>(root: &'a Value, paths: &[&[&str]]) -> Option<&'a Value> {
    paths.iter().find_map(|path| value_at(root, path))
}

/// Non-empty string at `path`, if any.
fn string_at(root: &Value, path: &[&str]) -> Option<String> {
    value_at(root, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(body: serde_json::Value) -> InboundEvent {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn plain_conversation_text() {
        let ev = event(json!({
            "key": { "id": "M1", "remoteJid": "x@s.whatsapp.net", "remoteJidAlt": "1@lid" },
            "messageTimestamp": 1_700_000_000_i64,
            "messageType": "conversation",
            "message": { "conversation": "hello there" },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.text.as_deref(), Some("hello there"));
        assert!(ctx.audio_message.is_none());
        assert!(ctx.mentions.is_empty());
    }

    #[test]
    fn image_caption_wins_over_conversation() {
        let ev = event(json!({
            "key": { "id": "M2", "remoteJid": "x@s.whatsapp.net", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "messageType": "imageMessage",
            "message": {
                "imageMessage": { "caption": "look at this" },
                "conversation": "ignored",
            },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.text.as_deref(), Some("look at this"));
        assert_eq!(ctx.image_message.as_deref(), Some("M2"));
    }

    #[test]
    fn ephemeral_text_fallback() {
        let ev = event(json!({
            "key": { "id": "M3", "remoteJid": "g@g.us", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "message": {
                "ephemeralMessage": { "message": { "extendedTextMessage": { "text": "hidden" } } },
            },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.text.as_deref(), Some("hidden"));
    }

    #[test]
    fn quoted_audio_via_top_level_context() {
        let ev = event(json!({
            "key": { "id": "M4", "remoteJid": "g@g.us", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "message": { "conversation": "transcribe this" },
            "contextInfo": {
                "stanzaId": "Q1",
                "quotedMessage": { "audioMessage": { "seconds": 12 } },
            },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.audio_quote.as_deref(), Some("Q1"));
        assert!(ctx.image_quote.is_none());
    }

    #[test]
    fn quoted_media_without_stanza_id_yields_no_signal() {
        let ev = event(json!({
            "key": { "id": "M11", "remoteJid": "g@g.us", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "message": { "conversation": "transcribe this" },
            "contextInfo": {
                "quotedMessage": { "audioMessage": { "seconds": 3 } },
            },
        }));
        let ctx = MediaContext::extract(&ev);
        assert!(ctx.audio_quote.is_none());
    }

    #[test]
    fn quoted_image_via_ephemeral_path() {
        let ev = event(json!({
            "key": { "id": "M5", "remoteJid": "g@g.us", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "message": {
                "ephemeralMessage": { "message": { "extendedTextMessage": {
                    "text": "what is in this picture?",
                    "contextInfo": {
                        "stanzaId": "Q2",
                        "quotedMessage": { "ephemeralMessage": { "message": {
                            "imageMessage": { "mimetype": "image/jpeg" },
                        } } },
                    },
                } } },
            },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.image_quote.as_deref(), Some("Q2"));
        assert_eq!(ctx.text.as_deref(), Some("what is in this picture?"));
    }

    #[test]
    fn mentions_fall_back_independently_of_context() {
        // Top-level contextInfo exists but has no mentions; the ephemeral
        // path still supplies them.
        let ev = event(json!({
            "key": { "id": "M6", "remoteJid": "g@g.us", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "contextInfo": { "stanzaId": "Q3" },
            "message": {
                "ephemeralMessage": { "message": { "extendedTextMessage": {
                    "text": "@5511988887777 hi",
                    "contextInfo": { "mentionedJid": ["5511988887777@s.whatsapp.net"] },
                } } },
            },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.mentions, vec!["5511988887777".to_string()]);
    }

    #[test]
    fn self_mention_appends_sender_phone() {
        let ev = event(json!({
            "key": {
                "id": "M7",
                "remoteJid": "g@g.us",
                "remoteJidAlt": "",
                "participant": "777@lid",
                "participantAlt": "5511900001111@s.whatsapp.net",
            },
            "messageTimestamp": 1_700_000_000_i64,
            "message": { "conversation": "remind @me later" },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.mentions, vec!["5511900001111".to_string()]);
    }

    #[test]
    fn text_quote_carries_source_id() {
        let ev = event(json!({
            "key": { "id": "M8", "remoteJid": "x@s.whatsapp.net", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "message": { "conversation": "what did they mean?" },
            "contextInfo": {
                "stanzaId": "Q4",
                "quotedMessage": { "conversation": "original words" },
            },
        }));
        let ctx = MediaContext::extract(&ev);
        let quote = ctx.text_quote.unwrap();
        assert_eq!(quote.text, "original words");
        assert_eq!(quote.message_id.as_deref(), Some("Q4"));
    }

    #[test]
    fn empty_caption_is_still_presence_for_media_kind() {
        // An image with an empty caption is still an image message; the
        // presence signal is the messageType tag, not caption truthiness.
        let ev = event(json!({
            "key": { "id": "M9", "remoteJid": "x@s.whatsapp.net", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "messageType": "imageMessage",
            "message": { "imageMessage": { "caption": "" } },
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx.image_message.as_deref(), Some("M9"));
        assert!(ctx.text.is_none());
    }

    #[test]
    fn malformed_shapes_degrade_to_no_signal() {
        let ev = event(json!({
            "key": { "id": "M10", "remoteJid": "x@s.whatsapp.net", "remoteJidAlt": "" },
            "messageTimestamp": 1_700_000_000_i64,
            "message": { "ephemeralMessage": 42 },
            "contextInfo": null,
        }));
        let ctx = MediaContext::extract(&ev);
        assert_eq!(ctx, MediaContext::default());
    }
}
