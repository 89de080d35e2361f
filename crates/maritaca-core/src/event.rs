//! Inbound webhook event envelope.
//!
//! The delivery platform posts a JSON envelope per event. Only the header
//! fields the pipeline inspects are typed; the nested message body and
//! contextInfo vary wildly by message shape and stay as raw JSON for the
//! path-based extraction in [`crate::media`].

use serde::Deserialize;
use serde_json::Value;

/// Event type that drives processing; everything else is acknowledged and
/// dropped at the webhook boundary.
pub const MESSAGES_UPSERT: &str = "messages.upsert";

const GROUP_SUFFIX: &str = "@g.us";
const USER_SUFFIX: &str = "@s.whatsapp.net";
const LID_SUFFIX: &str = "@lid";

/// Full webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub instance: Option<String>,
    pub data: InboundEvent,
}

/// One inbound message event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    pub key: MessageKey,
    #[serde(default)]
    pub push_name: Option<String>,
    /// Platform timestamp, epoch seconds.
    pub message_timestamp: i64,
    #[serde(default)]
    pub message_type: Option<String>,
    /// Nested message body, possibly wrapped in an ephemeral envelope.
    #[serde(default)]
    pub message: Value,
    /// Top-level quoted-message context, when the platform flattens it.
    #[serde(default)]
    pub context_info: Value,
}

/// Addressing block of an inbound event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    pub id: String,
    #[serde(default)]
    pub remote_jid: String,
    #[serde(default)]
    pub remote_jid_alt: String,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default)]
    pub participant_alt: Option<String>,
}

/// The resolved conversation a message belongs to.
///
/// Every inbound event has exactly one canonical remote conversation,
/// resolved by suffix pattern matching on the raw id strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    /// Group chat; `jid` is the bare group id, `remote_id` the full
    /// address used for outbound sends.
    Group { jid: String, remote_id: String },
    /// Direct chat; `lid` is the stable platform id, `phone` the
    /// phone-style number used for outbound sends.
    Direct { lid: String, phone: String },
}

impl InboundEvent {
    /// Resolve the canonical conversation for this event, or `None` when
    /// neither id matches a known suffix.
    pub fn conversation(&self) -> Option<Conversation> {
        let remote = self.key.remote_jid.as_str();
        let alt = self.key.remote_jid_alt.as_str();

        if remote.ends_with(USER_SUFFIX) {
            return Some(Conversation::Direct {
                lid: strip_suffixes(alt),
                phone: strip_suffixes(remote),
            });
        }
        if alt.ends_with(USER_SUFFIX) {
            return Some(Conversation::Direct {
                lid: strip_suffixes(remote),
                phone: strip_suffixes(alt),
            });
        }
        if remote.ends_with(GROUP_SUFFIX) {
            return Some(Conversation::Group {
                jid: remote.trim_end_matches(GROUP_SUFFIX).to_string(),
                remote_id: remote.to_string(),
            });
        }
        None
    }

    /// Stable id of the sending participant (group messages only).
    pub fn participant_id(&self) -> Option<String> {
        self.key.participant.as_deref().map(strip_suffixes)
    }

    /// Phone-style number of the sending participant, when present.
    pub fn participant_phone(&self) -> Option<String> {
        self.key
            .participant_alt
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(strip_suffixes)
    }
}

/// Strip the platform addressing suffixes from a raw jid.
pub fn strip_suffixes(raw: &str) -> String {
    raw.trim_end_matches(USER_SUFFIX)
        .trim_end_matches(LID_SUFFIX)
        .to_string()
}
