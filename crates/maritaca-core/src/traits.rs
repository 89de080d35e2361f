//! Collaborator traits — every external system the pipeline calls into.
//!
//! All of these are dependency-injected `Arc<dyn …>` instances constructed
//! once at process start; the routing core holds no globals.

use async_trait::async_trait;

use crate::error::MaritacaError;

/// One chat-completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    /// Model override; the provider falls back to its configured default.
    pub model: Option<String>,
    /// Ask the provider to ground the answer with a web search.
    pub web_search: bool,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// A completion plus the token usage the accounting layer records.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub text: String,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}

/// Language-model completion provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, MaritacaError>;
}

/// Speech-to-text over a base64 audio payload.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_base64: &str) -> Result<ChatResponse, MaritacaError>;
}

/// Image generation, description, and sticker rendering.
#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// Generate an image (or modify `source_base64` when present).
    /// Returns base64 image bytes.
    async fn generate(
        &self,
        prompt: &str,
        source_base64: Option<&str>,
    ) -> Result<String, MaritacaError>;

    /// Describe an image in natural language.
    async fn describe(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> Result<ChatResponse, MaritacaError>;

    /// Render a sticker from an image with optional top/bottom captions.
    /// Returns base64 WebP bytes.
    async fn sticker(
        &self,
        image_base64: &str,
        top: Option<&str>,
        bottom: Option<&str>,
    ) -> Result<String, MaritacaError>;
}

/// Text-to-speech synthesis. Returns base64 audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, english: bool) -> Result<String, MaritacaError>;
}

/// A downloaded media payload.
#[derive(Debug, Clone)]
pub struct MediaDownload {
    pub base64: String,
    pub file_name: Option<String>,
    pub mimetype: Option<String>,
}

/// Group metadata from the platform.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub subject: String,
    pub description: Option<String>,
}

/// Messaging-platform transport: outbound sends, media download, and
/// metadata lookups.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(
        &self,
        remote_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), MaritacaError>;

    async fn send_audio(
        &self,
        remote_id: &str,
        audio_base64: &str,
        reply_to: Option<&str>,
    ) -> Result<(), MaritacaError>;

    async fn send_image(
        &self,
        remote_id: &str,
        image_base64: &str,
        caption: Option<&str>,
    ) -> Result<(), MaritacaError>;

    async fn send_sticker(&self, remote_id: &str, webp_base64: &str)
        -> Result<(), MaritacaError>;

    /// Download the media payload attached to a message by its id.
    async fn download_media(&self, message_id: &str) -> Result<MediaDownload, MaritacaError>;

    async fn get_group_info(&self, group_remote_id: &str) -> Result<GroupInfo, MaritacaError>;

    /// Best-effort profile-picture lookup; `None` when the user has none.
    async fn profile_picture_url(&self, jid: &str) -> Result<Option<String>, MaritacaError>;
}
