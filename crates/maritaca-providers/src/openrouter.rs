//! OpenRouter provider.
//!
//! One client covers every model-shaped concern: plain completions,
//! audio transcription (`input_audio` content parts), image generation
//! and description, and sticker rendering. All of them go through the
//! same `/chat/completions` endpoint with different content parts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

use maritaca_core::config::OpenRouterConfig;
use maritaca_core::error::MaritacaError;
use maritaca_core::traits::{ChatRequest, ChatResponse, ImageEngine, Provider, Transcriber};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const TRANSCRIBER_PROMPT: &str =
    "Transcribe this audio exactly as spoken, in the speaker's language. \
     Output only the transcript, nothing else.";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plugins: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    /// Image-generation responses attach rendered images here.
    #[serde(default)]
    images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    image_url: ImageUrl,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
}

/// OpenRouter-backed provider for every model call Maritaca makes.
pub struct OpenRouterProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    audio_model: String,
    image_model: String,
}

impl OpenRouterProvider {
    pub fn from_config(config: &OpenRouterConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            text_model: config.text_model.clone(),
            audio_model: config.audio_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    async fn chat(&self, body: &ChatCompletionRequest) -> Result<ChatCompletionResponse, MaritacaError> {
        let url = format!("{}/chat/completions", self.base_url);
        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| MaritacaError::Provider(format!("openrouter request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(MaritacaError::Provider(format!(
                "openrouter returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp.json().await.map_err(|e| {
            MaritacaError::Provider(format!("openrouter: failed to parse response: {e}"))
        })?;

        debug!(
            "openrouter: model={} took {}ms",
            body.model,
            start.elapsed().as_millis()
        );
        Ok(parsed)
    }

    fn to_chat_response(&self, parsed: ChatCompletionResponse, fallback_model: &str) -> ChatResponse {
        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.clone())
            .unwrap_or_default();
        ChatResponse {
            text,
            model: parsed.model.unwrap_or_else(|| fallback_model.to_string()),
            prompt_tokens: parsed.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
            completion_tokens: parsed
                .usage
                .as_ref()
                .map(|u| u.completion_tokens)
                .unwrap_or(0),
        }
    }

    /// Description goes to the text model; it only needs vision input,
    /// not image output.
    fn describe_request(&self, image_base64: &str, prompt: &str) -> ChatCompletionRequest {
        let system = "Describe this image in a few words. Use at most 4-5 sentences.";
        ChatCompletionRequest {
            model: self.text_model.clone(),
            messages: Self::vision_messages(Some(system), prompt, Some(image_base64)),
            plugins: None,
            modalities: None,
        }
    }

    /// Vision-style request: a text part plus an optional inline image.
    fn vision_messages(system: Option<&str>, prompt: &str, image_base64: Option<&str>) -> Vec<Value> {
        let mut content = vec![json!({ "type": "text", "text": prompt })];
        if let Some(image) = image_base64 {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{image}") }
            }));
        }
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": content }));
        messages
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, MaritacaError> {
        let model = request.model.as_deref().unwrap_or(&self.text_model);
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let plugins = request
            .web_search
            .then(|| vec![json!({ "id": "web", "max_results": 5 })]);

        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            plugins,
            modalities: None,
        };
        let parsed = self.chat(&body).await?;
        Ok(self.to_chat_response(parsed, model))
    }
}

#[async_trait]
impl Transcriber for OpenRouterProvider {
    async fn transcribe(&self, audio_base64: &str) -> Result<ChatResponse, MaritacaError> {
        let messages = vec![json!({
            "role": "user",
            "content": [
                { "type": "text", "text": TRANSCRIBER_PROMPT },
                {
                    "type": "input_audio",
                    "input_audio": { "data": audio_base64, "format": "wav" }
                }
            ]
        })];

        let body = ChatCompletionRequest {
            model: self.audio_model.clone(),
            messages,
            plugins: None,
            modalities: None,
        };
        let parsed = self.chat(&body).await?;
        let response = self.to_chat_response(parsed, &self.audio_model);
        if response.text.is_empty() {
            return Err(MaritacaError::Provider(
                "openrouter: transcription returned no text".to_string(),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageEngine for OpenRouterProvider {
    async fn generate(
        &self,
        prompt: &str,
        source_base64: Option<&str>,
    ) -> Result<String, MaritacaError> {
        let body = ChatCompletionRequest {
            model: self.image_model.clone(),
            messages: Self::vision_messages(None, prompt, source_base64),
            plugins: None,
            modalities: Some(vec!["image".to_string(), "text".to_string()]),
        };
        let parsed = self.chat(&body).await?;

        let url = parsed
            .choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.images.first())
            .map(|i| i.image_url.url.clone())
            .ok_or_else(|| {
                MaritacaError::Provider("openrouter: model returned no image".to_string())
            })?;

        Ok(strip_data_url(&url).to_string())
    }

    async fn describe(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> Result<ChatResponse, MaritacaError> {
        let body = self.describe_request(image_base64, prompt);
        let parsed = self.chat(&body).await?;
        Ok(self.to_chat_response(parsed, &self.text_model))
    }

    async fn sticker(
        &self,
        image_base64: &str,
        top: Option<&str>,
        bottom: Option<&str>,
    ) -> Result<String, MaritacaError> {
        let mut prompt = String::from(
            "Turn this picture into a square sticker with a transparent-friendly \
             background. Keep the subject intact.",
        );
        if let Some(top) = top.filter(|t| !t.is_empty()) {
            prompt.push_str(&format!(
                " Add the caption \"{top}\" in bold white meme lettering at the top."
            ));
        }
        if let Some(bottom) = bottom.filter(|b| !b.is_empty()) {
            prompt.push_str(&format!(
                " Add the caption \"{bottom}\" in bold white meme lettering at the bottom."
            ));
        }
        self.generate(&prompt, Some(image_base64)).await
    }
}

/// Image models hand back data URLs; senders want raw base64.
fn strip_data_url(url: &str) -> &str {
    match url.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => url,
    }
}
