//! Piper text-to-speech over HTTP.
//!
//! Talks to a local Piper server and hands back base64 WAV bytes ready
//! for the transport layer. Emoji and run-on whitespace are scrubbed
//! before synthesis; Piper reads them out loud otherwise.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde_json::json;
use tracing::debug;

use maritaca_core::config::TtsConfig;
use maritaca_core::error::MaritacaError;
use maritaca_core::traits::SpeechSynthesizer;

pub struct PiperSynthesizer {
    client: reqwest::Client,
    base_url: String,
    voice: String,
    english_voice: String,
    emoji: Regex,
}

impl PiperSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        // Symbol planes WhatsApp text is full of.
        let emoji = Regex::new(
            "[\u{1F300}-\u{1FAFF}\u{2600}-\u{27BF}\u{FE00}-\u{FE0F}\u{1F1E6}-\u{1F1FF}]+",
        )
        .unwrap_or_else(|_| Regex::new("$^").unwrap());

        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            voice: config.voice.clone(),
            english_voice: config.english_voice.clone(),
            emoji,
        }
    }

    fn scrub(&self, text: &str) -> String {
        let without_emoji = self.emoji.replace_all(text, "");
        without_emoji.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str, english: bool) -> Result<String, MaritacaError> {
        let voice = if english {
            &self.english_voice
        } else {
            &self.voice
        };
        let scrubbed = self.scrub(text);
        if scrubbed.is_empty() {
            return Err(MaritacaError::Provider(
                "tts: nothing left to synthesize after scrubbing".to_string(),
            ));
        }

        let url = format!("{}/synthesize", self.base_url);
        debug!("piper: synthesizing {} chars with voice {voice}", scrubbed.len());

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "text": scrubbed, "voice": voice }))
            .send()
            .await
            .map_err(|e| MaritacaError::Provider(format!("piper request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(MaritacaError::Provider(format!(
                "piper returned {status}"
            )));
        }

        let audio = resp
            .bytes()
            .await
            .map_err(|e| MaritacaError::Provider(format!("piper: failed to read audio: {e}")))?;

        Ok(BASE64.encode(&audio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth() -> PiperSynthesizer {
        PiperSynthesizer::from_config(&TtsConfig::default())
    }

    #[test]
    fn test_scrub_removes_emoji_and_collapses_whitespace() {
        let s = synth();
        assert_eq!(s.scrub("olá 😀😀  mundo\n\nbom dia ☀️"), "olá mundo bom dia");
    }

    #[test]
    fn test_scrub_plain_text_untouched() {
        let s = synth();
        assert_eq!(s.scrub("bom dia"), "bom dia");
    }
}
