//! Configuration loaded from a single `config.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::MaritacaError;

/// Top-level Maritaca configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    pub evolution: EvolutionConfig,
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub tts: TtsConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Identity of the bot itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Display name the bot is registered under (also its user row name).
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Phone number of the WhatsApp instance the bot runs on.
    pub number: String,
    /// Fixed liveness acknowledgement for a bare mention.
    #[serde(default = "default_ready_notice")]
    pub ready_notice: String,
    /// Reply sent to unlisted direct senders.
    #[serde(default = "default_deny_notice")]
    pub deny_notice: String,
}

/// Inbound webhook HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared key the delivery platform sends in the `apikey` header.
    #[serde(default)]
    pub api_key: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: String::new(),
        }
    }
}

/// Maintenance mode: suppress all processing except one direct number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default)]
    pub enabled: bool,
    /// The only direct number still served while in maintenance.
    #[serde(default)]
    pub allowed_number: String,
    #[serde(default = "default_maintenance_notice")]
    pub notice: String,
}

/// Evolution API transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    pub base_url: String,
    pub instance: String,
    pub api_key: String,
}

/// OpenRouter completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_audio_model")]
    pub audio_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Cheap model used for intent classification.
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
}

/// Text-to-speech server (Piper-style HTTP endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_url")]
    pub base_url: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_english_voice")]
    pub english_voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tts_url(),
            voice: default_voice(),
            english_voice: default_english_voice(),
        }
    }
}

/// Persistence config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// How many stored messages the resume handler summarizes.
    #[serde(default = "default_resume_window")]
    pub resume_window: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            resume_window: default_resume_window(),
        }
    }
}

/// Reminder delivery loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_secs")]
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_secs(),
        }
    }
}

/// Admission pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Messages older than this are dropped before any persistence.
    #[serde(default = "default_max_age_minutes")]
    pub max_age_minutes: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: default_max_age_minutes(),
        }
    }
}

/// Load configuration from a TOML file.
pub fn load(path: &str) -> Result<Config, MaritacaError> {
    if !Path::new(path).exists() {
        return Err(MaritacaError::Config(format!(
            "config file not found: {path}"
        )));
    }
    let raw = std::fs::read_to_string(path)?;
    let config: Config =
        toml::from_str(&raw).map_err(|e| MaritacaError::Config(format!("invalid config: {e}")))?;
    info!("Config loaded from {path}");
    Ok(config)
}

fn default_bot_name() -> String {
    "Maritaca".to_string()
}

fn default_ready_notice() -> String {
    "🤖 Maritaca is up and listening".to_string()
}

fn default_deny_notice() -> String {
    "⚠️ You are not authorized to use this bot. Contact the administrator.".to_string()
}

fn default_maintenance_notice() -> String {
    "The bot is not ready yet, check back soon.".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8321
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_text_model() -> String {
    "openai/gpt-4.1-mini".to_string()
}

fn default_audio_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_image_model() -> String {
    "google/gemini-2.5-flash-image".to_string()
}

fn default_classifier_model() -> String {
    "openai/gpt-4.1-nano".to_string()
}

fn default_tts_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_voice() -> String {
    "pt_BR-faber-medium".to_string()
}

fn default_english_voice() -> String {
    "en_US-lessac-medium".to_string()
}

fn default_db_path() -> String {
    "maritaca.db".to_string()
}

fn default_resume_window() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_poll_secs() -> u64 {
    30
}

fn default_max_age_minutes() -> i64 {
    20
}
