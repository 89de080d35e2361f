use thiserror::Error;

/// Top-level error type for Maritaca.
#[derive(Debug, Error)]
pub enum MaritacaError {
    /// Error from the language-model provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from the messaging transport (Evolution API).
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(String),

    /// Malformed or unexpected webhook payload.
    #[error("webhook error: {0}")]
    Webhook(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
