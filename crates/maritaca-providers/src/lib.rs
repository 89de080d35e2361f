//! Provider implementations for Maritaca.
//!
//! [`openrouter`] covers chat completion, intent classification,
//! transcription, and image work through OpenRouter's OpenAI-compatible
//! API. [`piper`] talks to a local Piper HTTP server for speech
//! synthesis.

pub mod openrouter;
pub mod piper;

pub use openrouter::OpenRouterProvider;
pub use piper::PiperSynthesizer;
