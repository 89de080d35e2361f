//! Transport implementations.
//!
//! Today there is one: the Evolution API bridge to WhatsApp.

pub mod evolution;

pub use evolution::EvolutionClient;
