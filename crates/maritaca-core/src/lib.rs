//! # maritaca-core
//!
//! Core types, traits, configuration, and error handling for the Maritaca
//! WhatsApp assistant backend.

pub mod config;
pub mod error;
pub mod event;
pub mod media;
pub mod traits;
