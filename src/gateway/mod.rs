//! Gateway — the pipeline connecting the webhook, memory, and providers.
//!
//! One `Gateway` instance owns every injected collaborator. The webhook
//! layer hands it decoded events; everything after that — admission,
//! routing, capability dispatch, reminder delivery — happens here.

mod handlers;
mod ingest;
mod intent;
mod routing;
mod scheduler;


pub use scheduler::reminder_loop;

use std::sync::Arc;

use maritaca_core::config::Config;
use maritaca_core::traits::{ImageEngine, Provider, SpeechSynthesizer, Transcriber, Transport};
use maritaca_store::Store;

use crate::commands::CommandTable;

/// The central gateway. Cheap to share behind an `Arc`; all state lives in
/// the store.
pub struct Gateway {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) provider: Arc<dyn Provider>,
    pub(super) transcriber: Arc<dyn Transcriber>,
    pub(super) images: Arc<dyn ImageEngine>,
    pub(super) speech: Arc<dyn SpeechSynthesizer>,
    pub(super) store: Store,
    pub(super) commands: CommandTable,
    pub(super) config: Config,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        provider: Arc<dyn Provider>,
        transcriber: Arc<dyn Transcriber>,
        images: Arc<dyn ImageEngine>,
        speech: Arc<dyn SpeechSynthesizer>,
        store: Store,
        config: Config,
    ) -> Self {
        let commands = CommandTable::new(&config.bot.name);
        Self {
            transport,
            provider,
            transcriber,
            images,
            speech,
            store,
            commands,
            config,
        }
    }
}
