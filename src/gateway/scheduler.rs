//! Reminder delivery loop.
//!
//! Polls the store for due reminders and sends each exactly once: the
//! soft-delete happens only after a successful send, and a reminder that
//! fails to send stays pending for the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use maritaca_core::traits::Transport;
use maritaca_store::Store;

/// Background task delivering due reminders. Runs until the process exits.
pub async fn reminder_loop(store: Store, transport: Arc<dyn Transport>, poll_secs: u64) {
    info!("reminder loop running, polling every {poll_secs}s");
    loop {
        tokio::time::sleep(Duration::from_secs(poll_secs)).await;

        let due = match store.due_reminders(Utc::now()).await {
            Ok(due) => due,
            Err(e) => {
                error!("due reminder query failed: {e}");
                continue;
            }
        };

        for reminder in due {
            let text = format!("*[REMINDER]* {}", reminder.message);
            match transport.send_text(&reminder.remote_id, &text, None).await {
                Ok(()) => {
                    if let Err(e) = store.soft_delete_reminder(&reminder.id).await {
                        error!("failed to mark reminder {} delivered: {e}", reminder.id);
                    }
                }
                Err(e) => {
                    error!("reminder {} send failed, will retry: {e}", reminder.id);
                }
            }
        }
    }
}
