//! Completion notification background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

/// Background task that raises a notification for every finished countdown
pub async fn completion_notifier_task(state: Arc<AppState>) {
    info!("Starting completion notifier task");

    let mut completion_rx = state.completion_tx.subscribe();

    loop {
        match completion_rx.recv().await {
            Ok(event) => {
                info!(
                    mode = event.mode.as_str(),
                    completed_cycles = event.completed_cycles,
                    "Notification: {} {}",
                    event.title(),
                    event.body()
                );
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Notifier missed {} completion events", missed);
            }
            Err(RecvError::Closed) => {
                info!("Completion channel closed, stopping notifier");
                break;
            }
        }
    }
}
