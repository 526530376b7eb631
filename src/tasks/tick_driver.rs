//! Tick driver background task

use std::{sync::Arc, time::Duration};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::state::{AppState, TickOutcome};

/// Period between two ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Background task that takes one second off the clock every second while
/// the timer is running.
///
/// At most one interval exists at a time. It is dropped as soon as a
/// snapshot shows the timer stopped or at zero, and a fresh one is created
/// when the timer runs again. Each tick removes exactly one second, however
/// late it fires.
pub async fn tick_driver_task(state: Arc<AppState>) {
    info!("Starting tick driver task");

    let mut timer_rx = state.timer_update_tx.subscribe();

    loop {
        if !timer_rx.borrow_and_update().should_tick() {
            // Wait for the timer to be started
            if timer_rx.changed().await.is_err() {
                debug!("Timer channel closed, stopping tick driver");
                return;
            }
            continue;
        }

        debug!("Timer running, scheduling ticks");
        let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.tick().await {
                        Ok(TickOutcome::Ticked) => {}
                        Ok(TickOutcome::Completed(_)) => {
                            debug!("Countdown reached zero");
                            break;
                        }
                        // A late tick after the timer stopped
                        Ok(TickOutcome::Idle) => break,
                        Err(e) => {
                            error!("Failed to tick timer: {}", e);
                            break;
                        }
                    }
                }

                changed = timer_rx.changed() => {
                    if changed.is_err() {
                        debug!("Timer channel closed, stopping tick driver");
                        return;
                    }
                    if !timer_rx.borrow_and_update().should_tick() {
                        debug!("Timer stopped, cancelling scheduled ticks");
                        break;
                    }
                }
            }
        }
    }
}
