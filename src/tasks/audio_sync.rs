//! Audio synchronization background task

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{
    audio::{AudioManager, SoundId},
    state::{AppState, TimerState},
};

/// The fields of a timer snapshot that playback depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlaybackInputs {
    is_running: bool,
    sound: SoundId,
    volume: u8,
}

impl From<&TimerState> for PlaybackInputs {
    fn from(state: &TimerState) -> Self {
        Self {
            is_running: state.is_running,
            sound: state.sound,
            volume: state.volume,
        }
    }
}

async fn apply_transport(audio: &AudioManager, inputs: PlaybackInputs) {
    if inputs.sound == SoundId::None {
        audio.stop().await;
        return;
    }

    if inputs.is_running {
        let started = if audio.current_track() == Some(inputs.sound) {
            audio.claim(inputs.sound) || audio.resume().await
        } else {
            audio.play_track(inputs.sound).await
        };
        if !started {
            warn!("Background audio could not start, timer continues silently");
        }
    } else {
        audio.pause().await;
    }
}

/// Background task that keeps music playback in step with the timer: music
/// plays while the timer runs, pauses when it stops, follows sound and
/// volume changes, and chimes on completion
pub async fn audio_sync_task(state: Arc<AppState>) {
    info!("Starting audio sync task");

    let audio = Arc::clone(&state.audio);
    let mut timer_rx = state.timer_update_tx.subscribe();
    let mut completion_rx = state.completion_tx.subscribe();
    let mut applied = PlaybackInputs::from(&*timer_rx.borrow_and_update());
    audio.set_volume(i64::from(applied.volume));
    if applied.is_running {
        apply_transport(&audio, applied).await;
    }

    loop {
        tokio::select! {
            changed = timer_rx.changed() => {
                if changed.is_err() {
                    debug!("Timer channel closed, stopping audio sync");
                    break;
                }
                let inputs = PlaybackInputs::from(&*timer_rx.borrow_and_update());
                if inputs == applied {
                    continue;
                }

                if inputs.volume != applied.volume {
                    audio.set_volume(i64::from(inputs.volume));
                }
                if inputs.is_running != applied.is_running || inputs.sound != applied.sound {
                    debug!("Syncing audio: running={}, sound={}", inputs.is_running, inputs.sound);
                    apply_transport(&audio, inputs).await;
                }
                applied = inputs;
            }

            completion = completion_rx.recv() => {
                match completion {
                    Ok(_) => audio.play_completion_chime(),
                    Err(RecvError::Lagged(missed)) => {
                        debug!("Audio sync missed {} completion events", missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}
