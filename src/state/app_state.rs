//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::{
    sync::{broadcast, watch},
    task,
};
use tracing::{debug, info, warn};

use super::{CompletionEvent, PersistedState, TickOutcome, TimerState, TimerStore};
use crate::{
    audio::AudioManager,
    storage::{load_persisted, save_persisted, KeyValueStore},
};

/// Shared application state: the timer store, its collaborators and the
/// channels that let background tasks follow state changes
pub struct AppState {
    /// Timer and pomodoro state machine
    pub store: Arc<Mutex<TimerStore>>,
    /// Background music playback
    pub audio: Arc<AudioManager>,
    /// Preference storage
    pub storage: Arc<dyn KeyValueStore>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for timer snapshots, sent after every mutation
    pub timer_update_tx: watch::Sender<TimerState>,
    /// Keep the receiver alive to prevent channel closure
    pub _timer_update_rx: watch::Receiver<TimerState>,
    /// Channel for countdown completions
    pub completion_tx: broadcast::Sender<CompletionEvent>,
    /// Serializes storage writes so they land in mutation order
    save_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Create an AppState around an existing store
    pub fn new(
        port: u16,
        host: String,
        store: TimerStore,
        storage: Arc<dyn KeyValueStore>,
        audio: Arc<AudioManager>,
    ) -> Self {
        let (completion_tx, _) = broadcast::channel(16);
        let (timer_update_tx, timer_update_rx) = watch::channel(store.state().clone());
        audio.set_volume(i64::from(store.state().volume));

        Self {
            store: Arc::new(Mutex::new(store)),
            audio,
            storage,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            timer_update_tx,
            _timer_update_rx: timer_update_rx,
            completion_tx,
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create an AppState whose preferences are rehydrated from storage
    pub fn load(
        port: u16,
        host: String,
        storage: Arc<dyn KeyValueStore>,
        audio: Arc<AudioManager>,
    ) -> Self {
        let store = match load_persisted(storage.as_ref()) {
            Some(persisted) => {
                info!("Restored saved preferences");
                TimerStore::with_persisted(persisted)
            }
            None => TimerStore::new(),
        };
        Self::new(port, host, store, storage, audio)
    }

    /// Write preferences on the blocking pool; file stores do synchronous I/O
    async fn persist(&self, persisted: PersistedState) -> Result<(), String> {
        let storage = Arc::clone(&self.storage);
        task::spawn_blocking(move || save_persisted(storage.as_ref(), &persisted))
            .await
            .map_err(|e| format!("Preference writer failed: {}", e))?
            .map_err(|e| format!("Failed to save preferences: {}", e))
    }

    /// Run an action against the store, publish the new snapshot and save
    /// preferences if they changed
    async fn apply<F, R>(&self, action: Option<&str>, updater: F) -> Result<(TimerState, R), String>
    where
        F: FnOnce(&mut TimerStore) -> R,
    {
        let _save_guard = self.save_lock.lock().await;

        let (new_state, result, changed) = {
            let mut store = self.store.lock()
                .map_err(|e| format!("Failed to lock timer store: {}", e))?;

            let before = store.persisted();
            let result = updater(&mut *store);
            let after = store.persisted();
            let changed = (before != after).then_some(after);
            (store.state().clone(), result, changed)
        };

        if let Some(action) = action {
            if let Ok(mut last_action) = self.last_action.lock() {
                *last_action = Some(action.to_string());
            }
            if let Ok(mut last_time) = self.last_action_time.lock() {
                *last_time = Some(Utc::now());
            }
        }

        // Notify timer state watchers (tick driver, audio sync)
        if let Err(e) = self.timer_update_tx.send(new_state.clone()) {
            warn!("Failed to send timer update: {}", e);
        }

        if let Some(persisted) = changed {
            if let Err(e) = self.persist(persisted).await {
                warn!("{}", e);
            }
        }

        Ok((new_state, result))
    }

    /// Run a user action; the action name is recorded as the last action
    pub async fn update<F, R>(&self, action: &str, updater: F) -> Result<(TimerState, R), String>
    where
        F: FnOnce(&mut TimerStore) -> R,
    {
        debug!("Applying action: {}", action);
        self.apply(Some(action), updater).await
    }

    /// Advance the countdown by one second and announce a completion
    pub async fn tick(&self) -> Result<TickOutcome, String> {
        let (_, outcome) = self.apply(None, TimerStore::tick).await?;

        if let TickOutcome::Completed(event) = &outcome {
            info!("{}: {}", event.title(), event.body());
            if let Err(e) = self.completion_tx.send(event.clone()) {
                debug!("No completion listeners: {}", e);
            }
        }

        Ok(outcome)
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> Result<TimerState, String> {
        self.store.lock()
            .map(|store| store.state().clone())
            .map_err(|e| format!("Failed to lock timer store: {}", e))
    }

    /// Write the current preferences to storage
    pub async fn save(&self) -> Result<(), String> {
        let _save_guard = self.save_lock.lock().await;
        let persisted = self.store.lock()
            .map(|store| store.persisted())
            .map_err(|e| format!("Failed to lock timer store: {}", e))?;
        self.persist(persisted).await
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
