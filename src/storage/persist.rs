//! Load-at-startup / save-on-change for the persisted timer preferences

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::kv::{KeyValueStore, StorageError};
use crate::state::PersistedState;

/// Fixed key the preferences live under
pub const STORAGE_KEY: &str = "timer-storage";

const STORAGE_VERSION: u32 = 0;

/// Stored envelope: `{"state": {...}, "version": 0}`
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<S> {
    state: S,
    #[serde(default)]
    version: u32,
}

/// Overwrite `slot` with the stored value under `key`, if it parses
fn merge_field<T: DeserializeOwned>(stored: &Map<String, Value>, key: &str, slot: &mut T) {
    let Some(value) = stored.get(key) else {
        return;
    };
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(e) => warn!("Ignoring saved {}: {}", key, e),
    }
}

/// Shallow merge of the stored fields over the defaults; a missing or
/// unreadable field keeps its default without discarding the others
fn merge_persisted(stored: &Map<String, Value>) -> PersistedState {
    let mut state = PersistedState::default();
    merge_field(stored, "sound", &mut state.sound);
    merge_field(stored, "volume", &mut state.volume);
    merge_field(stored, "minutes", &mut state.minutes);
    merge_field(stored, "pomodoro", &mut state.pomodoro);
    merge_field(stored, "presets", &mut state.presets);
    state
}

/// Read persisted preferences. Missing data, or an envelope whose state is
/// not an object, yields `None` so the caller falls back to defaults.
pub fn load_persisted(store: &dyn KeyValueStore) -> Option<PersistedState> {
    let value = match store.get(STORAGE_KEY) {
        Ok(Some(value)) => value,
        Ok(None) => {
            info!("No saved preferences found, using defaults");
            return None;
        }
        Err(e) => {
            warn!("Failed to read saved preferences: {}", e);
            return None;
        }
    };

    match serde_json::from_value::<Envelope<Map<String, Value>>>(value) {
        Ok(envelope) => {
            if envelope.version != STORAGE_VERSION {
                debug!("Loading preferences stored with version {}", envelope.version);
            }
            Some(merge_persisted(&envelope.state))
        }
        Err(e) => {
            warn!("Ignoring malformed saved preferences: {}", e);
            None
        }
    }
}

/// Write the preferences under [`STORAGE_KEY`]
pub fn save_persisted(store: &dyn KeyValueStore, state: &PersistedState) -> Result<(), StorageError> {
    let envelope = Envelope {
        state: state.clone(),
        version: STORAGE_VERSION,
    };
    store.set(STORAGE_KEY, serde_json::to_value(envelope)?)
}
