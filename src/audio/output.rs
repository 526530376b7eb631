//! Playback backend seam and the headless virtual mixer

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::tracks::{AudioTrack, SoundId};

/// Why a track could not be played
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// No user gesture has unlocked audio yet
    #[error("playback blocked by autoplay policy")]
    AutoplayBlocked,
    #[error("audio track not found: {0}")]
    TrackNotFound(SoundId),
    /// The asset could not be fetched or decoded
    #[error("audio asset unavailable: {0}")]
    Asset(String),
}

/// One loaded, looping track
pub trait AudioElement: Send {
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn seek_to_start(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
}

/// Creates elements and handles device-level concerns
pub trait AudioOutput: Send + Sync {
    fn create(&self, track: &AudioTrack) -> Result<Box<dyn AudioElement>, PlaybackError>;

    /// Play a silent clip so later playback is allowed
    fn unlock(&self);

    /// Short completion beep
    fn chime(&self) {}
}

/// Observable state of one mixer element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub id: SoundId,
    pub volume: f32,
    pub paused: bool,
    pub at_start: bool,
}

impl ElementSnapshot {
    fn audible(&self) -> bool {
        !self.paused && self.volume > 0.0
    }
}

#[derive(Debug, Default)]
struct MixerInner {
    require_unlock: bool,
    unlocked: bool,
    missing: HashSet<SoundId>,
    elements: Vec<ElementSnapshot>,
    peak_audible: usize,
    chimes: u32,
}

impl MixerInner {
    fn record_audible(&mut self) {
        let audible = self.elements.iter().filter(|e| e.audible()).count();
        self.peak_audible = self.peak_audible.max(audible);
    }
}

/// Headless output that tracks every element's volume and transport state.
///
/// The service has no sound device; clients render what the mixer reports.
/// Playback is refused until [`AudioOutput::unlock`] is called when the
/// mixer is created with [`VirtualMixer::new`].
#[derive(Debug, Clone, Default)]
pub struct VirtualMixer {
    inner: Arc<Mutex<MixerInner>>,
}

fn lock(inner: &Mutex<MixerInner>) -> MutexGuard<'_, MixerInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl VirtualMixer {
    /// Mixer that enforces the autoplay gate
    pub fn new() -> Self {
        let mixer = Self::default();
        lock(&mixer.inner).require_unlock = true;
        mixer
    }

    /// Mixer that accepts playback immediately
    pub fn unlocked() -> Self {
        Self::default()
    }

    /// Make every future `create` for this sound fail
    pub fn mark_missing(&self, id: SoundId) {
        lock(&self.inner).missing.insert(id);
    }

    pub fn is_unlocked(&self) -> bool {
        let inner = lock(&self.inner);
        !inner.require_unlock || inner.unlocked
    }

    pub fn snapshot(&self) -> Vec<ElementSnapshot> {
        lock(&self.inner).elements.clone()
    }

    /// Largest number of elements that were audible at the same time
    pub fn peak_audible(&self) -> usize {
        lock(&self.inner).peak_audible
    }

    pub fn chimes(&self) -> u32 {
        lock(&self.inner).chimes
    }
}

impl AudioOutput for VirtualMixer {
    fn create(&self, track: &AudioTrack) -> Result<Box<dyn AudioElement>, PlaybackError> {
        let mut inner = lock(&self.inner);
        if inner.missing.contains(&track.id) {
            return Err(PlaybackError::Asset(track.url.to_string()));
        }
        inner.elements.push(ElementSnapshot {
            id: track.id,
            volume: 0.0,
            paused: true,
            at_start: true,
        });
        debug!("Loaded track {} from {}", track.id, track.url);
        Ok(Box::new(MixerElement {
            mixer: Arc::clone(&self.inner),
            index: inner.elements.len() - 1,
        }))
    }

    fn unlock(&self) {
        let mut inner = lock(&self.inner);
        if !inner.unlocked {
            inner.unlocked = true;
            info!("Audio unlocked");
        }
    }

    fn chime(&self) {
        lock(&self.inner).chimes += 1;
        info!("Completion chime");
    }
}

struct MixerElement {
    mixer: Arc<Mutex<MixerInner>>,
    index: usize,
}

impl MixerElement {
    fn with<R>(&self, f: impl FnOnce(&mut ElementSnapshot) -> R) -> R {
        let mut inner = lock(&self.mixer);
        let result = f(&mut inner.elements[self.index]);
        inner.record_audible();
        result
    }
}

impl AudioElement for MixerElement {
    fn play(&mut self) -> Result<(), PlaybackError> {
        {
            let inner = lock(&self.mixer);
            if inner.require_unlock && !inner.unlocked {
                return Err(PlaybackError::AutoplayBlocked);
            }
        }
        self.with(|e| {
            e.paused = false;
            e.at_start = false;
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.with(|e| e.paused = true);
    }

    fn is_paused(&self) -> bool {
        self.with(|e| e.paused)
    }

    fn seek_to_start(&mut self) {
        self.with(|e| e.at_start = true);
    }

    fn set_volume(&mut self, volume: f32) {
        self.with(|e| e.volume = volume.clamp(0.0, 1.0));
    }

    fn volume(&self) -> f32 {
        self.with(|e| e.volume)
    }
}
