//! Background audio module
//!
//! This module contains the track registry, fade math, the playback backend
//! seam and the manager that drives one looping track at a time.

pub mod fade;
pub mod manager;
pub mod output;
pub mod tracks;

// Re-export main types
pub use fade::FadeSettings;
pub use manager::{AudioManager, AudioStatus, PREVIEW_DURATION};
pub use output::{AudioElement, AudioOutput, ElementSnapshot, PlaybackError, VirtualMixer};
pub use tracks::{available_sounds, find_track, AudioTrack, SoundId, SoundOption, AUDIO_TRACKS};
