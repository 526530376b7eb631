//! Static registry of background sound tracks

use serde::{Deserialize, Serialize};

/// Identifier of a background sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundId {
    Rain,
    Ocean,
    Cafe,
    White,
    None,
}

impl SoundId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundId::Rain => "rain",
            SoundId::Ocean => "ocean",
            SoundId::Cafe => "cafe",
            SoundId::White => "white",
            SoundId::None => "none",
        }
    }
}

impl std::fmt::Display for SoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loopable background track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioTrack {
    pub id: SoundId,
    pub name: &'static str,
    pub url: &'static str,
}

pub const AUDIO_TRACKS: &[AudioTrack] = &[
    AudioTrack {
        id: SoundId::Rain,
        name: "Rain Sounds",
        url: "/audio/rain.mp3",
    },
    AudioTrack {
        id: SoundId::Ocean,
        name: "Ocean Waves",
        url: "/audio/ocean-waves.mp3",
    },
    AudioTrack {
        id: SoundId::Cafe,
        name: "Café Ambiance",
        url: "/audio/cafe-ambiance.mp3",
    },
    AudioTrack {
        id: SoundId::White,
        name: "White Noise",
        url: "/audio/white-noise.mp3",
    },
];

/// Look up the track for a sound; `SoundId::None` has no track
pub fn find_track(id: SoundId) -> Option<&'static AudioTrack> {
    AUDIO_TRACKS.iter().find(|track| track.id == id)
}

/// Entry of the sound picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoundOption {
    pub id: SoundId,
    pub name: &'static str,
}

/// All selectable sounds, silence first
pub fn available_sounds() -> Vec<SoundOption> {
    std::iter::once(SoundOption {
        id: SoundId::None,
        name: "Silent",
    })
    .chain(AUDIO_TRACKS.iter().map(|track| SoundOption {
        id: track.id,
        name: track.name,
    }))
    .collect()
}
