//! Timer state structure and the persisted subset of it

use serde::{Deserialize, Serialize};

use crate::audio::SoundId;

/// Smallest countdown length a user can pick, in minutes
pub const MIN_MINUTES: u32 = 1;
/// Largest countdown length a user can pick (one day), in minutes
pub const MAX_MINUTES: u32 = 1440;
/// Upper bound for the number of work sessions before a long break, the
/// top of the settings slider
pub const MAX_CYCLES: u32 = 10;
/// Largest accepted volume value
pub const MAX_VOLUME: u8 = 100;

/// Which duration source drives the active countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Countdown,
    Pomodoro,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Countdown => "countdown",
            TimerMode::Pomodoro => "pomodoro",
        }
    }
}

/// Pomodoro phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PomodoroPhase {
    Work,
    Short,
    Long,
}

impl PomodoroPhase {
    /// Human readable phase name
    pub fn label(&self) -> &'static str {
        match self {
            PomodoroPhase::Work => "Work Session",
            PomodoroPhase::Short => "Short Break",
            PomodoroPhase::Long => "Long Break",
        }
    }
}

/// Pomodoro configuration plus the position within the cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    /// Work sessions before a long break
    pub cycles: u32,
    pub current_phase: PomodoroPhase,
    pub current_cycle: u32,
    /// Finished work phases since the last reset
    pub completed_cycles: u32,
}

impl PomodoroSettings {
    /// Length of the given phase in minutes
    pub fn minutes_for(&self, phase: PomodoroPhase) -> u32 {
        match phase {
            PomodoroPhase::Work => self.work_minutes,
            PomodoroPhase::Short => self.short_break_minutes,
            PomodoroPhase::Long => self.long_break_minutes,
        }
    }

    /// Length of the current phase in seconds
    pub fn current_phase_seconds(&self) -> u32 {
        self.minutes_for(self.current_phase) * 60
    }
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            cycles: 4,
            current_phase: PomodoroPhase::Work,
            current_cycle: 1,
            completed_cycles: 0,
        }
    }
}

/// Partial pomodoro settings; `None` fields keep their previous value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroUpdate {
    pub work_minutes: Option<u32>,
    pub short_break_minutes: Option<u32>,
    pub long_break_minutes: Option<u32>,
    pub cycles: Option<u32>,
}

/// A user-saved timer shortcut
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub minutes: u32,
    pub sound: SoundId,
    pub volume: u8,
}

impl Preset {
    fn stock(id: &str, name: &str, minutes: u32, sound: SoundId, volume: u8) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            minutes,
            sound,
            volume,
        }
    }

    /// Presets shipped with a fresh install
    pub fn defaults() -> Vec<Preset> {
        vec![
            Self::stock("focus25", "Focus Session", 25, SoundId::Rain, 60),
            Self::stock("study45", "Study Block", 45, SoundId::Cafe, 50),
        ]
    }
}

/// Complete timer state for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    pub minutes: u32,
    pub seconds_left: u32,
    pub total_seconds: u32,
    pub is_running: bool,
    pub is_completed: bool,
    pub sound: SoundId,
    pub volume: u8,
    pub pomodoro: PomodoroSettings,
    pub presets: Vec<Preset>,
}

impl TimerState {
    /// Create the default state used when nothing was persisted
    pub fn new() -> Self {
        Self {
            mode: TimerMode::Countdown,
            minutes: 25,
            seconds_left: 1500,
            total_seconds: 1500,
            is_running: false,
            is_completed: false,
            sound: SoundId::Rain,
            volume: 60,
            pomodoro: PomodoroSettings::default(),
            presets: Preset::defaults(),
        }
    }

    /// Duration of the active phase in seconds, derived from the mode
    pub fn active_duration_seconds(&self) -> u32 {
        match self.mode {
            TimerMode::Countdown => self.minutes * 60,
            TimerMode::Pomodoro => self.pomodoro.current_phase_seconds(),
        }
    }

    /// Elapsed share of the current phase, 0.0 to 100.0
    pub fn progress_percent(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        let elapsed = self.total_seconds.saturating_sub(self.seconds_left);
        f64::from(elapsed) / f64::from(self.total_seconds) * 100.0
    }

    /// Whether the tick driver should be advancing this state
    pub fn should_tick(&self) -> bool {
        self.is_running && self.seconds_left > 0
    }

    /// Extract the subset that survives a restart
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            sound: self.sound,
            volume: self.volume,
            minutes: self.minutes,
            pomodoro: self.pomodoro.clone(),
            presets: self.presets.clone(),
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

/// User preferences written to storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    pub sound: SoundId,
    pub volume: u8,
    pub minutes: u32,
    pub pomodoro: PomodoroSettings,
    pub presets: Vec<Preset>,
}

impl Default for PersistedState {
    fn default() -> Self {
        TimerState::new().persisted()
    }
}

/// Format seconds as `MM:SS`; minutes grow past two digits for long timers
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
