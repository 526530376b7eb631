//! Timer and Pomodoro state machine
//!
//! `TimerStore` owns a [`TimerState`] and exposes the only operations allowed
//! to mutate it. Out-of-range inputs are dropped without an error so that a
//! stray slider value can never break a running session; each rejection is
//! logged at debug level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::timer_state::{
    PersistedState, PomodoroPhase, PomodoroUpdate, Preset, TimerMode, TimerState, MAX_CYCLES,
    MAX_MINUTES, MAX_VOLUME, MIN_MINUTES,
};
use crate::audio::SoundId;

/// Emitted when the active countdown reaches zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub mode: TimerMode,
    /// Phase that just finished (pomodoro mode only)
    pub phase: Option<PomodoroPhase>,
    /// Phase the pomodoro advanced to (pomodoro mode only)
    pub next_phase: Option<PomodoroPhase>,
    pub completed_cycles: u32,
    pub cycles: u32,
    pub minutes: u32,
    pub completed_at: DateTime<Utc>,
}

impl CompletionEvent {
    /// Notification title
    pub fn title(&self) -> &'static str {
        match self.mode {
            TimerMode::Countdown => "Timer Completed!",
            TimerMode::Pomodoro => "Pomodoro Phase Complete!",
        }
    }

    /// Notification body
    pub fn body(&self) -> String {
        match (self.mode, self.phase) {
            (TimerMode::Pomodoro, Some(phase)) => {
                let hint = match self.next_phase {
                    Some(PomodoroPhase::Long) => "Time for a long break!",
                    Some(PomodoroPhase::Short) => "Time for a short break!",
                    _ => "Ready for the next work session!",
                };
                format!("Your {} is complete. {}", phase.label().to_lowercase(), hint)
            }
            _ => format!("Your {} minute timer is complete.", self.minutes),
        }
    }
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not running or already at zero, nothing changed
    Idle,
    /// One second was taken off the clock
    Ticked,
    /// The countdown reached zero
    Completed(CompletionEvent),
}

/// Owner of the timer state and its actions
#[derive(Debug, Clone, Default)]
pub struct TimerStore {
    state: TimerState,
}

fn minutes_in_range(minutes: i64) -> bool {
    (i64::from(MIN_MINUTES)..=i64::from(MAX_MINUTES)).contains(&minutes)
}

impl TimerStore {
    /// Create a store holding the default state
    pub fn new() -> Self {
        Self {
            state: TimerState::new(),
        }
    }

    /// Create a store from previously persisted preferences
    pub fn with_persisted(persisted: PersistedState) -> Self {
        let mut store = Self::new();
        store.apply_persisted(persisted);
        store
    }

    /// Read access to the current state
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Subset of the state that should be written to storage
    pub fn persisted(&self) -> PersistedState {
        self.state.persisted()
    }

    /// Rehydrate preferences, keeping defaults for any value out of range
    pub fn apply_persisted(&mut self, persisted: PersistedState) {
        if minutes_in_range(i64::from(persisted.minutes)) {
            self.state.minutes = persisted.minutes;
        } else {
            debug!("Ignoring persisted minutes out of range: {}", persisted.minutes);
        }
        if persisted.volume <= MAX_VOLUME {
            self.state.volume = persisted.volume;
        }
        self.state.sound = persisted.sound;

        let pomodoro = persisted.pomodoro;
        let durations_valid = [
            pomodoro.work_minutes,
            pomodoro.short_break_minutes,
            pomodoro.long_break_minutes,
        ]
        .iter()
        .all(|m| minutes_in_range(i64::from(*m)));
        if durations_valid && (1..=MAX_CYCLES).contains(&pomodoro.cycles) && pomodoro.current_cycle >= 1 {
            self.state.pomodoro = pomodoro;
        } else {
            debug!("Ignoring invalid persisted pomodoro settings: {:?}", pomodoro);
        }

        self.state.presets = persisted.presets;
        self.restart_active_duration();
    }

    fn set_duration(&mut self, seconds: u32) {
        self.state.seconds_left = seconds;
        self.state.total_seconds = seconds;
        self.state.is_running = false;
        self.state.is_completed = false;
    }

    fn restart_active_duration(&mut self) {
        let seconds = self.state.active_duration_seconds();
        self.set_duration(seconds);
    }

    /// Start (or continue) the countdown
    pub fn start_timer(&mut self) {
        self.state.is_running = true;
        self.state.is_completed = false;
    }

    /// Stop the countdown, keeping the remaining time
    pub fn pause_timer(&mut self) {
        self.state.is_running = false;
    }

    /// Rewind the active phase to its full duration
    pub fn reset_timer(&mut self) {
        self.restart_active_duration();
    }

    /// Set the countdown length. Returns false when `minutes` is out of range
    pub fn set_minutes(&mut self, minutes: i64) -> bool {
        if !minutes_in_range(minutes) {
            debug!("Rejecting minutes out of range: {}", minutes);
            return false;
        }
        let minutes = minutes as u32;
        self.state.minutes = minutes;
        self.set_duration(minutes * 60);
        true
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.should_tick() {
            return TickOutcome::Idle;
        }

        self.state.seconds_left -= 1;
        if self.state.seconds_left > 0 {
            return TickOutcome::Ticked;
        }

        self.state.is_running = false;
        self.state.is_completed = true;

        let mut event = CompletionEvent {
            mode: self.state.mode,
            phase: None,
            next_phase: None,
            completed_cycles: self.state.pomodoro.completed_cycles,
            cycles: self.state.pomodoro.cycles,
            minutes: self.state.total_seconds / 60,
            completed_at: Utc::now(),
        };

        if self.state.mode == TimerMode::Pomodoro {
            event.phase = Some(self.state.pomodoro.current_phase);
            self.next_pomodoro_phase();
            event.next_phase = Some(self.state.pomodoro.current_phase);
            event.completed_cycles = self.state.pomodoro.completed_cycles;
        }

        TickOutcome::Completed(event)
    }

    /// Select the background sound
    pub fn set_sound(&mut self, sound: SoundId) {
        self.state.sound = sound;
    }

    /// Set the volume. Returns false when `volume` is outside 0..=100
    pub fn set_volume(&mut self, volume: i64) -> bool {
        if !(0..=i64::from(MAX_VOLUME)).contains(&volume) {
            debug!("Rejecting volume out of range: {}", volume);
            return false;
        }
        self.state.volume = volume as u8;
        true
    }

    /// Merge changed pomodoro settings.
    ///
    /// The update is rejected as a whole if any duration is outside
    /// 1..=1440 minutes or `cycles` is outside 1..=10. Whenever the timer is
    /// stopped the countdown is reloaded with the current phase's duration,
    /// whatever the mode; phase and cycle counters are never touched.
    pub fn set_pomodoro_settings(&mut self, update: PomodoroUpdate) -> bool {
        let durations = [
            update.work_minutes,
            update.short_break_minutes,
            update.long_break_minutes,
        ];
        if durations.iter().flatten().any(|m| !minutes_in_range(i64::from(*m))) {
            debug!("Rejecting pomodoro durations out of range: {:?}", update);
            return false;
        }
        if update.cycles.is_some_and(|c| !(1..=MAX_CYCLES).contains(&c)) {
            debug!("Rejecting pomodoro cycles out of range: {:?}", update.cycles);
            return false;
        }

        let pomodoro = &mut self.state.pomodoro;
        if let Some(work) = update.work_minutes {
            pomodoro.work_minutes = work;
        }
        if let Some(short) = update.short_break_minutes {
            pomodoro.short_break_minutes = short;
        }
        if let Some(long) = update.long_break_minutes {
            pomodoro.long_break_minutes = long;
        }
        if let Some(cycles) = update.cycles {
            pomodoro.cycles = cycles;
        }

        if !self.state.is_running {
            let seconds = self.state.pomodoro.current_phase_seconds();
            self.state.seconds_left = seconds;
            self.state.total_seconds = seconds;
        }
        true
    }

    /// Move to the next pomodoro phase
    pub fn next_pomodoro_phase(&mut self) {
        let pomodoro = &mut self.state.pomodoro;
        match pomodoro.current_phase {
            PomodoroPhase::Work => {
                pomodoro.completed_cycles += 1;
                pomodoro.current_phase = if pomodoro.completed_cycles % pomodoro.cycles == 0 {
                    PomodoroPhase::Long
                } else {
                    PomodoroPhase::Short
                };
            }
            previous => {
                pomodoro.current_phase = PomodoroPhase::Work;
                if previous == PomodoroPhase::Long {
                    pomodoro.current_cycle = 1;
                } else {
                    pomodoro.current_cycle += 1;
                }
            }
        }

        debug!(
            "Pomodoro advanced to {:?} (cycle {}, completed {})",
            pomodoro.current_phase, pomodoro.current_cycle, pomodoro.completed_cycles
        );
        let seconds = pomodoro.current_phase_seconds();
        self.set_duration(seconds);
    }

    /// Start the pomodoro sequence over from the first work session
    pub fn reset_pomodoro(&mut self) {
        let pomodoro = &mut self.state.pomodoro;
        pomodoro.current_phase = PomodoroPhase::Work;
        pomodoro.current_cycle = 1;
        pomodoro.completed_cycles = 0;
        let seconds = pomodoro.work_minutes * 60;
        self.set_duration(seconds);
    }

    /// Save the current minutes/sound/volume as a preset
    pub fn save_preset(&mut self, name: &str) -> Option<Preset> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Rejecting preset with empty name");
            return None;
        }

        let base = Utc::now().timestamp_millis().to_string();
        let mut id = base.clone();
        let mut suffix = 1;
        while self.state.presets.iter().any(|p| p.id == id) {
            id = format!("{}-{}", base, suffix);
            suffix += 1;
        }

        let preset = Preset {
            id,
            name: name.to_string(),
            minutes: self.state.minutes,
            sound: self.state.sound,
            volume: self.state.volume,
        };
        self.state.presets.push(preset.clone());
        Some(preset)
    }

    /// Remove a preset. Returns false if no preset has that id
    pub fn delete_preset(&mut self, id: &str) -> bool {
        let before = self.state.presets.len();
        self.state.presets.retain(|p| p.id != id);
        self.state.presets.len() != before
    }

    /// Apply a preset's minutes, sound and volume
    pub fn load_preset(&mut self, id: &str) -> bool {
        let Some(preset) = self.state.presets.iter().find(|p| p.id == id).cloned() else {
            debug!("Preset not found: {}", id);
            return false;
        };

        self.set_minutes(i64::from(preset.minutes));
        self.state.sound = preset.sound;
        self.set_volume(i64::from(preset.volume));
        true
    }

    /// Switch between countdown and pomodoro
    pub fn set_mode(&mut self, mode: TimerMode) {
        self.state.mode = mode;
        let seconds = match mode {
            TimerMode::Pomodoro => self.state.pomodoro.work_minutes * 60,
            TimerMode::Countdown => self.state.minutes * 60,
        };
        self.set_duration(seconds);
    }
}
