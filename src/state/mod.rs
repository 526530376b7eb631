//! State management module
//!
//! This module contains the timer data model, the state machine that mutates
//! it and the shared application state wrapped around both.

pub mod app_state;
pub mod store;
pub mod templates;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use store::{CompletionEvent, TickOutcome, TimerStore};
pub use templates::{
    find_template, format_duration, PomodoroTemplate, QuickDuration, POMODORO_TEMPLATES,
    QUICK_DURATIONS,
};
pub use timer_state::{
    format_time, PersistedState, PomodoroPhase, PomodoroSettings, PomodoroUpdate, Preset,
    TimerMode, TimerState,
};
