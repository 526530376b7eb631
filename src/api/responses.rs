//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    audio::{AudioStatus, SoundId},
    state::{format_duration, format_time, PomodoroTemplate, TimerMode, TimerState},
};

/// Timer state plus the derived display values
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub state: TimerState,
    pub progress: f64,
    pub display: String,
    pub phase_label: Option<&'static str>,
    /// Length of a full pomodoro sequence, e.g. `2h 10m`
    pub cycle_total: Option<String>,
}

impl From<TimerState> for TimerView {
    fn from(state: TimerState) -> Self {
        let (phase_label, cycle_total) = match state.mode {
            TimerMode::Pomodoro => (
                Some(state.pomodoro.current_phase.label()),
                Some(format_duration(state.pomodoro.total_cycle_minutes())),
            ),
            TimerMode::Countdown => (None, None),
        };
        Self {
            progress: state.progress_percent(),
            display: format_time(state.seconds_left),
            phase_label,
            cycle_total,
            state,
        }
    }
}

/// API response structure for action endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: TimerState) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer: timer.into(),
        }
    }

    /// The action was applied
    pub fn ok(message: String, timer: TimerState) -> Self {
        Self::new("ok".to_string(), message, timer)
    }

    /// The input was out of range and the state is unchanged
    pub fn rejected(message: String, timer: TimerState) -> Self {
        Self::new("rejected".to_string(), message, timer)
    }
}

/// Full status response
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub timer: TimerView,
    pub audio: AudioStatus,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Pomodoro template with its total sequence length
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    #[serde(flatten)]
    pub template: PomodoroTemplate,
    pub total_minutes: u32,
    pub total_label: String,
}

impl From<&PomodoroTemplate> for TemplateView {
    fn from(template: &PomodoroTemplate) -> Self {
        let total_minutes = template.total_minutes();
        Self {
            template: *template,
            total_minutes,
            total_label: format_duration(total_minutes),
        }
    }
}

/// Response of the audio endpoints
#[derive(Debug, Clone, Serialize)]
pub struct AudioResponse {
    pub started: bool,
    pub audio: AudioStatus,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MinutesRequest {
    pub minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    pub volume: i64,
}

#[derive(Debug, Deserialize)]
pub struct SoundRequest {
    pub sound: SoundId,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: TimerMode,
}

#[derive(Debug, Deserialize)]
pub struct PresetRequest {
    pub name: String,
}

