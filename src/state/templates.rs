//! Stock pomodoro configurations and quick countdown lengths

use serde::Serialize;

use super::timer_state::{PomodoroSettings, PomodoroUpdate};

/// A named pomodoro configuration that can be applied in one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub cycles: u32,
}

impl PomodoroTemplate {
    /// Settings update that switches to this template
    pub fn update(&self) -> PomodoroUpdate {
        PomodoroUpdate {
            work_minutes: Some(self.work_minutes),
            short_break_minutes: Some(self.short_break_minutes),
            long_break_minutes: Some(self.long_break_minutes),
            cycles: Some(self.cycles),
        }
    }

    pub fn total_minutes(&self) -> u32 {
        total_cycle_minutes(
            self.work_minutes,
            self.short_break_minutes,
            self.long_break_minutes,
            self.cycles,
        )
    }
}

pub const POMODORO_TEMPLATES: &[PomodoroTemplate] = &[
    PomodoroTemplate {
        id: "classic",
        name: "Classic",
        work_minutes: 25,
        short_break_minutes: 5,
        long_break_minutes: 15,
        cycles: 4,
    },
    PomodoroTemplate {
        id: "extended",
        name: "Extended",
        work_minutes: 45,
        short_break_minutes: 10,
        long_break_minutes: 20,
        cycles: 3,
    },
    PomodoroTemplate {
        id: "short-burst",
        name: "Short Burst",
        work_minutes: 15,
        short_break_minutes: 3,
        long_break_minutes: 10,
        cycles: 6,
    },
    PomodoroTemplate {
        id: "study-session",
        name: "Study Session",
        work_minutes: 50,
        short_break_minutes: 10,
        long_break_minutes: 30,
        cycles: 3,
    },
];

pub fn find_template(id: &str) -> Option<&'static PomodoroTemplate> {
    POMODORO_TEMPLATES.iter().find(|t| t.id == id)
}

/// Minutes for one full sequence: every work session, the short breaks
/// between them and the closing long break
pub fn total_cycle_minutes(work: u32, short_break: u32, long_break: u32, cycles: u32) -> u32 {
    work * cycles + short_break * cycles.saturating_sub(1) + long_break
}

impl PomodoroSettings {
    /// Length of one full sequence with these settings
    pub fn total_cycle_minutes(&self) -> u32 {
        total_cycle_minutes(
            self.work_minutes,
            self.short_break_minutes,
            self.long_break_minutes,
            self.cycles,
        )
    }
}

/// Format a length in minutes as `45m`, `2h` or `1h 30m`
pub fn format_duration(minutes: u32) -> String {
    let (hours, mins) = (minutes / 60, minutes % 60);
    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// One-click countdown length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickDuration {
    pub minutes: u32,
    pub label: &'static str,
}

const fn quick(minutes: u32, label: &'static str) -> QuickDuration {
    QuickDuration { minutes, label }
}

pub const QUICK_DURATIONS: &[QuickDuration] = &[
    quick(1, "1m"),
    quick(2, "2m"),
    quick(5, "5m"),
    quick(10, "10m"),
    quick(15, "15m"),
    quick(20, "20m"),
    quick(25, "25m"),
    quick(30, "30m"),
    quick(45, "45m"),
    quick(60, "1h"),
    quick(90, "1.5h"),
    quick(120, "2h"),
];
