//! Stepwise linear volume fades

use std::time::Duration;

/// Timing of fade transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeSettings {
    pub fade_in: Duration,
    pub fade_in_steps: u32,
    pub fade_out: Duration,
    pub fade_out_steps: u32,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            fade_in: Duration::from_millis(1000),
            fade_in_steps: 20,
            fade_out: Duration::from_millis(500),
            fade_out_steps: 10,
        }
    }
}

/// Volume after `step` of `steps`, moving linearly from `start` to `end`.
///
/// The last step returns `end` exactly so a fade never stops short of its
/// target because of float rounding.
pub fn fade_level(start: f32, end: f32, step: u32, steps: u32) -> f32 {
    if steps == 0 || step >= steps {
        return end;
    }
    let t = step as f32 / steps as f32;
    (start + (end - start) * t).clamp(0.0, 1.0)
}

/// Time to wait between two fade steps
pub fn step_interval(duration: Duration, steps: u32) -> Duration {
    if steps == 0 {
        Duration::ZERO
    } else {
        duration / steps
    }
}
