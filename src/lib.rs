//! Timer with Music - a countdown and Pomodoro timer service
//!
//! This library provides the timer state machine, the one-second tick
//! driver, background music playback with fades and an HTTP API that
//! drives them.

pub mod api;
pub mod audio;
pub mod config;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use audio::AudioManager;
pub use config::Config;
pub use state::{AppState, TimerStore};
pub use utils::signals::shutdown_signal;
