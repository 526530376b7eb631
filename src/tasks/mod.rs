//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod audio_sync;
pub mod completion_notifier;
pub mod tick_driver;

// Re-export main functions
pub use audio_sync::audio_sync_task;
pub use completion_notifier::completion_notifier_task;
pub use tick_driver::{tick_driver_task, TICK_PERIOD};
