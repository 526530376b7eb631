//! HTTP API module
//!
//! This module contains all HTTP endpoint handlers and response structures.

pub mod handlers;
pub mod responses;

use std::sync::Arc;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timer/start", post(start_handler))
        .route("/timer/pause", post(pause_handler))
        .route("/timer/reset", post(reset_handler))
        .route("/timer/minutes", post(minutes_handler))
        .route("/timer/mode", post(mode_handler))
        .route("/timer/durations", get(durations_handler))
        .route("/sound", post(sound_handler))
        .route("/volume", post(volume_handler))
        .route("/pomodoro/settings", post(pomodoro_settings_handler))
        .route("/pomodoro/next", post(pomodoro_next_handler))
        .route("/pomodoro/reset", post(pomodoro_reset_handler))
        .route("/pomodoro/templates", get(templates_handler))
        .route("/pomodoro/templates/:id/apply", post(apply_template_handler))
        .route("/presets", get(list_presets_handler).post(save_preset_handler))
        .route("/presets/:id", delete(delete_preset_handler))
        .route("/presets/:id/load", post(load_preset_handler))
        .route("/audio/unlock", post(unlock_handler))
        .route("/audio/preview", post(preview_handler))
        .route("/sounds", get(sounds_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
