//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};

use crate::{
    audio::{available_sounds, SoundOption, PREVIEW_DURATION},
    state::{
        find_template, AppState, PomodoroUpdate, Preset, QuickDuration, TimerStore,
        POMODORO_TEMPLATES, QUICK_DURATIONS,
    },
};
use super::responses::{
    ApiResponse, AudioResponse, HealthResponse, MinutesRequest, ModeRequest, PresetRequest,
    SoundRequest, StatusResponse, TemplateView, VolumeRequest,
};

type ApiResult = Result<Json<ApiResponse>, StatusCode>;

/// Run an action that always applies
async fn apply<F>(state: &AppState, action: &str, message: &str, updater: F) -> ApiResult
where
    F: FnOnce(&mut TimerStore),
{
    match state.update(action, updater).await {
        Ok((timer, ())) => Ok(Json(ApiResponse::ok(message.to_string(), timer))),
        Err(e) => {
            error!("Failed to apply {}: {}", action, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Run an action whose input may be rejected; a rejection leaves the state
/// unchanged and is still a successful response
async fn apply_checked<F>(state: &AppState, action: &str, message: &str, rejected: &str, updater: F) -> ApiResult
where
    F: FnOnce(&mut TimerStore) -> bool,
{
    match state.update(action, updater).await {
        Ok((timer, true)) => Ok(Json(ApiResponse::ok(message.to_string(), timer))),
        Ok((timer, false)) => Ok(Json(ApiResponse::rejected(rejected.to_string(), timer))),
        Err(e) => {
            error!("Failed to apply {}: {}", action, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /timer/start
pub async fn start_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    info!("Timer started");
    apply(&state, "start", "Timer started", TimerStore::start_timer).await
}

/// Handle POST /timer/pause
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    info!("Timer paused");
    apply(&state, "pause", "Timer paused", TimerStore::pause_timer).await
}

/// Handle POST /timer/reset
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    apply(&state, "reset", "Timer reset", TimerStore::reset_timer).await
}

/// Handle POST /timer/minutes
pub async fn minutes_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MinutesRequest>,
) -> ApiResult {
    apply_checked(
        &state,
        "set-minutes",
        &format!("Timer set to {} minutes", request.minutes),
        "Minutes must be between 1 and 1440",
        |store| store.set_minutes(request.minutes),
    ).await
}

/// Handle POST /timer/mode
pub async fn mode_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ModeRequest>,
) -> ApiResult {
    info!("Switching to {} mode", request.mode.as_str());
    apply(
        &state,
        "set-mode",
        &format!("Mode set to {}", request.mode.as_str()),
        |store| store.set_mode(request.mode),
    ).await
}

/// Handle POST /sound
pub async fn sound_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SoundRequest>,
) -> ApiResult {
    apply(
        &state,
        "set-sound",
        &format!("Sound set to {}", request.sound),
        |store| store.set_sound(request.sound),
    ).await
}

/// Handle POST /volume
pub async fn volume_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VolumeRequest>,
) -> ApiResult {
    apply_checked(
        &state,
        "set-volume",
        &format!("Volume set to {}", request.volume),
        "Volume must be between 0 and 100",
        |store| store.set_volume(request.volume),
    ).await
}

/// Handle POST /pomodoro/settings
pub async fn pomodoro_settings_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PomodoroUpdate>,
) -> ApiResult {
    apply_checked(
        &state,
        "pomodoro-settings",
        "Pomodoro settings updated",
        "Durations must be between 1 and 1440 minutes and cycles between 1 and 10",
        |store| store.set_pomodoro_settings(update),
    ).await
}

/// Handle GET /pomodoro/templates
pub async fn templates_handler() -> Json<Vec<TemplateView>> {
    Json(POMODORO_TEMPLATES.iter().map(TemplateView::from).collect())
}

/// Handle POST /pomodoro/templates/:id/apply
pub async fn apply_template_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let Some(template) = find_template(&id) else {
        return match state.get_timer_state() {
            Ok(timer) => Ok(Json(ApiResponse::rejected(
                format!("No pomodoro template with id {}", id),
                timer,
            ))),
            Err(e) => {
                error!("Failed to get timer state: {}", e);
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
    };
    info!("Applying pomodoro template {}", template.name);
    apply_checked(
        &state,
        "pomodoro-template",
        &format!("Pomodoro template '{}' applied", template.name),
        "Template settings out of range",
        |store| store.set_pomodoro_settings(template.update()),
    )
    .await
}

/// Handle GET /timer/durations - one-click countdown lengths
pub async fn durations_handler() -> Json<&'static [QuickDuration]> {
    Json(QUICK_DURATIONS)
}

/// Handle POST /pomodoro/next
pub async fn pomodoro_next_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    apply(&state, "pomodoro-next", "Advanced to next phase", TimerStore::next_pomodoro_phase).await
}

/// Handle POST /pomodoro/reset
pub async fn pomodoro_reset_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    apply(&state, "pomodoro-reset", "Pomodoro reset", TimerStore::reset_pomodoro).await
}

/// Handle GET /presets
pub async fn list_presets_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Preset>>, StatusCode> {
    match state.get_timer_state() {
        Ok(timer) => Ok(Json(timer.presets)),
        Err(e) => {
            error!("Failed to get timer state: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle POST /presets
pub async fn save_preset_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PresetRequest>,
) -> ApiResult {
    apply_checked(
        &state,
        "save-preset",
        &format!("Preset '{}' saved", request.name.trim()),
        "Preset name must not be empty",
        |store| store.save_preset(&request.name).is_some(),
    ).await
}

/// Handle DELETE /presets/:id
pub async fn delete_preset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    apply_checked(
        &state,
        "delete-preset",
        &format!("Preset {} deleted", id),
        &format!("No preset with id {}", id),
        |store| store.delete_preset(&id),
    ).await
}

/// Handle POST /presets/:id/load
pub async fn load_preset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    apply_checked(
        &state,
        "load-preset",
        &format!("Preset {} loaded", id),
        &format!("No preset with id {}", id),
        |store| store.load_preset(&id),
    ).await
}

/// Handle POST /audio/unlock - the first user gesture
pub async fn unlock_handler(State(state): State<Arc<AppState>>) -> Json<AudioResponse> {
    state.audio.unlock();
    Json(AudioResponse {
        started: false,
        audio: state.audio.status(),
    })
}

/// Handle POST /audio/preview - play a sound for a few seconds
pub async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SoundRequest>,
) -> Json<AudioResponse> {
    state.audio.unlock();
    let started = state.audio.preview(request.sound, PREVIEW_DURATION).await;
    Json(AudioResponse {
        started,
        audio: state.audio.status(),
    })
}

/// Handle GET /sounds
pub async fn sounds_handler() -> Json<Vec<SoundOption>> {
    Json(available_sounds())
}

/// Handle GET /status - Return current timer and audio status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let timer = match state.get_timer_state() {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to get timer state: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: timer.into(),
        audio: state.audio.status(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
