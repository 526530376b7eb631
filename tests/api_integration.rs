//! Integration tests for the timer HTTP API
//!
//! Drives the router with in-memory storage and a virtual mixer, covering
//! timer control, pomodoro settings, presets, rejected inputs and audio.

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::StatusCode, Router};
use http::{Method, Request};
use serde_json::{json, Value};
use tower::ServiceExt;

use timer_with_music::{
    api::create_router,
    audio::{AudioManager, VirtualMixer},
    state::AppState,
    storage::{KeyValueStore, MemoryStore, STORAGE_KEY},
    tasks::{audio_sync_task, tick_driver_task},
};

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    storage: Arc<MemoryStore>,
}

fn setup_with_mixer(mixer: VirtualMixer) -> TestApp {
    let storage = Arc::new(MemoryStore::new());
    let audio = Arc::new(AudioManager::new(Arc::new(mixer)));
    let state = Arc::new(AppState::load(
        20554,
        "127.0.0.1".to_string(),
        Arc::clone(&storage) as Arc<dyn KeyValueStore>,
        audio,
    ));
    TestApp {
        router: create_router(Arc::clone(&state)),
        state,
        storage,
    }
}

fn setup() -> TestApp {
    setup_with_mixer(VirtualMixer::unlocked())
}

async fn request(app: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    let body = match body {
        Some(json_body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json_body.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_and_sounds() {
    let app = setup();

    let (status, body) = request(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = request(&app.router, Method::GET, "/sounds", None).await;
    assert_eq!(status, StatusCode::OK);
    let sounds = body.as_array().unwrap();
    assert_eq!(sounds.len(), 5);
    assert_eq!(sounds[0]["id"], "none");
    assert_eq!(sounds[1]["name"], "Rain Sounds");
}

#[tokio::test]
async fn test_status_reports_defaults() {
    let app = setup();
    let (status, body) = request(&app.router, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);

    let timer = &body["timer"];
    assert_eq!(timer["mode"], "countdown");
    assert_eq!(timer["minutes"], 25);
    assert_eq!(timer["secondsLeft"], 1500);
    assert_eq!(timer["display"], "25:00");
    assert_eq!(timer["progress"], 0.0);
    assert_eq!(timer["pomodoro"]["cycles"], 4);
    assert_eq!(body["audio"]["isPlaying"], false);
    assert_eq!(body["port"], 20554);
}

#[tokio::test]
async fn test_set_minutes_and_rejection() {
    let app = setup();

    let (status, body) = request(&app.router, Method::POST, "/timer/minutes", Some(json!({"minutes": 10}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["secondsLeft"], 600);
    assert_eq!(body["timer"]["totalSeconds"], 600);

    for minutes in [0, 1441, -3] {
        let (status, body) =
            request(&app.router, Method::POST, "/timer/minutes", Some(json!({ "minutes": minutes }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "rejected");
        assert_eq!(body["timer"]["secondsLeft"], 600);
    }

    let saved = app.storage.get(STORAGE_KEY).unwrap().unwrap();
    assert_eq!(saved["state"]["minutes"], 10);
}

#[tokio::test]
async fn test_volume_rejection() {
    let app = setup();
    for volume in [150, -10] {
        let (_, body) = request(&app.router, Method::POST, "/volume", Some(json!({ "volume": volume }))).await;
        assert_eq!(body["status"], "rejected");
        assert_eq!(body["timer"]["volume"], 60);
    }
    let (_, body) = request(&app.router, Method::POST, "/volume", Some(json!({"volume": 35}))).await;
    assert_eq!(body["timer"]["volume"], 35);
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let app = setup();
    let (status, _) = request(&app.router, Method::POST, "/sound", Some(json!({"sound": "thunder"}))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_start_pause_reset() {
    let app = setup();

    let (_, body) = request(&app.router, Method::POST, "/timer/start", None).await;
    assert_eq!(body["timer"]["isRunning"], true);
    app.state.tick().await.unwrap();
    app.state.tick().await.unwrap();

    let (_, body) = request(&app.router, Method::POST, "/timer/pause", None).await;
    assert_eq!(body["timer"]["isRunning"], false);
    assert_eq!(body["timer"]["secondsLeft"], 1498);
    assert_eq!(body["timer"]["display"], "24:58");

    let (_, body) = request(&app.router, Method::POST, "/timer/reset", None).await;
    assert_eq!(body["timer"]["secondsLeft"], 1500);

    let (_, body) = request(&app.router, Method::GET, "/status", None).await;
    assert_eq!(body["last_action"], "reset");
}

#[tokio::test]
async fn test_pomodoro_flow() {
    let app = setup();

    let (_, body) = request(&app.router, Method::POST, "/timer/mode", Some(json!({"mode": "pomodoro"}))).await;
    assert_eq!(body["timer"]["phaseLabel"], "Work Session");

    let (_, body) = request(
        &app.router,
        Method::POST,
        "/pomodoro/settings",
        Some(json!({"workMinutes": 50, "cycles": 2})),
    )
    .await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["secondsLeft"], 3000);
    assert_eq!(body["timer"]["pomodoro"]["shortBreakMinutes"], 5);

    let (_, body) = request(&app.router, Method::POST, "/pomodoro/settings", Some(json!({"cycles": 0}))).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["timer"]["pomodoro"]["cycles"], 2);

    let (_, body) = request(&app.router, Method::POST, "/pomodoro/next", None).await;
    assert_eq!(body["timer"]["pomodoro"]["currentPhase"], "short");
    let (_, body) = request(&app.router, Method::POST, "/pomodoro/next", None).await;
    assert_eq!(body["timer"]["pomodoro"]["currentPhase"], "work");
    assert_eq!(body["timer"]["pomodoro"]["currentCycle"], 2);
    let (_, body) = request(&app.router, Method::POST, "/pomodoro/next", None).await;
    assert_eq!(body["timer"]["pomodoro"]["currentPhase"], "long");
    assert_eq!(body["timer"]["phaseLabel"], "Long Break");

    let (_, body) = request(&app.router, Method::POST, "/pomodoro/reset", None).await;
    assert_eq!(body["timer"]["pomodoro"]["currentPhase"], "work");
    assert_eq!(body["timer"]["pomodoro"]["completedCycles"], 0);
    assert_eq!(body["timer"]["secondsLeft"], 3000);
}

#[tokio::test]
async fn test_pomodoro_templates_and_quick_durations() {
    let app = setup();

    let (status, templates) = request(&app.router, Method::GET, "/pomodoro/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    let templates = templates.as_array().unwrap();
    assert_eq!(templates.len(), 4);
    assert_eq!(templates[0]["id"], "classic");
    assert_eq!(templates[0]["totalLabel"], "2h 10m");
    assert_eq!(templates[3]["name"], "Study Session");
    assert_eq!(templates[3]["totalMinutes"], 200);

    let (_, body) = request(&app.router, Method::POST, "/pomodoro/templates/short-burst/apply", None).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["pomodoro"]["workMinutes"], 15);
    assert_eq!(body["timer"]["pomodoro"]["cycles"], 6);
    // Stopped, so the countdown reloads with the work phase length
    assert_eq!(body["timer"]["secondsLeft"], 900);

    let (_, body) = request(&app.router, Method::POST, "/timer/mode", Some(json!({"mode": "pomodoro"}))).await;
    assert_eq!(body["timer"]["cycleTotal"], "1h 55m");

    let (_, body) = request(&app.router, Method::POST, "/pomodoro/templates/marathon/apply", None).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["timer"]["pomodoro"]["cycles"], 6);

    let (_, durations) = request(&app.router, Method::GET, "/timer/durations", None).await;
    let durations = durations.as_array().unwrap();
    assert_eq!(durations.len(), 12);
    assert_eq!(durations[9]["label"], "1h");
    assert_eq!(durations[11]["minutes"], 120);
}

#[tokio::test]
async fn test_preset_crud() {
    let app = setup();

    let (_, presets) = request(&app.router, Method::GET, "/presets", None).await;
    assert_eq!(presets.as_array().unwrap().len(), 2);

    request(&app.router, Method::POST, "/timer/minutes", Some(json!({"minutes": 15}))).await;
    request(&app.router, Method::POST, "/sound", Some(json!({"sound": "white"}))).await;
    let (_, body) = request(&app.router, Method::POST, "/presets", Some(json!({"name": "Quick"}))).await;
    assert_eq!(body["status"], "ok");
    let saved = body["timer"]["presets"].as_array().unwrap().last().unwrap().clone();
    assert_eq!(saved["minutes"], 15);
    assert_eq!(saved["sound"], "white");
    let id = saved["id"].as_str().unwrap().to_string();

    let (_, body) = request(&app.router, Method::POST, "/presets/study45/load", None).await;
    assert_eq!(body["timer"]["minutes"], 45);
    assert_eq!(body["timer"]["sound"], "cafe");

    let (_, body) = request(&app.router, Method::POST, &format!("/presets/{}/load", id), None).await;
    assert_eq!(body["timer"]["secondsLeft"], 900);

    let (_, body) = request(&app.router, Method::DELETE, &format!("/presets/{}", id), None).await;
    assert_eq!(body["status"], "ok");
    let (_, body) = request(&app.router, Method::DELETE, &format!("/presets/{}", id), None).await;
    assert_eq!(body["status"], "rejected");

    let (_, body) = request(&app.router, Method::POST, "/presets", Some(json!({"name": "  "}))).await;
    assert_eq!(body["status"], "rejected");
}

#[tokio::test(start_paused = true)]
async fn test_countdown_scenario_with_background_tasks() {
    let app = setup();
    tokio::spawn(tick_driver_task(Arc::clone(&app.state)));
    tokio::spawn(audio_sync_task(Arc::clone(&app.state)));

    request(&app.router, Method::POST, "/timer/minutes", Some(json!({"minutes": 10}))).await;
    request(&app.router, Method::POST, "/timer/start", None).await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    let (_, body) = request(&app.router, Method::GET, "/status", None).await;
    assert_eq!(body["audio"]["currentTrack"], "rain");
    assert_eq!(body["audio"]["isPlaying"], true);

    tokio::time::sleep(Duration::from_secs(600)).await;
    let (_, body) = request(&app.router, Method::GET, "/status", None).await;
    assert_eq!(body["timer"]["isCompleted"], true);
    assert_eq!(body["timer"]["secondsLeft"], 0);
    assert_eq!(body["timer"]["progress"], 100.0);
    assert_eq!(body["audio"]["isPlaying"], false);
}

#[tokio::test(start_paused = true)]
async fn test_audio_waits_for_unlock() {
    let app = setup_with_mixer(VirtualMixer::new());
    tokio::spawn(audio_sync_task(Arc::clone(&app.state)));

    request(&app.router, Method::POST, "/timer/start", None).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!app.state.audio.is_playing());

    let (_, body) = request(&app.router, Method::POST, "/audio/unlock", None).await;
    assert_eq!(body["audio"]["unlocked"], true);

    let (_, body) = request(&app.router, Method::POST, "/audio/preview", Some(json!({"sound": "ocean"}))).await;
    assert_eq!(body["started"], true);
    assert_eq!(body["audio"]["currentTrack"], "ocean");
}
