//! Timer with Music - a countdown and Pomodoro timer service
//!
//! This is the main entry point for the timer-with-music application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use timer_with_music::{
    api::create_router,
    audio::{AudioManager, AudioOutput, VirtualMixer},
    config::Config,
    state::AppState,
    storage::{FileStore, KeyValueStore, MemoryStore},
    tasks::{audio_sync_task, completion_notifier_task, tick_driver_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("timer_with_music={},tower_http=info", config.log_level()))
        .init();

    info!("Starting timer-with-music server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, storage={:?}",
          config.host, config.port, config.storage);

    let storage: Arc<dyn KeyValueStore> = match &config.storage {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };

    let output: Arc<dyn AudioOutput> = if config.autoplay_unlocked {
        Arc::new(VirtualMixer::unlocked())
    } else {
        Arc::new(VirtualMixer::new())
    };
    let audio = Arc::new(AudioManager::new(output));

    // Create application state, rehydrated from saved preferences
    let state = Arc::new(AppState::load(config.port, config.host.clone(), storage, audio));

    // Start the background tasks
    tokio::spawn(tick_driver_task(Arc::clone(&state)));
    tokio::spawn(audio_sync_task(Arc::clone(&state)));
    tokio::spawn(completion_notifier_task(Arc::clone(&state)));

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start|pause|reset   - Timer controls");
    info!("  POST /timer/minutes, /timer/mode - Countdown length and mode");
    info!("  POST /sound, /volume             - Background music");
    info!("  POST /pomodoro/settings|next|reset");
    info!("  GET  /pomodoro/templates, POST /pomodoro/templates/:id/apply");
    info!("  GET|POST /presets, DELETE /presets/:id, POST /presets/:id/load");
    info!("  POST /audio/unlock, /audio/preview");
    info!("  GET  /status, /sounds, /timer/durations, /health");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.audio.destroy().await;
    if let Err(e) = state.save().await {
        tracing::error!("{}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
