use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pulse::connection::stream_handler;
use pulse::dispatch::{emit_handler, history_handler, EventDispatcher};
use pulse::presence::{
    heartbeat_handler, roster_handler, start_sweep_task, PresenceConfig, PresenceTracker,
};
use pulse::registry::{start_reap_task, ReapConfig, RoomRegistry};
use pulse::shared::AppState;

const PRESENCE_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pulse realtime hub");

    // Explicitly constructed hub state, injected everywhere.
    // One registry instance per process; tests build their own.
    let room_registry = Arc::new(RoomRegistry::new());
    let presence_tracker = Arc::new(PresenceTracker::new(PresenceConfig::default()));
    let dispatcher = Arc::new(EventDispatcher::new(
        room_registry.clone(),
        presence_tracker.clone(),
    ));
    let app_state = AppState::new(room_registry.clone(), presence_tracker.clone(), dispatcher);

    // Background maintenance: reap idle rooms, sweep stale presence
    tokio::spawn(start_reap_task(room_registry, ReapConfig::default()));
    tokio::spawn(start_sweep_task(presence_tracker, PRESENCE_SWEEP_INTERVAL));

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/realtime/stream", get(stream_handler))
        .route("/realtime/emit", post(emit_handler))
        .route("/realtime/history", get(history_handler))
        .route(
            "/realtime/presence",
            post(heartbeat_handler).get(roster_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Hub listening on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
