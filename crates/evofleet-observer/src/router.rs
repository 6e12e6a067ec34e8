//! Axum router construction for the dashboard server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{feed, handlers, operator, ws};

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /ws/feed` -- duplex producer feed
/// - `GET /ws/dashboard` -- `WebSocket` update stream
/// - `GET /api/fleet`, `/api/state`, `/api/workers`, `/api/workers/{id}`,
///   `/api/buckets` -- snapshot reads
/// - `GET`/`PUT /api/config` -- run configuration
/// - `POST /api/operator/{prepare,run,pause,stop}` -- fleet commands
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/feed", get(feed::ws_feed))
        .route("/ws/dashboard", get(ws::ws_dashboard))
        // Read API
        .route("/api/fleet", get(handlers::get_fleet))
        .route("/api/state", get(handlers::get_state))
        .route("/api/workers", get(handlers::list_workers))
        .route("/api/workers/{id}", get(handlers::get_worker))
        .route("/api/buckets", get(handlers::list_buckets))
        .route(
            "/api/config",
            get(handlers::get_config).put(operator::update_config),
        )
        // Operator API
        .route("/api/operator/prepare", post(operator::prepare))
        .route("/api/operator/run", post(operator::run))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
