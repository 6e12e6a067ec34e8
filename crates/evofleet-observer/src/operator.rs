//! Operator REST handlers: fleet commands and run configuration edits.
//!
//! Commands are checked against the legality table by the fleet actor. An
//! illegal command is answered with `409 Conflict` and nothing is sent to
//! the workers. Accepted commands are fanned out to every connected
//! producer without waiting for delivery.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/prepare` | Build populations from the run configuration |
//! | `POST` | `/api/operator/run` | Start or resume evolving |
//! | `POST` | `/api/operator/pause` | Pause after the current generation |
//! | `POST` | `/api/operator/stop` | End the run |
//! | `PUT` | `/api/config` | Patch the run configuration |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use evofleet_core::run_config::RunConfigPatch;
use evofleet_types::{CommandFrame, CommandKind};
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

/// Response body for an accepted command.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct CommandResponse {
    /// Always `true`; rejections are reported as errors.
    pub ok: bool,
    /// The frame sent to the fleet.
    pub frame: CommandFrame,
}

async fn issue(
    state: &AppState,
    kind: CommandKind,
) -> Result<Json<CommandResponse>, ObserverError> {
    let frame = state.fleet().issue(kind).await?;
    Ok(Json(CommandResponse { ok: true, frame }))
}

/// Send `prepare` with the current run configuration.
pub async fn prepare(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    issue(&state, CommandKind::Prepare).await
}

/// Send `run` with the configured probabilities.
pub async fn run(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    issue(&state, CommandKind::Run).await
}

/// Send `pause`.
pub async fn pause(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    issue(&state, CommandKind::Pause).await
}

/// Send `stop`.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    issue(&state, CommandKind::Stop).await
}

/// Apply a partial update to the run configuration.
///
/// Only allowed while the fleet is waiting; returns the new configuration.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<RunConfigPatch>,
) -> Result<impl IntoResponse, ObserverError> {
    let config = state.fleet().update_config(patch).await?;
    info!(
        population = config.population,
        mutation_ratio = config.mutation_ratio,
        crossover_ratio = config.crossover_ratio,
        "Run configuration changed by operator"
    );
    Ok(Json(config))
}
