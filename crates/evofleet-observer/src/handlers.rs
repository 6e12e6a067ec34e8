//! Read-only REST handlers for the dashboard.
//!
//! Handlers serve from the latest published [`FleetSnapshot`], so a request
//! does not wait on the fleet actor. The one exception is a single worker's
//! record: snapshots carry only worker summaries, so the full result
//! history is fetched from the actor on demand.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/fleet` | Full snapshot |
//! | `GET` | `/api/state` | Global state and command legality |
//! | `GET` | `/api/workers` | List all workers (summaries) |
//! | `GET` | `/api/workers/{id}` | Single worker with its result history |
//! | `GET` | `/api/buckets` | Aggregated buckets, oldest first |
//! | `GET` | `/api/config` | Current run configuration |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use evofleet_types::{CommandLegality, FleetSnapshot, RunId, StateCount, WorkerId, WorkerState};

use crate::error::ObserverError;
use crate::state::AppState;

/// Response body for `GET /api/state`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct StateResponse {
    /// Fleet-wide derived state.
    pub global_state: WorkerState,
    /// Commands allowed right now.
    pub legality: CommandLegality,
    /// Number of registered workers.
    pub worker_count: usize,
    /// Workers per lifecycle state.
    pub state_counts: Vec<StateCount>,
    /// Current run, if one was prepared.
    pub run_id: Option<RunId>,
    /// Snapshot sequence number.
    pub sequence: u64,
}

/// Return the full fleet snapshot.
pub async fn get_fleet(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(FleetSnapshot::clone(&state.snapshot()))
}

/// Return the global state and legal commands.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot();
    Json(StateResponse {
        global_state: snapshot.global_state,
        legality: snapshot.legality,
        worker_count: snapshot.workers.len(),
        state_counts: snapshot.state_counts.clone(),
        run_id: snapshot.run_id,
        sequence: snapshot.sequence,
    })
}

/// List every registered worker in id order.
pub async fn list_workers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot();
    let workers: Vec<_> = snapshot.workers.values().cloned().collect();
    Json(workers)
}

/// Return one worker, including every generation result it reported.
pub async fn get_worker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let worker = state
        .fleet()
        .worker(WorkerId::new(id.clone()))
        .await?
        .ok_or_else(|| ObserverError::NotFound(format!("worker {id} not found")))?;
    Ok(Json(worker))
}

/// List aggregated buckets in ascending key order.
pub async fn list_buckets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot().buckets.clone())
}

/// Return the current run configuration.
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.snapshot().run_config.clone())
}
