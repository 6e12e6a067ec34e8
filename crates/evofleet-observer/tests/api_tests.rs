//! Integration tests for the dashboard API endpoints.
//!
//! Tests drive Axum's `Router` directly via `tower::ServiceExt` against a
//! live fleet actor, without starting a TCP server. Feed frames are pushed
//! through the actor's handle exactly as the `/ws/feed` socket would.

#![allow(clippy::unwrap_used)]

use std::num::NonZeroU64;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use evofleet_core::fleet::Fleet;
use evofleet_core::runner::{self, FleetCallback};
use evofleet_observer::router::build_router;
use evofleet_observer::state::AppState;
use evofleet_types::{CommandFrame, CommandKind, FleetUpdate, RunConfig};
use serde_json::Value;
use tower::ServiceExt;

/// Mirrors the server's callback: publish the snapshot, fan out updates
/// and commands.
struct Publisher(Arc<AppState>);

impl FleetCallback for Publisher {
    fn on_update(&mut self, update: &FleetUpdate, fleet: &Fleet) {
        self.0.publish_snapshot(fleet.snapshot());
        self.0.broadcast_update(update);
    }

    fn on_command(&mut self, frame: &CommandFrame) {
        self.0.broadcast_command(frame);
    }
}

fn spawn_app() -> Arc<AppState> {
    let fleet = Fleet::new(NonZeroU64::new(5_000).unwrap(), RunConfig::default());
    let (handle, rx) = runner::channel(64);
    let state = Arc::new(AppState::new(handle, fleet.snapshot(), 64));
    let mut publisher = Publisher(Arc::clone(&state));
    tokio::spawn(async move { runner::run_fleet(fleet, rx, &mut publisher).await });
    state
}

async fn feed(state: &AppState, frames: &[String]) {
    for frame in frames {
        state.fleet().submit_frame(frame.clone()).await.unwrap();
    }
    // The actor applies inputs in order, so this snapshot follows every
    // frame above, and so does the published one.
    let synced = state.fleet().snapshot().await.unwrap();
    assert_eq!(state.snapshot().sequence, synced.sequence);
}

fn connected(id: &str) -> String {
    format!(
        r#"{{"type":"workerConnected","data":{{"worker":"{id}","name":"GTX 1080","ip":"10.0.0.2","platform":"NVIDIA CUDA","type":"GPU"}}}}"#
    )
}

fn lost(id: &str) -> String {
    format!(r#"{{"type":"workerLost","data":{{"worker":"{id}"}}}}"#)
}

fn state_changed(id: &str, state: &str) -> String {
    format!(r#"{{"type":"stateChanged","data":{{"worker":"{id}","state":"{state}"}}}}"#)
}

fn result(id: &str, time_ms: i64, best: f64) -> String {
    format!(
        r#"{{"type":"generationResult","data":{{"worker":"{id}","time":{time_ms},"result":{{"best_fitness":{best},"avg_fitness":{best},"worst_fitness":{best}}}}}}}"#
    )
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: &Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn send_json(
    state: &Arc<AppState>,
    method: &str,
    path: &str,
    body: &Value,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = build_router(Arc::clone(state)).oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

async fn post(state: &Arc<AppState>, path: &str) -> (StatusCode, Value) {
    let response = build_router(Arc::clone(state))
        .oneshot(Request::post(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

#[tokio::test]
async fn test_initial_state_is_waiting() {
    let state = spawn_app();
    let (status, json) = get(&state, "/api/state").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["global_state"], "waiting");
    assert_eq!(json["legality"]["prepare"], true);
    assert_eq!(json["legality"]["run"], false);
    assert_eq!(json["worker_count"], 0);
}

#[tokio::test]
async fn test_workers_listed_after_connect() {
    let state = spawn_app();
    feed(&state, &[connected("b"), connected("a")]).await;

    let (status, json) = get(&state, "/api/workers").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);

    let (status, json) = get(&state, "/api/workers/a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["device_name"], "GTX 1080");
    assert_eq!(json["device_type"], "gpu");
    assert_eq!(json["state"], "waiting");
}

#[tokio::test]
async fn test_unknown_worker_is_404() {
    let state = spawn_app();
    let (status, json) = get(&state, "/api/workers/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_lost_worker_disappears() {
    let state = spawn_app();
    feed(&state, &[connected("a"), lost("a")]).await;
    let (_, json) = get(&state, "/api/workers").await;
    assert_eq!(json.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_global_state_follows_workers() {
    let state = spawn_app();
    feed(
        &state,
        &[
            connected("a"),
            connected("b"),
            state_changed("a", "preparing"),
        ],
    )
    .await;
    let (_, json) = get(&state, "/api/state").await;
    assert_eq!(json["global_state"], "preparing");
    assert_eq!(json["legality"]["prepare"], false);

    feed(
        &state,
        &[
            state_changed("b", "preparing"),
            state_changed("a", "prepared"),
            state_changed("b", "prepared"),
        ],
    )
    .await;
    let (_, json) = get(&state, "/api/state").await;
    assert_eq!(json["global_state"], "prepared");
    assert_eq!(json["legality"]["run"], true);
}

#[tokio::test]
async fn test_buckets_aggregate_results() {
    let state = spawn_app();
    feed(
        &state,
        &[
            connected("a"),
            result("a", 0, 10.0),
            result("a", 2_000, 20.0),
            result("a", 4_000, 30.0),
            result("a", 6_000, 40.0),
            result("ghost", 1_000, 1.0),
        ],
    )
    .await;

    let (status, json) = get(&state, "/api/buckets").await;
    assert_eq!(status, StatusCode::OK);
    let buckets = json.as_array().unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets.first().unwrap()["key"], 0);
    assert_eq!(buckets.first().unwrap()["count"], 3);
    assert_eq!(buckets.first().unwrap()["avg_best"], 20.0);
    assert_eq!(buckets.last().unwrap()["key"], 5_000);

    let (_, fleet) = get(&state, "/api/fleet").await;
    assert_eq!(fleet["total_results"], 4);
    assert_eq!(fleet["workers"]["a"]["best"], 10.0);
    assert_eq!(fleet["workers"]["a"]["result_count"], 4);
    assert!(fleet["workers"]["a"].get("statistics").is_none());
}

#[tokio::test]
async fn test_worker_detail_carries_history() {
    let state = spawn_app();
    feed(
        &state,
        &[connected("a"), result("a", 0, 3.0), result("a", 1_000, 2.0)],
    )
    .await;

    let (status, json) = get(&state, "/api/workers/a").await;
    assert_eq!(status, StatusCode::OK);
    let history = json["statistics"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.last().unwrap()["best_fitness"], 2.0);
    assert_eq!(json["best"], 2.0);

    let (_, json) = get(&state, "/api/workers").await;
    let listed = json.as_array().unwrap().first().unwrap();
    assert_eq!(listed["result_count"], 2);
    assert_eq!(listed["last_result"]["best_fitness"], 2.0);
}

#[tokio::test]
async fn test_prepare_is_sent_to_the_feed() {
    let state = spawn_app();
    let mut commands = state.subscribe_commands();

    let (status, json) = post(&state, "/api/operator/prepare").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["frame"]["command"], "prepare");
    assert_eq!(json["frame"]["payload"]["termination"]["type"], "count");
    assert_eq!(json["frame"]["payload"]["termination"]["count"], 1000);
    assert_eq!(json["frame"]["payload"]["population"], 100);

    let frame = commands.recv().await.unwrap();
    assert_eq!(frame.kind(), CommandKind::Prepare);

    let (_, json) = get(&state, "/api/state").await;
    assert!(json["run_id"].is_string());
}

#[tokio::test]
async fn test_illegal_command_is_409() {
    let state = spawn_app();
    let mut commands = state.subscribe_commands();

    let (status, json) = post(&state, "/api/operator/run").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["status"], 409);
    assert!(json["error"].as_str().unwrap().contains("run"));
    assert!(commands.try_recv().is_err());
}

#[tokio::test]
async fn test_paused_fleet_rejects_pause() {
    let state = spawn_app();
    feed(
        &state,
        &[
            connected("a"),
            state_changed("a", "prepared"),
            state_changed("a", "running"),
            state_changed("a", "paused"),
        ],
    )
    .await;
    let (_, json) = get(&state, "/api/state").await;
    assert_eq!(json["global_state"], "paused");

    let (status, _) = post(&state, "/api/operator/pause").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = post(&state, "/api/operator/run").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["frame"]["command"], "run");
    assert_eq!(json["frame"]["payload"]["prob_crossover"], 0.8);
}

#[tokio::test]
async fn test_config_update_and_lock() {
    let state = spawn_app();

    let (status, json) = send_json(
        &state,
        "PUT",
        "/api/config",
        &serde_json::json!({ "population": 250, "termination": { "type": "time", "minutes": 2 } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["population"], 250);

    let (_, json) = get(&state, "/api/config").await;
    assert_eq!(json["termination"]["minutes"], 2);

    let (status, json) = post(&state, "/api/operator/prepare").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["frame"]["payload"]["termination"]["time"], 120);

    feed(&state, &[connected("a"), state_changed("a", "preparing")]).await;
    let (status, _) = send_json(
        &state,
        "PUT",
        "/api/config",
        &serde_json::json!({ "population": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_config_is_422() {
    let state = spawn_app();
    let (status, json) = send_json(
        &state,
        "PUT",
        "/api/config",
        &serde_json::json!({ "mutation_ratio": 150.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], 422);

    let (_, json) = get(&state, "/api/config").await;
    assert_eq!(json["mutation_ratio"], 10.0);
}

#[tokio::test]
async fn test_dashboard_updates_are_broadcast() {
    let state = spawn_app();
    let mut updates = state.subscribe_updates();
    feed(&state, &[connected("a"), state_changed("a", "preparing")]).await;

    let first = updates.recv().await.unwrap();
    assert_eq!(first.worker_count, 1);
    assert!(!first.state_changed);
    let second = updates.recv().await.unwrap();
    assert!(second.state_changed);
    assert!(second.sequence > first.sequence);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let state = spawn_app();
    let response = build_router(state)
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
