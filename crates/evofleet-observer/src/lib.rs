//! Dashboard API server and worker feed endpoint for evofleet.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Feed endpoint** (`/ws/feed`) where the fleet's producer pushes
//!   worker events and receives operator commands
//! - **Dashboard stream** (`/ws/dashboard`) pushing a
//!   [`FleetUpdate`](evofleet_types::FleetUpdate) after each mutation
//! - **REST endpoints** reading the latest fleet snapshot
//! - **Operator endpoints** issuing commands and editing the run
//!   configuration
//!
//! # Architecture
//!
//! Reads are served from an immutable snapshot that the fleet actor
//! replaces after every mutation, so no request ever waits on the actor.
//! Writes (feed frames, commands, configuration edits) go through the
//! actor's [`FleetHandle`](evofleet_core::runner::FleetHandle) and are
//! applied one at a time.

pub mod error;
pub mod feed;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
