//! Shared application state for the dashboard server.
//!
//! [`AppState`] is the read surface the HTTP handlers serve from and the
//! fan-out point for live traffic:
//!
//! - the latest [`FleetSnapshot`], replaced wholesale after every fleet
//!   mutation so readers never observe a partially applied event;
//! - a broadcast of [`FleetUpdate`]s for `/ws/dashboard` clients;
//! - a broadcast of [`CommandFrame`]s for connected `/ws/feed` producers;
//! - the [`FleetHandle`] through which feed frames and operator requests
//!   reach the fleet actor.

use std::sync::Arc;

use evofleet_core::runner::FleetHandle;
use evofleet_types::{CommandFrame, FleetSnapshot, FleetUpdate};
use tokio::sync::{broadcast, watch};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState {
    snapshot: watch::Sender<Arc<FleetSnapshot>>,
    updates: broadcast::Sender<FleetUpdate>,
    commands: broadcast::Sender<CommandFrame>,
    fleet: FleetHandle,
}

impl AppState {
    /// Create the state around a fleet handle and its first snapshot.
    ///
    /// `broadcast_capacity` bounds how far a slow subscriber may fall
    /// behind before it starts skipping messages.
    pub fn new(fleet: FleetHandle, initial: FleetSnapshot, broadcast_capacity: usize) -> Self {
        let capacity = broadcast_capacity.max(1);
        let (updates, _) = broadcast::channel(capacity);
        let (commands, _) = broadcast::channel(capacity);
        Self {
            snapshot: watch::Sender::new(Arc::new(initial)),
            updates,
            commands,
            fleet,
        }
    }

    /// Handle to the fleet actor.
    pub const fn fleet(&self) -> &FleetHandle {
        &self.fleet
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Replace the published snapshot.
    pub fn publish_snapshot(&self, snapshot: FleetSnapshot) {
        self.snapshot.send_replace(Arc::new(snapshot));
    }

    /// Subscribe to dashboard updates.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<FleetUpdate> {
        self.updates.subscribe()
    }

    /// Subscribe to outbound fleet commands.
    pub fn subscribe_commands(&self) -> broadcast::Receiver<CommandFrame> {
        self.commands.subscribe()
    }

    /// Push an update to every dashboard client.
    ///
    /// Returns the number of receivers; 0 when nobody is watching.
    pub fn broadcast_update(&self, update: &FleetUpdate) -> usize {
        self.updates.send(update.clone()).unwrap_or(0)
    }

    /// Push a command to every connected producer without waiting for it
    /// to be delivered.
    ///
    /// Returns the number of receivers; 0 when no producer is connected.
    pub fn broadcast_command(&self, frame: &CommandFrame) -> usize {
        self.commands.send(frame.clone()).unwrap_or(0)
    }
}
