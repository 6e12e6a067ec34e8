//! Fleet callback that feeds the dashboard API.
//!
//! After each fleet mutation this callback replaces the published
//! [`FleetSnapshot`](evofleet_types::FleetSnapshot) and broadcasts the
//! [`FleetUpdate`] to dashboard clients. Accepted commands are broadcast to
//! every connected producer.

use std::sync::Arc;

use evofleet_core::fleet::Fleet;
use evofleet_core::runner::FleetCallback;
use evofleet_observer::state::AppState;
use evofleet_types::{CommandFrame, FleetUpdate};
use tracing::{debug, warn};

/// Callback that bridges the fleet actor to the dashboard API.
pub struct ObserverCallback {
    state: Arc<AppState>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl FleetCallback for ObserverCallback {
    fn on_update(&mut self, update: &FleetUpdate, fleet: &Fleet) {
        self.state.publish_snapshot(fleet.snapshot());
        let receivers = self.state.broadcast_update(update);
        debug!(
            sequence = update.sequence,
            state = %update.global_state,
            receivers,
            "Fleet update broadcast"
        );
    }

    fn on_command(&mut self, frame: &CommandFrame) {
        let receivers = self.state.broadcast_command(frame);
        if receivers == 0 {
            warn!(command = %frame.kind(), "No producer connected, command not delivered");
        } else {
            debug!(command = %frame.kind(), receivers, "Command sent to feed");
        }
    }
}
