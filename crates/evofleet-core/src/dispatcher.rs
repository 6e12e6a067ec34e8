//! Decoding of inbound feed frames into typed fleet events.
//!
//! Every frame the producer pushes is turned into exactly one
//! [`FleetEvent`] by [`decode`], and the fleet applies it through a single
//! match. Frames with an unknown kind or a body that does not fit the kind
//! come back as a [`DecodeError`]; callers log them and move on.

use chrono::{DateTime, Utc};
use evofleet_types::wire::{
    KIND_GENERATION_RESULT, KIND_STATE_CHANGED, KIND_WORKER_CONNECTED, KIND_WORKER_LOST,
};
use evofleet_types::{
    GenerationResult, GenerationResultData, RawFrame, StateChangedData, WorkerConnectedData,
    WorkerId, WorkerLostData, WorkerState,
};
use serde::de::DeserializeOwned;

use crate::registry::WorkerIdentity;

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetEvent {
    /// A worker joined the fleet.
    WorkerConnected(WorkerIdentity),
    /// A worker left the fleet.
    WorkerLost {
        /// The departing worker.
        id: WorkerId,
    },
    /// A worker reported a new lifecycle state.
    StateChanged {
        /// The reporting worker.
        id: WorkerId,
        /// Its new state.
        state: WorkerState,
    },
    /// A worker finished a generation.
    GenerationResult {
        /// The reporting worker.
        id: WorkerId,
        /// Fitness summary.
        result: GenerationResult,
        /// When the generation finished, or when the frame arrived if the
        /// producer did not stamp it.
        event_time: DateTime<Utc>,
    },
}

impl FleetEvent {
    /// The worker the event concerns.
    pub const fn worker(&self) -> &WorkerId {
        match self {
            Self::WorkerConnected(identity) => &identity.id,
            Self::WorkerLost { id }
            | Self::StateChanged { id, .. }
            | Self::GenerationResult { id, .. } => id,
        }
    }

    /// Wire tag of the event kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WorkerConnected(_) => KIND_WORKER_CONNECTED,
            Self::WorkerLost { .. } => KIND_WORKER_LOST,
            Self::StateChanged { .. } => KIND_STATE_CHANGED,
            Self::GenerationResult { .. } => KIND_GENERATION_RESULT,
        }
    }
}

/// Reasons an inbound frame could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not a JSON object with a `type` field.
    #[error("frame is not a valid event envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` field names no known event.
    #[error("unknown event kind '{0}'")]
    UnknownKind(String),

    /// The body does not match the shape of its kind.
    #[error("malformed '{kind}' body: {source}")]
    Body {
        /// Kind tag of the frame.
        kind: &'static str,
        /// The underlying parse error.
        source: serde_json::Error,
    },
}

/// Decode one text frame received at `received_at`.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the envelope, kind or body is invalid.
pub fn decode(text: &str, received_at: DateTime<Utc>) -> Result<FleetEvent, DecodeError> {
    let frame: RawFrame = serde_json::from_str(text)?;
    match frame.kind.as_str() {
        KIND_WORKER_CONNECTED => {
            let data: WorkerConnectedData = body(KIND_WORKER_CONNECTED, frame.data)?;
            Ok(FleetEvent::WorkerConnected(WorkerIdentity {
                id: data.worker,
                ip: data.ip,
                device_name: data.name,
                platform: data.platform,
                device_type: data.device_type,
            }))
        }
        KIND_WORKER_LOST => {
            let data: WorkerLostData = body(KIND_WORKER_LOST, frame.data)?;
            Ok(FleetEvent::WorkerLost { id: data.worker })
        }
        KIND_STATE_CHANGED => {
            let data: StateChangedData = body(KIND_STATE_CHANGED, frame.data)?;
            Ok(FleetEvent::StateChanged {
                id: data.worker,
                state: data.state,
            })
        }
        KIND_GENERATION_RESULT => {
            let data: GenerationResultData = body(KIND_GENERATION_RESULT, frame.data)?;
            let event_time = data
                .time
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or(received_at);
            Ok(FleetEvent::GenerationResult {
                id: data.worker,
                result: data.result,
                event_time,
            })
        }
        _ => Err(DecodeError::UnknownKind(frame.kind)),
    }
}

fn body<T: DeserializeOwned>(
    kind: &'static str,
    data: serde_json::Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::Body { kind, source })
}
