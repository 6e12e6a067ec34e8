//! Frames exchanged with the worker fleet over the duplex feed.
//!
//! Inbound frames are `{"type": <kind>, "data": {...}}` objects emitted by
//! the worker processes. Outbound frames are `{"command": <name>,
//! "payload": {...}}` objects consumed by the fleet's command channel.
//!
//! Inbound bodies are decoded per kind by the dispatcher in
//! `evofleet-core`, so unknown kinds can be reported by name instead of
//! failing as an opaque parse error.

use serde::{Deserialize, Serialize};

use crate::enums::{CommandKind, DeviceType, RepopulationKind, WorkerState};
use crate::ids::WorkerId;
use crate::structs::GenerationResult;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Inbound kind tag for a worker that joined the fleet.
pub const KIND_WORKER_CONNECTED: &str = "workerConnected";
/// Inbound kind tag for a worker that left the fleet.
pub const KIND_WORKER_LOST: &str = "workerLost";
/// Inbound kind tag for a worker lifecycle change.
pub const KIND_STATE_CHANGED: &str = "stateChanged";
/// Inbound kind tag for a per-generation fitness report.
pub const KIND_GENERATION_RESULT: &str = "generationResult";

/// Envelope of every inbound frame before the body is interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    /// Event kind tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific body.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Body of a `workerConnected` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConnectedData {
    /// Worker identity.
    pub worker: WorkerId,
    /// Device name.
    pub name: String,
    /// Address the worker connected from.
    pub ip: String,
    /// `OpenCL` platform name.
    pub platform: String,
    /// Device class.
    #[serde(rename = "type")]
    pub device_type: DeviceType,
}

/// Body of a `workerLost` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLostData {
    /// Worker identity.
    pub worker: WorkerId,
}

/// Body of a `stateChanged` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangedData {
    /// Worker identity.
    pub worker: WorkerId,
    /// New lifecycle state.
    pub state: WorkerState,
}

/// Body of a `generationResult` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResultData {
    /// Worker identity.
    pub worker: WorkerId,
    /// Fitness summary.
    pub result: GenerationResult,
    /// Event time in epoch milliseconds, when the producer stamps it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A command addressed to the whole fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "lowercase")]
pub enum CommandFrame {
    /// Configure and build populations.
    Prepare(PreparePayload),
    /// Start or resume evolving with the given probabilities.
    Run(RunPayload),
    /// Pause after the current generation.
    Pause,
    /// End the run.
    Stop,
}

impl CommandFrame {
    /// Which command this frame carries.
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Prepare(_) => CommandKind::Prepare,
            Self::Run(_) => CommandKind::Run,
            Self::Pause => CommandKind::Pause,
            Self::Stop => CommandKind::Stop,
        }
    }
}

/// Termination criterion in wire units (seconds for time-based runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TerminationWire {
    /// Stop after `count` generations.
    Count {
        /// Generation count.
        count: u64,
    },
    /// Stop after `time` seconds.
    Time {
        /// Duration in seconds.
        time: u64,
    },
}

/// Repopulation section of a `prepare` payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepopulatingWire {
    /// Which fitness gap triggers repopulation.
    #[serde(rename = "type")]
    pub kind: RepopulationKind,
    /// Gap threshold.
    pub diff: f64,
}

/// Payload of a `prepare` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparePayload {
    /// Termination criterion.
    pub termination: TerminationWire,
    /// Population size per worker.
    pub population: u32,
    /// Mutation probability (0.0-1.0).
    pub prob_mutation: f64,
    /// Crossover probability (0.0-1.0).
    pub prob_crossover: f64,
    /// Repopulation trigger, omitted when disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repopulating: Option<RepopulatingWire>,
    /// Elitism sharing interval in generations, omitted when disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharing_best_after: Option<u32>,
}

/// Payload of a `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunPayload {
    /// Mutation probability (0.0-1.0).
    pub prob_mutation: f64,
    /// Crossover probability (0.0-1.0).
    pub prob_crossover: f64,
}
