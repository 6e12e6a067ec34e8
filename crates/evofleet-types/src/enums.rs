//! Enumeration types shared between the fleet core, the observer API and
//! the dashboard.
//!
//! Wire representations are lowercase (or `snake_case`) strings, matching
//! what the worker processes emit.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Worker lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a single worker, also used as the fleet-wide
/// global state.
///
/// No ordering between states is implied. Fleet-level transitions are
/// decided exclusively by the reconciliation table in `evofleet-core`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum WorkerState {
    /// Connected and idle, no run configured yet.
    #[default]
    Waiting,
    /// Building the population for a new run.
    Preparing,
    /// Restoring a previously saved run.
    Restoring,
    /// Population ready, waiting for `run`.
    Prepared,
    /// Evolving generations.
    Running,
    /// Finishing the current generation before pausing.
    Pausing,
    /// Paused between generations.
    Paused,
    /// Writing a checkpoint while paused.
    Saving,
    /// Winding down after a `stop`.
    Stopping,
    /// Run finished. Terminal.
    Stopped,
}

impl WorkerState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Waiting,
        Self::Preparing,
        Self::Restoring,
        Self::Prepared,
        Self::Running,
        Self::Pausing,
        Self::Paused,
        Self::Saving,
        Self::Stopping,
        Self::Stopped,
    ];

    /// The lowercase wire name of this state.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Preparing => "preparing",
            Self::Restoring => "restoring",
            Self::Prepared => "prepared",
            Self::Running => "running",
            Self::Pausing => "pausing",
            Self::Paused => "paused",
            Self::Saving => "saving",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl core::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Compute device class a worker runs on.
///
/// Workers report the `OpenCL` device type name, which may arrive upper-
/// or lowercase. Names with no dedicated variant (`DEFAULT`, `CUSTOM`)
/// map to [`DeviceType::Other`] so the worker still registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum DeviceType {
    /// General-purpose processor.
    #[default]
    #[serde(alias = "CPU")]
    Cpu,
    /// Graphics processor.
    #[serde(alias = "GPU")]
    Gpu,
    /// Digital signal processor or other accelerator.
    #[serde(alias = "DSP", alias = "ACCELERATOR", alias = "accelerator")]
    Dsp,
    /// Any device type not listed above.
    #[serde(other)]
    Other,
}

// ---------------------------------------------------------------------------
// Operator commands
// ---------------------------------------------------------------------------

/// The four operator commands the dashboard can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum CommandKind {
    /// Configure the fleet and build initial populations.
    Prepare,
    /// Start (or resume) evolving.
    Run,
    /// Pause after the current generation.
    Pause,
    /// End the run.
    Stop,
}

impl CommandKind {
    /// The lowercase wire name of this command.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Run => "run",
            Self::Pause => "pause",
            Self::Stop => "stop",
        }
    }
}

impl core::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Repopulation
// ---------------------------------------------------------------------------

/// Which fitness gap triggers a repopulation on the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RepopulationKind {
    /// Gap between best and worst fitness of a generation.
    BestWorst,
    /// Gap between best and average fitness of a generation.
    BestAvg,
}
