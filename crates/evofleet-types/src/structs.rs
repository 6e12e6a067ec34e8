//! Entity and snapshot structs read by the dashboard.
//!
//! Everything here is plain data. Mutation rules live in `evofleet-core`;
//! the presentation layer only ever sees copies of these values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DeviceType, RepopulationKind, WorkerState};
use crate::ids::{RunId, WorkerId};

// ---------------------------------------------------------------------------
// Generation results
// ---------------------------------------------------------------------------

/// Fitness summary of one generation on one worker. Fitness is minimized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GenerationResult {
    /// Best (lowest) fitness in the generation.
    pub best_fitness: f64,
    /// Mean fitness of the generation.
    pub avg_fitness: f64,
    /// Worst (highest) fitness in the generation.
    pub worst_fitness: f64,
    /// Problem-specific encoding of the best chromosome, passed through
    /// untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub best_result: Option<serde_json::Value>,
}

impl GenerationResult {
    /// Build a result without a best-chromosome payload.
    pub const fn new(best_fitness: f64, avg_fitness: f64, worst_fitness: f64) -> Self {
        Self {
            best_fitness,
            avg_fitness,
            worst_fitness,
            best_result: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

/// A registered worker and everything it has reported during this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Worker {
    /// Producer-assigned identity.
    pub id: WorkerId,
    /// Address the worker connected from.
    pub ip: String,
    /// Human-readable device name (e.g. `GeForce GTX 1080`).
    pub device_name: String,
    /// `OpenCL` platform name.
    pub platform: String,
    /// Device class.
    pub device_type: DeviceType,
    /// Last reported lifecycle state.
    pub state: WorkerState,
    /// Every accepted generation result, in arrival order.
    pub statistics: Vec<GenerationResult>,
    /// Running minimum of `best_fitness`, `None` until the first result.
    pub best: Option<f64>,
}

impl Worker {
    /// Identity, state and latest figures without the result history.
    pub fn summary(&self) -> WorkerSummary {
        WorkerSummary {
            id: self.id.clone(),
            ip: self.ip.clone(),
            device_name: self.device_name.clone(),
            platform: self.platform.clone(),
            device_type: self.device_type,
            state: self.state,
            result_count: u64::try_from(self.statistics.len()).unwrap_or(u64::MAX),
            best: self.best,
            last_result: self.statistics.last().cloned(),
        }
    }
}

/// A worker as it appears in fleet snapshots.
///
/// Snapshots are republished after every event, so they carry only the
/// fixed-size part of each worker. The full history is served per worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorkerSummary {
    /// Producer-assigned identity.
    pub id: WorkerId,
    /// Address the worker connected from.
    pub ip: String,
    /// Human-readable device name.
    pub device_name: String,
    /// `OpenCL` platform name.
    pub platform: String,
    /// Device class.
    pub device_type: DeviceType,
    /// Last reported lifecycle state.
    pub state: WorkerState,
    /// Number of accepted generation results.
    pub result_count: u64,
    /// Running minimum of `best_fitness`.
    pub best: Option<f64>,
    /// Most recent generation result.
    #[ts(optional)]
    pub last_result: Option<GenerationResult>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Running means of every result whose event time falls into one
/// fixed-width window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AggregationBucket {
    /// Window start in epoch milliseconds (a multiple of the bucket width).
    pub key: i64,
    /// Number of results folded in.
    pub count: u64,
    /// Mean of `best_fitness`.
    pub avg_best: f64,
    /// Mean of `avg_fitness`.
    pub avg_avg: f64,
    /// Mean of `worst_fitness`.
    pub avg_worst: f64,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Which operator commands are currently allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CommandLegality {
    /// `prepare` is allowed.
    pub prepare: bool,
    /// `run` is allowed.
    pub run: bool,
    /// `pause` is allowed.
    pub pause: bool,
    /// `stop` is allowed.
    pub stop: bool,
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// When a run ends. Count- and time-based termination are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Termination {
    /// Stop after a fixed number of generations.
    Count {
        /// Generation count.
        count: u64,
    },
    /// Stop after a wall-clock duration, entered in minutes.
    Time {
        /// Duration in minutes.
        minutes: u64,
    },
}

/// Repopulation policy as the operator sets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Repopulation {
    /// Never repopulate.
    #[default]
    Disabled,
    /// Repopulate when best and worst fitness are closer than `diff`.
    BestWorst {
        /// Fitness gap threshold.
        diff: f64,
    },
    /// Repopulate when best and average fitness are closer than `diff`.
    BestAvg {
        /// Fitness gap threshold.
        diff: f64,
    },
}

impl Repopulation {
    /// The trigger kind and threshold, or `None` when disabled.
    pub const fn trigger(self) -> Option<(RepopulationKind, f64)> {
        match self {
            Self::Disabled => None,
            Self::BestWorst { diff } => Some((RepopulationKind::BestWorst, diff)),
            Self::BestAvg { diff } => Some((RepopulationKind::BestAvg, diff)),
        }
    }
}

/// Operator-set parameters for the next run.
///
/// Ratios are percentages as entered in the dashboard; they are converted
/// to probabilities only when a command is packaged for the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export, export_to = "bindings/")]
pub struct RunConfig {
    /// Termination criterion.
    pub termination: Termination,
    /// Population size per worker.
    pub population: u32,
    /// Mutation ratio in percent (0-100).
    pub mutation_ratio: f64,
    /// Crossover ratio in percent (0-100).
    pub crossover_ratio: f64,
    /// Repopulation policy.
    pub repopulation: Repopulation,
    /// Share elites across the fleet every N generations; `None` disables
    /// sharing.
    #[ts(optional)]
    pub share_best_after: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            termination: Termination::Count { count: 1000 },
            population: 100,
            mutation_ratio: 10.0,
            crossover_ratio: 80.0,
            repopulation: Repopulation::Disabled,
            share_best_after: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Number of workers currently reporting one lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateCount {
    /// The lifecycle state.
    pub state: WorkerState,
    /// Workers in that state.
    pub count: u32,
}

/// Immutable copy of everything the dashboard reads, taken after a
/// completed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FleetSnapshot {
    /// Monotonic count of applied mutations.
    pub sequence: u64,
    /// Fleet-wide derived state.
    pub global_state: WorkerState,
    /// Commands allowed in `global_state`.
    pub legality: CommandLegality,
    /// Registered workers keyed by id, without result histories.
    pub workers: BTreeMap<WorkerId, WorkerSummary>,
    /// Worker count per lifecycle state (states with no workers omitted).
    pub state_counts: Vec<StateCount>,
    /// Aggregated buckets in ascending key order.
    pub buckets: Vec<AggregationBucket>,
    /// Total generation results accepted so far.
    pub total_results: u64,
    /// The run started by the last accepted `prepare`, if any.
    #[ts(optional)]
    pub run_id: Option<RunId>,
    /// Current run configuration.
    pub run_config: RunConfig,
    /// When this snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

/// Compact notification pushed to dashboard subscribers after each
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FleetUpdate {
    /// Sequence number of the snapshot this update describes.
    pub sequence: u64,
    /// Fleet-wide derived state.
    pub global_state: WorkerState,
    /// Whether `global_state` changed with this mutation.
    pub state_changed: bool,
    /// Commands allowed in `global_state`.
    pub legality: CommandLegality,
    /// Number of registered workers.
    pub worker_count: u32,
    /// Total generation results accepted so far.
    pub total_results: u64,
    /// Bucket touched by this mutation, if it was a generation result.
    #[ts(optional)]
    pub touched_bucket: Option<AggregationBucket>,
}
