//! The fleet aggregate: registry, aggregator and global state in one owner.
//!
//! [`Fleet`] is the only place where dashboard state changes. Each inbound
//! event is applied to completion by [`Fleet::apply`]: the registry and the
//! aggregator are updated, then the global state is reconciled against the
//! workers' reported states. Operator commands go through
//! [`Fleet::issue`], which consults the legality table for the current
//! global state. Readers only ever see copies taken by
//! [`Fleet::snapshot`].

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use chrono::Utc;
use evofleet_types::{
    AggregationBucket, CommandFrame, CommandKind, CommandLegality, FleetSnapshot, FleetUpdate,
    RunConfig, RunId, StateCount, Worker, WorkerId, WorkerState,
};
use tracing::{debug, info, warn};

use crate::aggregator::StreamingAggregator;
use crate::dispatcher::FleetEvent;
use crate::gate::{self, GateError};
use crate::reconcile;
use crate::registry::{RegistryOutcome, WorkerRegistry};
use crate::run_config::{self, RunConfigError, RunConfigPatch};

/// Errors from operator requests against the fleet.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FleetError {
    /// The command gate rejected the command.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The run configuration can only be edited before a run is prepared.
    #[error("run configuration is locked while the fleet is {0}")]
    ConfigLocked(WorkerState),

    /// The patch would leave the configuration invalid.
    #[error(transparent)]
    InvalidConfig(#[from] RunConfigError),
}

/// What applying one event did.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Outcome of the registry call.
    pub outcome: RegistryOutcome,
    /// Global state before the event.
    pub previous: WorkerState,
    /// Global state after reconciliation.
    pub current: WorkerState,
    /// The bucket the event was folded into, for accepted results.
    pub touched_bucket: Option<AggregationBucket>,
}

impl Applied {
    /// Whether the global state moved.
    pub fn state_changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Owned state of the whole fleet.
#[derive(Debug, Clone)]
pub struct Fleet {
    registry: WorkerRegistry,
    aggregator: StreamingAggregator,
    global_state: WorkerState,
    run_config: RunConfig,
    run_id: Option<RunId>,
    total_results: u64,
    sequence: u64,
}

impl Fleet {
    /// Create an empty fleet in [`WorkerState::Waiting`].
    pub fn new(bucket_width_ms: NonZeroU64, run_config: RunConfig) -> Self {
        Self {
            registry: WorkerRegistry::new(),
            aggregator: StreamingAggregator::new(bucket_width_ms),
            global_state: WorkerState::Waiting,
            run_config,
            run_id: None,
            total_results: 0,
            sequence: 0,
        }
    }

    /// Apply one inbound event and reconcile the global state.
    pub fn apply(&mut self, event: FleetEvent) -> Applied {
        let previous = self.global_state;
        let mut touched_bucket = None;

        let outcome = match event {
            FleetEvent::WorkerConnected(identity) => self.registry.on_connected(identity),
            FleetEvent::WorkerLost { id } => self.registry.on_lost(&id),
            FleetEvent::StateChanged { id, state } => {
                debug!(worker = %id, %state, "Worker state changed");
                self.registry.on_state_changed(&id, state)
            }
            FleetEvent::GenerationResult {
                id,
                result,
                event_time,
            } => {
                let outcome = self.registry.on_result(&id, result);
                // Only results the registry accepted feed the fleet averages.
                let accepted = self
                    .registry
                    .get(&id)
                    .and_then(|worker| worker.statistics.last())
                    .filter(|_| outcome == RegistryOutcome::Updated);
                if let Some(result) = accepted {
                    touched_bucket = Some(self.aggregator.on_result(event_time, result).clone());
                    self.total_results = self.total_results.saturating_add(1);
                }
                outcome
            }
        };

        self.global_state = reconcile::next(previous, &self.registry.states());
        if self.global_state != previous {
            info!(
                from = %previous,
                to = %self.global_state,
                workers = self.registry.len(),
                "Fleet state changed"
            );
        }
        if outcome.mutated() || self.global_state != previous {
            self.sequence = self.sequence.saturating_add(1);
        }

        Applied {
            outcome,
            previous,
            current: self.global_state,
            touched_bucket,
        }
    }

    /// Package an operator command if the current global state allows it.
    ///
    /// An accepted `prepare` starts a new run identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Gate`] when the command is illegal now.
    pub fn issue(&mut self, command: CommandKind) -> Result<CommandFrame, FleetError> {
        let frame = gate::issue(self.global_state, command, &self.run_config).inspect_err(|e| {
            warn!(%command, state = %self.global_state, error = %e, "Command rejected");
        })?;
        if command == CommandKind::Prepare {
            let run_id = RunId::new();
            info!(%run_id, "Run prepared");
            self.run_id = Some(run_id);
            self.sequence = self.sequence.saturating_add(1);
        }
        info!(%command, state = %self.global_state, "Command issued");
        Ok(frame)
    }

    /// Apply a configuration patch.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::ConfigLocked`] unless the fleet is waiting, or
    /// [`FleetError::InvalidConfig`] when the result would be invalid.
    pub fn update_config(&mut self, patch: &RunConfigPatch) -> Result<&RunConfig, FleetError> {
        if self.global_state != WorkerState::Waiting {
            return Err(FleetError::ConfigLocked(self.global_state));
        }
        let next = run_config::apply_patch(&self.run_config, patch)?;
        if next != self.run_config {
            debug!(config = ?next, "Run configuration updated");
            self.run_config = next;
            self.sequence = self.sequence.saturating_add(1);
        }
        Ok(&self.run_config)
    }

    /// Current fleet-wide state.
    pub const fn global_state(&self) -> WorkerState {
        self.global_state
    }

    /// Commands allowed right now.
    pub const fn legality(&self) -> CommandLegality {
        gate::legality(self.global_state)
    }

    /// Registered workers.
    pub fn workers(&self) -> BTreeMap<WorkerId, Worker> {
        self.registry.snapshot()
    }

    /// Number of registered workers.
    pub fn worker_count(&self) -> usize {
        self.registry.len()
    }

    /// Full record of one worker, including its result history.
    pub fn worker(&self, id: &WorkerId) -> Option<Worker> {
        self.registry.get(id).cloned()
    }

    /// Aggregated buckets in ascending key order.
    pub fn aggregated_buckets(&self) -> Vec<AggregationBucket> {
        self.aggregator.snapshot()
    }

    /// Current run configuration.
    pub const fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    /// Identifier of the last prepared run.
    pub const fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// Number of applied mutations.
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of workers in each state, omitting empty states.
    pub fn state_counts(&self) -> Vec<StateCount> {
        let states = self.registry.states();
        WorkerState::ALL
            .iter()
            .filter_map(|state| {
                let count = states.iter().filter(|s| *s == state).count();
                (count > 0).then(|| StateCount {
                    state: *state,
                    count: u32::try_from(count).unwrap_or(u32::MAX),
                })
            })
            .collect()
    }

    /// Copy of everything the dashboard reads.
    ///
    /// Workers appear as summaries, so the cost does not grow with the
    /// number of results received.
    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            sequence: self.sequence,
            global_state: self.global_state,
            legality: self.legality(),
            workers: self.registry.summaries(),
            state_counts: self.state_counts(),
            buckets: self.aggregated_buckets(),
            total_results: self.total_results,
            run_id: self.run_id,
            run_config: self.run_config.clone(),
            taken_at: Utc::now(),
        }
    }

    /// Compact notification describing the result of `applied`, or of the
    /// latest operator action when `applied` is `None`.
    pub fn update(&self, applied: Option<&Applied>) -> FleetUpdate {
        FleetUpdate {
            sequence: self.sequence,
            global_state: self.global_state,
            state_changed: applied.is_some_and(Applied::state_changed),
            legality: self.legality(),
            worker_count: u32::try_from(self.worker_count()).unwrap_or(u32::MAX),
            total_results: self.total_results,
            touched_bucket: applied.and_then(|a| a.touched_bucket.clone()),
        }
    }
}
