//! Live registry of the workers in the fleet.
//!
//! [`WorkerRegistry`] owns one [`Worker`] record per identity and applies
//! the connect, lost, state-changed and result events from the feed.
//! Events may arrive in any interleaving: a `workerLost` can race a
//! connect that has not been applied yet, and results can name a worker
//! that has already gone. None of these are errors; each call reports
//! what happened through [`RegistryOutcome`] and logs a warning where the
//! feed was inconsistent.

use std::collections::BTreeMap;

use evofleet_types::{
    DeviceType, GenerationResult, Worker, WorkerId, WorkerState, WorkerSummary,
};
use tracing::{debug, warn};

/// What a registry call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOutcome {
    /// A new record was created.
    Inserted,
    /// An existing record with the same id was replaced.
    Replaced,
    /// A record was removed.
    Removed,
    /// A `lost` event named a worker that is not registered.
    Absent,
    /// An existing record was updated.
    Updated,
    /// A state or result event named a worker that is not registered.
    UnknownWorker,
}

impl RegistryOutcome {
    /// Whether the registry contents changed.
    pub const fn mutated(self) -> bool {
        matches!(
            self,
            Self::Inserted | Self::Replaced | Self::Removed | Self::Updated
        )
    }
}

/// Identity fields reported when a worker connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    /// Producer-assigned identity.
    pub id: WorkerId,
    /// Address the worker connected from.
    pub ip: String,
    /// Device name.
    pub device_name: String,
    /// `OpenCL` platform name.
    pub platform: String,
    /// Device class.
    pub device_type: DeviceType,
}

/// Owned map from worker id to worker record.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: BTreeMap<WorkerId, Worker>,
}

impl WorkerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker, replacing any record with the same id.
    ///
    /// The new record starts in [`WorkerState::Waiting`] with no results.
    /// A duplicate id is logged and the old record is discarded (last
    /// writer wins, nothing is merged).
    pub fn on_connected(&mut self, identity: WorkerIdentity) -> RegistryOutcome {
        let id = identity.id.clone();
        let worker = Worker {
            id: identity.id,
            ip: identity.ip,
            device_name: identity.device_name,
            platform: identity.platform,
            device_type: identity.device_type,
            state: WorkerState::Waiting,
            statistics: Vec::new(),
            best: None,
        };
        if self.workers.contains_key(&id) {
            warn!(worker = %id, "Duplicate worker id, previous record overwritten");
        }
        match self.workers.insert(id, worker) {
            Some(_) => RegistryOutcome::Replaced,
            None => RegistryOutcome::Inserted,
        }
    }

    /// Remove a worker. Unknown ids are ignored.
    pub fn on_lost(&mut self, id: &WorkerId) -> RegistryOutcome {
        if self.workers.remove(id).is_some() {
            RegistryOutcome::Removed
        } else {
            debug!(worker = %id, "Lost event for unregistered worker ignored");
            RegistryOutcome::Absent
        }
    }

    /// Record a worker's new lifecycle state.
    pub fn on_state_changed(&mut self, id: &WorkerId, state: WorkerState) -> RegistryOutcome {
        let Some(worker) = self.workers.get_mut(id) else {
            warn!(worker = %id, %state, "State change for unknown worker ignored");
            return RegistryOutcome::UnknownWorker;
        };
        worker.state = state;
        RegistryOutcome::Updated
    }

    /// Append a generation result and update the worker's best fitness.
    pub fn on_result(&mut self, id: &WorkerId, result: GenerationResult) -> RegistryOutcome {
        let Some(worker) = self.workers.get_mut(id) else {
            warn!(worker = %id, "Generation result for unknown worker ignored");
            return RegistryOutcome::UnknownWorker;
        };
        let best = worker
            .best
            .map_or(result.best_fitness, |b| b.min(result.best_fitness));
        worker.best = Some(best);
        worker.statistics.push(result);
        RegistryOutcome::Updated
    }

    /// Look up one worker.
    pub fn get(&self, id: &WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    /// Whether a worker is registered.
    pub fn contains(&self, id: &WorkerId) -> bool {
        self.workers.contains_key(id)
    }

    /// Number of registered workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the fleet is empty.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Last reported state of every worker, in id order.
    pub fn states(&self) -> Vec<WorkerState> {
        self.workers.values().map(|w| w.state).collect()
    }

    /// Copy of the full worker map.
    pub fn snapshot(&self) -> BTreeMap<WorkerId, Worker> {
        self.workers.clone()
    }

    /// Per-worker summaries, leaving the result histories behind.
    pub fn summaries(&self) -> BTreeMap<WorkerId, WorkerSummary> {
        self.workers
            .iter()
            .map(|(id, worker)| (id.clone(), worker.summary()))
            .collect()
    }
}
