//! The fleet actor: a single task that owns the [`Fleet`] and applies
//! inputs one at a time.
//!
//! Feed frames, operator commands and configuration edits all arrive over
//! one `mpsc` channel, so every mutation runs to completion before the
//! next starts and readers never see a half-applied event. After each
//! mutation the loop hands a [`FleetUpdate`] and the fleet to a
//! [`FleetCallback`], which publishes snapshots and fans out updates.
//! Accepted commands are handed to the callback as well; sending them to
//! the workers is fire-and-forget.
//!
//! [`FleetHandle`] is the cloneable sending side used by the feed socket
//! and the operator API.

use chrono::{DateTime, Utc};
use evofleet_types::{
    CommandFrame, CommandKind, FleetSnapshot, FleetUpdate, RunConfig, Worker, WorkerId,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::dispatcher;
use crate::fleet::{Fleet, FleetError};
use crate::run_config::RunConfigPatch;

/// One unit of work for the fleet actor.
#[derive(Debug)]
pub enum FleetInput {
    /// A raw text frame from the worker feed.
    Frame {
        /// Frame contents.
        text: String,
        /// When the frame arrived.
        received_at: DateTime<Utc>,
    },
    /// An operator command.
    Command {
        /// Requested command.
        kind: CommandKind,
        /// Receives the packaged frame or the rejection.
        reply: oneshot::Sender<Result<CommandFrame, FleetError>>,
    },
    /// An operator edit to the run configuration.
    UpdateConfig {
        /// Fields to change.
        patch: RunConfigPatch,
        /// Receives the updated configuration or the rejection.
        reply: oneshot::Sender<Result<RunConfig, FleetError>>,
    },
    /// A request for one worker's full record.
    Worker {
        /// The worker to look up.
        id: WorkerId,
        /// Receives the record, or `None` if the worker is not registered.
        reply: oneshot::Sender<Option<Worker>>,
    },
    /// A request for a snapshot taken after every earlier input.
    Snapshot {
        /// Receives the snapshot.
        reply: oneshot::Sender<FleetSnapshot>,
    },
}

/// Errors returned to callers of a [`FleetHandle`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HandleError {
    /// The fleet actor is no longer running.
    #[error("fleet actor has stopped")]
    Closed,

    /// The fleet rejected the request.
    #[error(transparent)]
    Rejected(#[from] FleetError),
}

impl From<mpsc::error::SendError<FleetInput>> for HandleError {
    fn from(_closed: mpsc::error::SendError<FleetInput>) -> Self {
        Self::Closed
    }
}

impl From<oneshot::error::RecvError> for HandleError {
    fn from(_closed: oneshot::error::RecvError) -> Self {
        Self::Closed
    }
}

/// Callback invoked by the actor after each completed mutation.
pub trait FleetCallback: Send {
    /// Called after the fleet changed.
    fn on_update(&mut self, update: &FleetUpdate, fleet: &Fleet);

    /// Called when a command was accepted and must go out to the workers.
    fn on_command(&mut self, frame: &CommandFrame);
}

/// A callback that ignores everything.
pub struct NoOpCallback;

impl FleetCallback for NoOpCallback {
    fn on_update(&mut self, _update: &FleetUpdate, _fleet: &Fleet) {}

    fn on_command(&mut self, _frame: &CommandFrame) {}
}

/// Cloneable sending side of the fleet actor.
#[derive(Debug, Clone)]
pub struct FleetHandle {
    tx: mpsc::Sender<FleetInput>,
}

impl FleetHandle {
    /// Queue a raw feed frame, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Closed`] if the actor has stopped.
    pub async fn submit_frame(&self, text: String) -> Result<(), HandleError> {
        self.tx
            .send(FleetInput::Frame {
                text,
                received_at: Utc::now(),
            })
            .await?;
        Ok(())
    }

    /// Ask the fleet to issue a command and wait for the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Rejected`] when the command is illegal, or
    /// [`HandleError::Closed`] if the actor has stopped.
    pub async fn issue(&self, kind: CommandKind) -> Result<CommandFrame, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(FleetInput::Command { kind, reply }).await?;
        Ok(rx.await??)
    }

    /// Ask the fleet to apply a configuration patch.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Rejected`] when the fleet is not waiting or
    /// the patch is invalid, or [`HandleError::Closed`] if the actor has
    /// stopped.
    pub async fn update_config(&self, patch: RunConfigPatch) -> Result<RunConfig, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(FleetInput::UpdateConfig { patch, reply }).await?;
        Ok(rx.await??)
    }

    /// Fetch one worker's full record, including its result history.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Closed`] if the actor has stopped.
    pub async fn worker(&self, id: WorkerId) -> Result<Option<Worker>, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(FleetInput::Worker { id, reply }).await?;
        Ok(rx.await?)
    }

    /// Take a snapshot once every input queued before this call has been
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Closed`] if the actor has stopped.
    pub async fn snapshot(&self) -> Result<FleetSnapshot, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(FleetInput::Snapshot { reply }).await?;
        Ok(rx.await?)
    }
}

/// Create the actor channel with room for `capacity` queued inputs.
pub fn channel(capacity: usize) -> (FleetHandle, mpsc::Receiver<FleetInput>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (FleetHandle { tx }, rx)
}

/// Run the fleet actor until every [`FleetHandle`] has been dropped.
///
/// Returns the fleet in its final state.
pub async fn run_fleet(
    mut fleet: Fleet,
    mut inputs: mpsc::Receiver<FleetInput>,
    callback: &mut dyn FleetCallback,
) -> Fleet {
    info!(state = %fleet.global_state(), "Fleet actor starting");

    while let Some(input) = inputs.recv().await {
        match input {
            FleetInput::Frame { text, received_at } => {
                let event = match dispatcher::decode(&text, received_at) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Malformed feed frame ignored");
                        continue;
                    }
                };
                debug!(kind = event.kind(), worker = %event.worker(), "Applying feed event");
                let applied = fleet.apply(event);
                if applied.outcome.mutated() || applied.state_changed() {
                    callback.on_update(&fleet.update(Some(&applied)), &fleet);
                }
            }
            FleetInput::Command { kind, reply } => {
                let verdict = fleet.issue(kind);
                if let Ok(frame) = &verdict {
                    callback.on_command(frame);
                    callback.on_update(&fleet.update(None), &fleet);
                }
                if reply.send(verdict).is_err() {
                    debug!(command = %kind, "Command requester went away before the reply");
                }
            }
            FleetInput::UpdateConfig { patch, reply } => {
                let before = fleet.sequence();
                let verdict = fleet.update_config(&patch).cloned();
                if fleet.sequence() != before {
                    callback.on_update(&fleet.update(None), &fleet);
                }
                if reply.send(verdict).is_err() {
                    debug!("Config requester went away before the reply");
                }
            }
            FleetInput::Worker { id, reply } => {
                if reply.send(fleet.worker(&id)).is_err() {
                    debug!(worker = %id, "Worker requester went away before the reply");
                }
            }
            FleetInput::Snapshot { reply } => {
                if reply.send(fleet.snapshot()).is_err() {
                    debug!("Snapshot requester went away before the reply");
                }
            }
        }
    }

    info!(
        state = %fleet.global_state(),
        workers = fleet.worker_count(),
        "Fleet actor stopped"
    );
    fleet
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU64;
    use std::sync::{Arc, Mutex};

    use evofleet_types::{CommandLegality, WorkerState};

    use super::*;
    use crate::gate::GateError;

    #[derive(Default)]
    struct Recorded {
        updates: Vec<FleetUpdate>,
        commands: Vec<CommandFrame>,
    }

    struct Recorder(Arc<Mutex<Recorded>>);

    impl FleetCallback for Recorder {
        fn on_update(&mut self, update: &FleetUpdate, _fleet: &Fleet) {
            self.0.lock().unwrap().updates.push(update.clone());
        }

        fn on_command(&mut self, frame: &CommandFrame) {
            self.0.lock().unwrap().commands.push(frame.clone());
        }
    }

    fn spawn() -> (
        FleetHandle,
        Arc<Mutex<Recorded>>,
        tokio::task::JoinHandle<Fleet>,
    ) {
        let (handle, rx) = channel(16);
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let mut recorder = Recorder(Arc::clone(&recorded));
        let fleet = Fleet::new(NonZeroU64::new(5_000).unwrap(), RunConfig::default());
        let task = tokio::spawn(async move { run_fleet(fleet, rx, &mut recorder).await });
        (handle, recorded, task)
    }

    const CONNECT_A: &str = r#"{"type":"workerConnected","data":{"worker":"a","name":"n","ip":"1.2.3.4","platform":"p","type":"CPU"}}"#;

    #[tokio::test]
    async fn frames_are_applied_in_order() {
        let (handle, recorded, task) = spawn();
        handle.submit_frame(CONNECT_A.to_owned()).await.unwrap();
        handle
            .submit_frame(
                r#"{"type":"stateChanged","data":{"worker":"a","state":"preparing"}}"#.to_owned(),
            )
            .await
            .unwrap();
        drop(handle);

        let fleet = task.await.unwrap();
        assert_eq!(fleet.global_state(), WorkerState::Preparing);

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.updates.len(), 2);
        let last = recorded.updates.last().unwrap();
        assert!(last.state_changed);
        assert_eq!(last.sequence, 2);
    }

    #[tokio::test]
    async fn malformed_frames_do_not_stop_the_actor() {
        let (handle, recorded, task) = spawn();
        handle.submit_frame("garbage".to_owned()).await.unwrap();
        handle
            .submit_frame(r#"{"type":"bogus","data":{}}"#.to_owned())
            .await
            .unwrap();
        handle.submit_frame(CONNECT_A.to_owned()).await.unwrap();
        drop(handle);

        let fleet = task.await.unwrap();
        assert_eq!(fleet.workers().len(), 1);
        assert_eq!(recorded.lock().unwrap().updates.len(), 1);
    }

    #[tokio::test]
    async fn accepted_command_is_emitted() {
        let (handle, recorded, task) = spawn();
        let frame = handle.issue(CommandKind::Prepare).await.unwrap();
        assert_eq!(frame.kind(), CommandKind::Prepare);
        drop(handle);
        task.await.unwrap();

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.commands, vec![frame]);
        assert_eq!(
            recorded.updates.last().map(|u| u.legality),
            Some(CommandLegality {
                prepare: true,
                ..CommandLegality::default()
            })
        );
    }

    #[tokio::test]
    async fn illegal_command_is_returned_and_not_emitted() {
        let (handle, recorded, task) = spawn();
        let err = handle.issue(CommandKind::Stop).await.unwrap_err();
        assert_eq!(
            err,
            HandleError::Rejected(FleetError::Gate(GateError::IllegalCommand {
                command: CommandKind::Stop,
                state: WorkerState::Waiting,
            }))
        );
        drop(handle);
        task.await.unwrap();
        assert!(recorded.lock().unwrap().commands.is_empty());
    }

    #[tokio::test]
    async fn config_updates_round_trip_through_the_actor() {
        let (handle, _recorded, task) = spawn();
        let config = handle
            .update_config(RunConfigPatch {
                population: Some(64),
                ..RunConfigPatch::default()
            })
            .await
            .unwrap();
        assert_eq!(config.population, 64);
        drop(handle);
        assert_eq!(task.await.unwrap().run_config().population, 64);
    }

    #[tokio::test]
    async fn snapshot_reflects_every_earlier_frame() {
        let (handle, _recorded, _task) = spawn();
        handle.submit_frame(CONNECT_A.to_owned()).await.unwrap();
        handle
            .submit_frame(
                r#"{"type":"generationResult","data":{"worker":"a","time":0,"result":{"best_fitness":4.0,"avg_fitness":5.0,"worst_fitness":6.0}}}"#.to_owned(),
            )
            .await
            .unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.total_results, 1);
        assert_eq!(snapshot.sequence, 2);

        let worker = handle.worker(WorkerId::from("a")).await.unwrap().unwrap();
        assert_eq!(worker.statistics.len(), 1);
        assert!(handle.worker(WorkerId::from("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn actor_runs_without_subscribers() {
        let (handle, rx) = channel(4);
        let fleet = Fleet::new(NonZeroU64::new(1_000).unwrap(), RunConfig::default());
        let task = tokio::spawn(async move { run_fleet(fleet, rx, &mut NoOpCallback).await });
        handle.submit_frame(CONNECT_A.to_owned()).await.unwrap();
        handle.issue(CommandKind::Prepare).await.unwrap();
        drop(handle);

        let fleet = task.await.unwrap();
        assert_eq!(fleet.workers().len(), 1);
        assert!(fleet.run_id().is_some());
    }

    #[tokio::test]
    async fn handle_reports_closed_actor() {
        let (handle, rx) = channel(1);
        drop(rx);
        assert_eq!(
            handle.issue(CommandKind::Prepare).await.unwrap_err(),
            HandleError::Closed
        );
        assert_eq!(
            handle.submit_frame(String::new()).await.unwrap_err(),
            HandleError::Closed
        );
    }
}
