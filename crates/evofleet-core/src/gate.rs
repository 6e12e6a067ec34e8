//! Operator command gating and packaging.
//!
//! [`legality`] maps the fleet's global state to the set of commands the
//! operator may issue. [`issue`] checks a requested command against that
//! table and, when allowed, builds the [`CommandFrame`] sent to the fleet.
//!
//! # Legality table
//!
//! | Global state | prepare | run | pause | stop |
//! |--------------|---------|-----|-------|------|
//! | `Waiting` | yes | | | |
//! | `Prepared` | | yes | | |
//! | `Running` | | | yes | yes |
//! | `Paused` | | yes | | yes |
//! | any other | | | | |

use evofleet_types::{
    CommandFrame, CommandKind, CommandLegality, PreparePayload, RepopulatingWire, RunConfig,
    RunPayload, Termination, TerminationWire, WorkerState,
};

/// Errors returned when a command cannot be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The command is not allowed in the fleet's current global state.
    #[error("command '{command}' is not allowed while the fleet is {state}")]
    IllegalCommand {
        /// The rejected command.
        command: CommandKind,
        /// The global state at the time of the request.
        state: WorkerState,
    },
}

/// Commands allowed in `state`.
pub const fn legality(state: WorkerState) -> CommandLegality {
    const fn allow(prepare: bool, run: bool, pause: bool, stop: bool) -> CommandLegality {
        CommandLegality {
            prepare,
            run,
            pause,
            stop,
        }
    }
    match state {
        WorkerState::Waiting => allow(true, false, false, false),
        WorkerState::Prepared => allow(false, true, false, false),
        WorkerState::Running => allow(false, false, true, true),
        WorkerState::Paused => allow(false, true, false, true),
        WorkerState::Preparing
        | WorkerState::Restoring
        | WorkerState::Pausing
        | WorkerState::Saving
        | WorkerState::Stopping
        | WorkerState::Stopped => allow(false, false, false, false),
    }
}

/// Whether `command` is allowed in `state`.
pub const fn is_allowed(state: WorkerState, command: CommandKind) -> bool {
    let flags = legality(state);
    match command {
        CommandKind::Prepare => flags.prepare,
        CommandKind::Run => flags.run,
        CommandKind::Pause => flags.pause,
        CommandKind::Stop => flags.stop,
    }
}

/// Check `command` against the legality table and package it.
///
/// # Errors
///
/// Returns [`GateError::IllegalCommand`] when the command is not allowed
/// in `state`.
pub fn issue(
    state: WorkerState,
    command: CommandKind,
    config: &RunConfig,
) -> Result<CommandFrame, GateError> {
    if !is_allowed(state, command) {
        return Err(GateError::IllegalCommand { command, state });
    }
    Ok(match command {
        CommandKind::Prepare => CommandFrame::Prepare(prepare_payload(config)),
        CommandKind::Run => CommandFrame::Run(run_payload(config)),
        CommandKind::Pause => CommandFrame::Pause,
        CommandKind::Stop => CommandFrame::Stop,
    })
}

/// Convert the operator configuration to the `prepare` wire shape.
///
/// Minutes become seconds, percentages become probabilities, and disabled
/// repopulation or elitism sections are left out.
pub fn prepare_payload(config: &RunConfig) -> PreparePayload {
    let termination = match config.termination {
        Termination::Count { count } => TerminationWire::Count { count },
        Termination::Time { minutes } => TerminationWire::Time {
            time: minutes.saturating_mul(60),
        },
    };
    let RunPayload {
        prob_mutation,
        prob_crossover,
    } = run_payload(config);
    PreparePayload {
        termination,
        population: config.population,
        prob_mutation,
        prob_crossover,
        repopulating: config
            .repopulation
            .trigger()
            .map(|(kind, diff)| RepopulatingWire { kind, diff }),
        sharing_best_after: config.share_best_after,
    }
}

/// Convert the operator configuration to the `run` wire shape.
pub fn run_payload(config: &RunConfig) -> RunPayload {
    RunPayload {
        prob_mutation: config.mutation_ratio / 100.0,
        prob_crossover: config.crossover_ratio / 100.0,
    }
}
