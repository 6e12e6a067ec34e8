//! Fleet-wide state reconciliation.
//!
//! [`next`] derives the single global state of the fleet from the current
//! global state and the states the workers last reported. It is a pure
//! function so it can be driven from tests or any thread without touching
//! the registry.
//!
//! # Transition table
//!
//! | Current | Rule (first match wins) | Next |
//! |---------|-------------------------|------|
//! | `Waiting` | any `Preparing` / else any `Restoring` / else all `Prepared` | `Preparing` / `Restoring` / `Prepared` |
//! | `Preparing` | all `Prepared` | `Prepared` |
//! | `Restoring` | all `Prepared` | `Prepared` |
//! | `Prepared` | any `Running` | `Running` |
//! | `Running` | any `Pausing` / else any `Stopping` / else all `Paused` / else all `Stopped` | `Pausing` / `Stopping` / `Paused` / `Stopped` |
//! | `Pausing` | all `Paused` | `Paused` |
//! | `Stopping` | all `Stopped` | `Stopped` |
//! | `Paused` | any `Running` / else any `Saving` / else any `Stopping` | `Running` / `Saving` / `Stopping` |
//! | `Saving` | all `Paused` | `Paused` |
//! | `Stopped` | terminal | `Stopped` |
//!
//! A single worker starting a transition is enough to move the fleet into
//! the transitional state; completing a transition requires every worker to
//! agree. When no rule fires the current state is returned unchanged.

use evofleet_types::WorkerState;

/// Compute the next global state.
///
/// Returns `current` when `observed` is empty: with no workers there is no
/// evidence to act on.
pub fn next(current: WorkerState, observed: &[WorkerState]) -> WorkerState {
    if observed.is_empty() {
        return current;
    }
    let fleet = Observed(observed);
    match current {
        WorkerState::Waiting => from_waiting(fleet),
        WorkerState::Preparing | WorkerState::Restoring => {
            converge(current, fleet, WorkerState::Prepared)
        }
        WorkerState::Prepared => from_prepared(fleet),
        WorkerState::Running => from_running(fleet),
        WorkerState::Pausing | WorkerState::Saving => converge(current, fleet, WorkerState::Paused),
        WorkerState::Stopping => converge(current, fleet, WorkerState::Stopped),
        WorkerState::Paused => from_paused(fleet),
        WorkerState::Stopped => WorkerState::Stopped,
    }
}

/// Predicates over a non-empty set of observed worker states.
#[derive(Clone, Copy)]
struct Observed<'a>(&'a [WorkerState]);

impl Observed<'_> {
    fn any(self, state: WorkerState) -> bool {
        self.0.contains(&state)
    }

    fn all(self, state: WorkerState) -> bool {
        self.0.iter().all(|s| *s == state)
    }
}

fn from_waiting(fleet: Observed<'_>) -> WorkerState {
    if fleet.any(WorkerState::Preparing) {
        WorkerState::Preparing
    } else if fleet.any(WorkerState::Restoring) {
        WorkerState::Restoring
    } else if fleet.all(WorkerState::Prepared) {
        WorkerState::Prepared
    } else {
        WorkerState::Waiting
    }
}

fn from_prepared(fleet: Observed<'_>) -> WorkerState {
    if fleet.any(WorkerState::Running) {
        WorkerState::Running
    } else {
        WorkerState::Prepared
    }
}

fn from_running(fleet: Observed<'_>) -> WorkerState {
    if fleet.any(WorkerState::Pausing) {
        WorkerState::Pausing
    } else if fleet.any(WorkerState::Stopping) {
        WorkerState::Stopping
    } else if fleet.all(WorkerState::Paused) {
        WorkerState::Paused
    } else if fleet.all(WorkerState::Stopped) {
        WorkerState::Stopped
    } else {
        WorkerState::Running
    }
}

fn from_paused(fleet: Observed<'_>) -> WorkerState {
    if fleet.any(WorkerState::Running) {
        WorkerState::Running
    } else if fleet.any(WorkerState::Saving) {
        WorkerState::Saving
    } else if fleet.any(WorkerState::Stopping) {
        WorkerState::Stopping
    } else {
        WorkerState::Paused
    }
}

/// Stay in `current` until every worker reports `target`.
fn converge(current: WorkerState, fleet: Observed<'_>, target: WorkerState) -> WorkerState {
    if fleet.all(target) { target } else { current }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkerState::{
        Paused, Pausing, Prepared, Preparing, Restoring, Running, Saving, Stopped, Stopping,
        Waiting,
    };

    #[test]
    fn empty_fleet_never_moves() {
        for state in WorkerState::ALL {
            assert_eq!(next(state, &[]), state);
        }
    }

    #[test]
    fn single_worker_starting_preparation() {
        assert_eq!(next(Waiting, &[Preparing]), Preparing);
    }

    #[test]
    fn preparation_completes_when_all_prepared() {
        assert_eq!(next(Preparing, &[Prepared, Prepared]), Prepared);
        assert_eq!(next(Preparing, &[Prepared, Preparing]), Preparing);
    }

    #[test]
    fn one_pausing_worker_moves_running_fleet() {
        assert_eq!(next(Running, &[Pausing, Running]), Pausing);
    }

    #[test]
    fn waiting_prefers_preparing_over_restoring() {
        assert_eq!(next(Waiting, &[Restoring, Preparing]), Preparing);
        assert_eq!(next(Waiting, &[Restoring, Waiting]), Restoring);
        assert_eq!(next(Waiting, &[Prepared, Prepared]), Prepared);
        assert_eq!(next(Waiting, &[Prepared, Waiting]), Waiting);
    }

    #[test]
    fn restoring_converges_to_prepared() {
        assert_eq!(next(Restoring, &[Prepared]), Prepared);
        assert_eq!(next(Restoring, &[Prepared, Restoring]), Restoring);
    }

    #[test]
    fn running_rules_in_priority_order() {
        assert_eq!(next(Running, &[Stopping, Pausing]), Pausing);
        assert_eq!(next(Running, &[Stopping, Running]), Stopping);
        assert_eq!(next(Running, &[Paused, Paused]), Paused);
        assert_eq!(next(Running, &[Stopped, Stopped]), Stopped);
        assert_eq!(next(Running, &[Paused, Stopped]), Running);
    }

    #[test]
    fn paused_rules_in_priority_order() {
        assert_eq!(next(Paused, &[Saving, Running]), Running);
        assert_eq!(next(Paused, &[Saving, Stopping]), Saving);
        assert_eq!(next(Paused, &[Paused, Stopping]), Stopping);
        assert_eq!(next(Paused, &[Paused, Paused]), Paused);
    }

    #[test]
    fn saving_and_stopping_converge() {
        assert_eq!(next(Saving, &[Paused, Saving]), Saving);
        assert_eq!(next(Saving, &[Paused, Paused]), Paused);
        assert_eq!(next(Stopping, &[Stopped, Stopping]), Stopping);
        assert_eq!(next(Stopping, &[Stopped, Stopped]), Stopped);
        assert_eq!(next(Pausing, &[Paused, Paused]), Paused);
    }

    #[test]
    fn stopped_is_terminal() {
        for observed in WorkerState::ALL {
            assert_eq!(next(Stopped, &[observed, observed]), Stopped);
        }
    }

    #[test]
    fn inconsistent_mix_is_a_no_op() {
        assert_eq!(next(Prepared, &[Waiting, Stopped]), Prepared);
        assert_eq!(next(Pausing, &[Running, Stopped]), Pausing);
    }

    #[test]
    fn converged_fleet_is_stable_after_one_step() {
        // Walk a uniform fleet through a full run; each step must fire at
        // most once and then hold.
        let steps = [
            (Waiting, Preparing, Preparing),
            (Preparing, Prepared, Prepared),
            (Prepared, Running, Running),
            (Running, Pausing, Pausing),
            (Pausing, Paused, Paused),
            (Paused, Running, Running),
            (Running, Stopping, Stopping),
            (Stopping, Stopped, Stopped),
        ];
        for (current, reported, expected) in steps {
            for n in 1..=4 {
                let observed = vec![reported; n];
                let after = next(current, &observed);
                assert_eq!(after, expected, "{current} with {n}x {reported}");
                assert_eq!(next(after, &observed), after, "{after} must hold");
            }
        }
    }
}
