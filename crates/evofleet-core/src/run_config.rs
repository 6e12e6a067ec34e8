//! Operator edits to the [`RunConfig`].
//!
//! The dashboard edits one field at a time. A [`RunConfigPatch`] carries
//! only the fields being changed: an absent field keeps its current value.
//! A zero repopulation threshold is rejected rather than silently treated
//! as "keep the previous value", so a patch never means two things.

use evofleet_types::{Repopulation, RepopulationKind, RunConfig, Termination};
use serde::Deserialize;

/// Errors produced when a patch would leave the configuration invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunConfigError {
    /// Population must hold at least one individual.
    #[error("population must be at least 1")]
    EmptyPopulation,

    /// A ratio was outside 0-100 percent.
    #[error("{field} must be between 0 and 100 percent, got {value}")]
    RatioOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A termination limit of zero would end the run immediately.
    #[error("termination {0} must be at least 1")]
    ZeroTermination(&'static str),

    /// Repopulation threshold must be a positive finite number.
    #[error("repopulation diff must be a positive number, got {0}")]
    InvalidDiff(f64),

    /// A repopulation threshold was given without a trigger kind.
    #[error("repopulation diff given but repopulation is disabled")]
    DiffWithoutTrigger,

    /// Elitism sharing interval must be at least one generation.
    #[error("share_best_after must be at least 1")]
    ZeroShareInterval,
}

/// Repopulation trigger selection in a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepopulationSetting {
    /// Turn repopulation off.
    Disabled,
    /// Trigger on the best/worst gap.
    BestWorst,
    /// Trigger on the best/average gap.
    BestAvg,
}

/// Elitism sharing selection in a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ShareSetting {
    /// Share every N generations.
    Every(u32),
    /// `false` turns sharing off.
    Toggle(bool),
}

/// Partial update of a [`RunConfig`]. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfigPatch {
    /// New termination criterion.
    pub termination: Option<Termination>,
    /// New population size.
    pub population: Option<u32>,
    /// New mutation ratio in percent.
    pub mutation_ratio: Option<f64>,
    /// New crossover ratio in percent.
    pub crossover_ratio: Option<f64>,
    /// New repopulation trigger.
    pub repopulation: Option<RepopulationSetting>,
    /// New repopulation threshold.
    pub repopulation_diff: Option<f64>,
    /// New elitism sharing setting.
    pub share_best_after: Option<ShareSetting>,
}

/// Default repopulation threshold used when a trigger is enabled without
/// an explicit diff.
pub const DEFAULT_REPOPULATION_DIFF: f64 = 1.0;

/// Elitism sharing interval used when sharing is switched on without an
/// explicit interval.
pub const DEFAULT_SHARE_BEST_AFTER: u32 = 100;

/// Apply a patch, returning the updated configuration.
///
/// The input is not modified; on error nothing changes.
pub fn apply_patch(
    current: &RunConfig,
    patch: &RunConfigPatch,
) -> Result<RunConfig, RunConfigError> {
    let mut next = current.clone();

    if let Some(termination) = patch.termination {
        next.termination = termination;
    }
    if let Some(population) = patch.population {
        next.population = population;
    }
    if let Some(ratio) = patch.mutation_ratio {
        next.mutation_ratio = ratio;
    }
    if let Some(ratio) = patch.crossover_ratio {
        next.crossover_ratio = ratio;
    }
    next.repopulation = patch_repopulation(current.repopulation, patch)?;
    if let Some(share) = patch.share_best_after {
        next.share_best_after = match share {
            ShareSetting::Every(n) => Some(n),
            ShareSetting::Toggle(false) => None,
            ShareSetting::Toggle(true) => current
                .share_best_after
                .or(Some(DEFAULT_SHARE_BEST_AFTER)),
        };
    }

    validate(&next)?;
    Ok(next)
}

fn patch_repopulation(
    current: Repopulation,
    patch: &RunConfigPatch,
) -> Result<Repopulation, RunConfigError> {
    let current_diff = current.trigger().map(|(_, diff)| diff);
    let kind = match patch.repopulation {
        Some(RepopulationSetting::Disabled) => {
            if patch.repopulation_diff.is_some() {
                return Err(RunConfigError::DiffWithoutTrigger);
            }
            return Ok(Repopulation::Disabled);
        }
        Some(RepopulationSetting::BestWorst) => Some(RepopulationKind::BestWorst),
        Some(RepopulationSetting::BestAvg) => Some(RepopulationKind::BestAvg),
        None => current.trigger().map(|(kind, _)| kind),
    };
    let Some(kind) = kind else {
        return if patch.repopulation_diff.is_some() {
            Err(RunConfigError::DiffWithoutTrigger)
        } else {
            Ok(Repopulation::Disabled)
        };
    };
    let diff = patch
        .repopulation_diff
        .or(current_diff)
        .unwrap_or(DEFAULT_REPOPULATION_DIFF);
    Ok(match kind {
        RepopulationKind::BestWorst => Repopulation::BestWorst { diff },
        RepopulationKind::BestAvg => Repopulation::BestAvg { diff },
    })
}

/// Check every field of a configuration.
pub fn validate(config: &RunConfig) -> Result<(), RunConfigError> {
    if config.population == 0 {
        return Err(RunConfigError::EmptyPopulation);
    }
    check_ratio("mutation_ratio", config.mutation_ratio)?;
    check_ratio("crossover_ratio", config.crossover_ratio)?;
    match config.termination {
        Termination::Count { count: 0 } => return Err(RunConfigError::ZeroTermination("count")),
        Termination::Time { minutes: 0 } => return Err(RunConfigError::ZeroTermination("time")),
        Termination::Count { .. } | Termination::Time { .. } => {}
    }
    let bad_diff = config
        .repopulation
        .trigger()
        .map(|(_, diff)| diff)
        .filter(|diff| !diff.is_finite() || *diff <= 0.0);
    if let Some(diff) = bad_diff {
        return Err(RunConfigError::InvalidDiff(diff));
    }
    if config.share_best_after == Some(0) {
        return Err(RunConfigError::ZeroShareInterval);
    }
    Ok(())
}

fn check_ratio(field: &'static str, value: f64) -> Result<(), RunConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(RunConfigError::RatioOutOfRange { field, value })
    }
}
