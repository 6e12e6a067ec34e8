//! Worker registry, streaming aggregation, state reconciliation and command
//! gating for the evofleet dashboard.
//!
//! A fleet of evolutionary-search workers reports lifecycle changes and
//! per-generation fitness over a feed. This crate folds that feed into one
//! consistent view: who is connected, what each worker last reported, the
//! fleet-wide state derived from those reports, and time-bucketed fitness
//! averages. It also decides which operator commands are legal and packages
//! them for the wire.
//!
//! # Modules
//!
//! - [`registry`] -- Owned map of worker records and the per-event updates.
//! - [`aggregator`] -- Fixed-width time buckets with running means.
//! - [`reconcile`] -- Pure function deriving the global state.
//! - [`gate`] -- Command legality table and command packaging.
//! - [`run_config`] -- Validated operator edits to the run configuration.
//! - [`dispatcher`] -- Inbound frame decoding into [`FleetEvent`].
//! - [`fleet`] -- The [`Fleet`] aggregate tying the above together.
//! - [`runner`] -- The single-writer fleet actor and its handle.
//! - [`config`] -- Configuration loading from `evofleet-config.yaml`.
//!
//! [`FleetEvent`]: dispatcher::FleetEvent
//! [`Fleet`]: fleet::Fleet

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod fleet;
pub mod gate;
pub mod reconcile;
pub mod registry;
pub mod run_config;
pub mod runner;
