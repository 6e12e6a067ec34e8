//! Shared type definitions for the evofleet worker dashboard.
//!
//! This crate is the single source of truth for the data model the fleet
//! core maintains and the dashboard reads. Presentation-facing types flow
//! downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Worker and run identifiers
//! - [`enums`] -- Worker lifecycle states, device classes, command kinds
//! - [`structs`] -- Workers, generation results, buckets, run config, snapshots
//! - [`wire`] -- Inbound feed frames and outbound command frames

pub mod enums;
pub mod ids;
pub mod structs;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use enums::{CommandKind, DeviceType, RepopulationKind, WorkerState};
pub use ids::{RunId, WorkerId};
pub use structs::{
    AggregationBucket, CommandLegality, FleetSnapshot, FleetUpdate, GenerationResult,
    Repopulation, RunConfig, StateCount, Termination, Worker, WorkerSummary,
};
pub use wire::{
    CommandFrame, GenerationResultData, PreparePayload, RawFrame, RepopulatingWire, RunPayload,
    StateChangedData, TerminationWire, WorkerConnectedData, WorkerLostData,
};
