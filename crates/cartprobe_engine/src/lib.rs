//! Snapshot, isolation, and simulation orchestration for cartprobe.
//!
//! This crate provides:
//! - [`SnapshotManager`] - Fail-fast capture and best-effort restore of cart state
//! - [`UnitPicker`] - Resolution of composite products to purchasable units
//! - [`ErrorClass`] - Sorting engine faults into known incompatibilities and exceptions
//! - [`Simulator`] - The Backup, Isolate, Configure, Trace + Execute, Restore, Report run
//! - [`SimulationReport`] - JSON and `MessagePack` encoding of a finished run

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod classify;
pub mod config;
pub mod report;
pub mod select;
pub mod simulation;
pub mod snapshot;

pub use classify::{ErrorClass, blamed_extension, classify};
pub use config::{
    IncompatibilityRules, ScratchKey, ScratchReset, SelectionPolicy, SimulatorConfig,
};
pub use report::SimulationReport;
pub use select::{ResolvedLine, SelectionError, UnitPicker};
pub use simulation::{
    ProductSelection, SimulationOutcome, SimulationRequest, SimulationResult, Simulator,
};
pub use snapshot::{CartSnapshot, RestoreReport, SnapshotManager};
