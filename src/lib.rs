//! Cartprobe - isolated discount-code simulation for cart engines
//!
//! This crate re-exports all layers of the cartprobe system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: cartprobe_engine     - Snapshots, product selection, simulation runs, reports
//! Layer 1: cartprobe_debug      - Event log, value sanitizer, hook tracer
//! Layer 0: cartprobe_foundation - Core types (Value, ids, Money, Error) and collaborator ports
//! ```

pub use cartprobe_debug as debug;
pub use cartprobe_engine as engine;
pub use cartprobe_foundation as foundation;
