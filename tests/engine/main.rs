//! Integration tests for Layer 2: Engine
//!
//! Tests for snapshot round-trips, simulator configuration, and report
//! encoding of real runs.

mod report;
mod simulator;
mod snapshot;
