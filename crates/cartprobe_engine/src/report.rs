//! Report encoding for transport.
//!
//! A [`SimulationReport`] borrows a [`SimulationResult`] and encodes it as
//! JSON or `MessagePack`. Sanitized payloads are already bounded, so encoding
//! never traverses live engine objects.

use cartprobe_debug::DiagnosticEvent;
use cartprobe_foundation::{Error, ErrorKind, Result};
use serde::Serialize;

use crate::classify::ErrorClass;
use crate::simulation::{SimulationOutcome, SimulationResult};

/// Serializable view of a finished run.
#[derive(Debug, Serialize)]
pub struct SimulationReport<'a> {
    /// Whether the code was applied.
    pub applied: bool,
    /// Failure category, absent when applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    /// How the run ended.
    pub outcome: &'a SimulationOutcome,
    /// Every event of the run.
    pub events: &'a [DiagnosticEvent],
}

impl SimulationResult {
    /// Borrows this result as a report.
    #[must_use]
    pub fn report(&self) -> SimulationReport<'_> {
        SimulationReport {
            applied: self.applied(),
            error_class: self.error_class(),
            outcome: &self.outcome,
            events: &self.events,
        }
    }
}

impl SimulationReport<'_> {
    /// Encodes as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
    }

    /// Encodes as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
    }

    /// Encodes as `MessagePack`, keeping field names.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
    }
}
