//! Limits for the event log and the value sanitizer.

use serde::Deserialize;

/// Bounds applied by the [`EventLog`](crate::EventLog).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum stored events, including the terminal limit marker.
    pub max_events: usize,

    /// Messages longer than this many characters are truncated.
    pub max_message_chars: usize,

    /// Payloads whose JSON encoding exceeds this many bytes are replaced.
    pub max_payload_bytes: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            max_message_chars: 1000,
            max_payload_bytes: 10_000,
        }
    }
}

impl LogConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the event cap.
    #[must_use]
    pub const fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Builder method to set the message length cap.
    #[must_use]
    pub const fn with_max_message_chars(mut self, max: usize) -> Self {
        self.max_message_chars = max;
        self
    }

    /// Builder method to set the payload size cap.
    #[must_use]
    pub const fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }
}

/// Bounds applied by the [`Sanitizer`](crate::Sanitizer).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Values nested deeper than this are replaced by a depth marker.
    pub max_depth: usize,

    /// Collections with more elements than this are summarized, not traversed.
    pub max_collection_len: usize,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_collection_len: 100,
        }
    }
}

impl SanitizeConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the maximum depth.
    #[must_use]
    pub const fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder method to set the collection size threshold.
    #[must_use]
    pub const fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }
}
