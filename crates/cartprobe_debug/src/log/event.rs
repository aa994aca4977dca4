//! Diagnostic event types.

use std::fmt;

use serde::Serialize;

use crate::sanitize::LogValue;

// =============================================================================
// Event Kind
// =============================================================================

/// Category of a diagnostic event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Progress information.
    Info,
    /// A step succeeded.
    Success,
    /// Something unexpected but recoverable happened.
    Warning,
    /// A step failed.
    Error,
    /// A traced filter hook fired.
    #[serde(rename = "filter")]
    HookFilter,
    /// A traced action hook fired.
    #[serde(rename = "action")]
    HookAction,
}

impl EventKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 6] = [
        Self::Info,
        Self::Success,
        Self::Warning,
        Self::Error,
        Self::HookFilter,
        Self::HookAction,
    ];

    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::HookFilter => "filter",
            Self::HookAction => "action",
        }
    }

    /// Returns true for events produced by the hook tracer.
    #[must_use]
    pub const fn is_hook(self) -> bool {
        matches!(self, Self::HookFilter | Self::HookAction)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Diagnostic Event
// =============================================================================

/// A single entry in the [`EventLog`](super::EventLog).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosticEvent {
    /// Monotonically increasing id, unique within one log.
    pub id: u64,
    /// Event category.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Human-readable message, already truncated.
    pub message: String,
    /// Structured payload, already sanitized and size-checked.
    #[serde(rename = "data", skip_serializing_if = "Option::is_none")]
    pub payload: Option<LogValue>,
    /// Milliseconds since the Unix epoch when the event was appended.
    pub timestamp_ms: u64,
}

impl DiagnosticEvent {
    /// Returns true if the message contains `needle`.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle)
    }
}
