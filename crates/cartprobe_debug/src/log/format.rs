//! Event log output formatters.
//!
//! Provides human-readable and JSON formatters for diagnostic events.

use std::fmt::Write;

use super::event::DiagnosticEvent;

// =============================================================================
// Event Formatter Trait
// =============================================================================

/// Trait for formatting diagnostic events.
pub trait EventFormatter {
    /// Formats a single event to a string.
    fn format(&self, event: &DiagnosticEvent) -> String;

    /// Formats multiple events.
    fn format_many(&self, events: &[DiagnosticEvent]) -> String {
        events
            .iter()
            .map(|e| self.format(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Human-Readable Formatter
// =============================================================================

/// Formats events one per line.
#[derive(Clone, Debug, Default)]
pub struct HumanFormatter {
    /// Whether to include timestamps.
    pub show_timestamps: bool,
    /// Whether to include event IDs.
    pub show_ids: bool,
    /// Whether to append the payload as compact JSON.
    pub show_payloads: bool,
}

impl HumanFormatter {
    /// Creates a new human formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to show timestamps.
    #[must_use]
    pub const fn with_timestamps(mut self) -> Self {
        self.show_timestamps = true;
        self
    }

    /// Builder method to show event IDs.
    #[must_use]
    pub const fn with_ids(mut self) -> Self {
        self.show_ids = true;
        self
    }

    /// Builder method to show payloads.
    #[must_use]
    pub const fn with_payloads(mut self) -> Self {
        self.show_payloads = true;
        self
    }
}

impl EventFormatter for HumanFormatter {
    fn format(&self, event: &DiagnosticEvent) -> String {
        let mut line = String::new();

        if self.show_ids {
            let _ = write!(line, "[{:06}] ", event.id);
        }

        if self.show_timestamps {
            let _ = write!(line, "{:>13} ", event.timestamp_ms);
        }

        let kind = event.kind.as_str().to_ascii_uppercase();
        let _ = write!(line, "{kind:<8} {}", event.message);

        let payload = event.payload.as_ref().filter(|_| self.show_payloads);
        if let Some(json) = payload.and_then(|p| serde_json::to_string(p).ok()) {
            let _ = write!(line, " {json}");
        }

        line
    }
}

// =============================================================================
// JSON Formatter
// =============================================================================

/// Formats events as JSON.
#[derive(Clone, Debug, Default)]
pub struct JsonFormatter {
    /// Whether to pretty-print JSON.
    pub pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method for pretty printing.
    #[must_use]
    pub const fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn encode<T: serde::Serialize + ?Sized>(&self, value: &T) -> String {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl EventFormatter for JsonFormatter {
    fn format(&self, event: &DiagnosticEvent) -> String {
        self.encode(event)
    }

    fn format_many(&self, events: &[DiagnosticEvent]) -> String {
        self.encode(events)
    }
}

// =============================================================================
// Tests
// =============================================================================
