//! The bounded diagnostic event log.
//!
//! Every step of a simulation and every traced hook invocation ends up here.
//! The log is capped: once it is one slot short of full, a single terminal
//! warning is stored in the last slot and later appends are dropped.

mod event;
mod format;

pub use event::{DiagnosticEvent, EventKind};
pub use format::{EventFormatter, HumanFormatter, JsonFormatter};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::LogConfig;
use crate::sanitize::LogValue;

/// Message of the terminal event stored when the cap is reached.
pub const LIMIT_REACHED_MESSAGE: &str = "Debug message limit reached. Further messages suppressed.";

/// Message of the placeholder that replaces an oversized payload.
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Data too large to log";

/// A log shared between the orchestrator and the hook tracer for one run.
pub type SharedLog = Rc<RefCell<EventLog>>;

// =============================================================================
// Event Log
// =============================================================================

/// Ordered, capped, truncating store of [`DiagnosticEvent`]s.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<DiagnosticEvent>,
    config: LogConfig,
    next_id: u64,
    limit_reached: bool,
}

impl EventLog {
    /// Creates an empty log with the given limits.
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        Self {
            events: Vec::new(),
            config,
            next_id: 0,
            limit_reached: false,
        }
    }

    /// Creates an empty log wrapped for sharing.
    #[must_use]
    pub fn shared(config: LogConfig) -> SharedLog {
        Rc::new(RefCell::new(Self::new(config)))
    }

    /// Appends an event.
    ///
    /// Returns the assigned id, or `None` if the event was dropped because
    /// the log is full. The append that fills the last slot stores the limit
    /// marker instead of its own event.
    pub fn append(
        &mut self,
        kind: EventKind,
        message: impl Into<String>,
        payload: Option<LogValue>,
    ) -> Option<u64> {
        if self.limit_reached || self.config.max_events == 0 {
            return None;
        }

        if self.events.len() + 1 >= self.config.max_events {
            tracing::warn!(max_events = self.config.max_events, "event log limit reached");
            self.limit_reached = true;
            self.push(EventKind::Warning, LIMIT_REACHED_MESSAGE.to_string(), None);
            return None;
        }

        let message = truncate_chars(message.into(), self.config.max_message_chars);
        let payload = payload.map(|p| self.bound_payload(p));
        Some(self.push(kind, message, payload))
    }

    /// Appends an info event without payload.
    pub fn info(&mut self, message: impl Into<String>) -> Option<u64> {
        self.append(EventKind::Info, message, None)
    }

    /// Appends a success event without payload.
    pub fn success(&mut self, message: impl Into<String>) -> Option<u64> {
        self.append(EventKind::Success, message, None)
    }

    /// Appends a warning event without payload.
    pub fn warning(&mut self, message: impl Into<String>) -> Option<u64> {
        self.append(EventKind::Warning, message, None)
    }

    /// Appends an error event without payload.
    pub fn error(&mut self, message: impl Into<String>) -> Option<u64> {
        self.append(EventKind::Error, message, None)
    }

    /// Returns every stored event in append order.
    #[must_use]
    pub fn all(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    /// Removes every event and re-arms the limit marker.
    ///
    /// Ids keep increasing across clears.
    pub fn clear(&mut self) {
        self.events.clear();
        self.limit_reached = false;
    }

    /// Returns the number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns an iterator over stored events.
    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticEvent> {
        self.events.iter()
    }

    /// Returns events of one kind, in order.
    #[must_use]
    pub fn by_kind(&self, kind: EventKind) -> Vec<&DiagnosticEvent> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }

    /// Returns events appended at or after `timestamp_ms`.
    #[must_use]
    pub fn since(&self, timestamp_ms: u64) -> Vec<&DiagnosticEvent> {
        self.events
            .iter()
            .filter(|e| e.timestamp_ms >= timestamp_ms)
            .collect()
    }

    /// Returns true once the limit marker has been stored.
    #[must_use]
    pub const fn is_limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Returns the active limits.
    #[must_use]
    pub const fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Changes the event cap.
    ///
    /// Existing events are kept even if they exceed the new cap; the next
    /// append then stores the limit marker.
    pub fn set_max_events(&mut self, max_events: usize) {
        self.config.max_events = max_events;
    }

    /// Returns statistics about the log.
    #[must_use]
    pub fn stats(&self) -> LogStats {
        let mut kind_counts = HashMap::new();
        for event in &self.events {
            *kind_counts.entry(event.kind).or_insert(0) += 1;
        }

        LogStats {
            event_count: self.events.len(),
            max_events: self.config.max_events,
            limit_reached: self.limit_reached,
            kind_counts,
        }
    }

    fn push(&mut self, kind: EventKind, message: String, payload: Option<LogValue>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(DiagnosticEvent {
            id,
            kind,
            message,
            payload,
            timestamp_ms: now_ms(),
        });
        id
    }

    fn bound_payload(&self, payload: LogValue) -> LogValue {
        let size = serde_json::to_vec(&payload).map_or(usize::MAX, |bytes| bytes.len());
        if size > self.config.max_payload_bytes {
            tracing::debug!(size, "payload replaced by size marker");
            LogValue::map([("message", LogValue::from(PAYLOAD_TOO_LARGE_MESSAGE))])
        } else {
            payload
        }
    }
}

// =============================================================================
// Log Statistics
// =============================================================================

/// Statistics about an event log.
#[derive(Clone, Debug)]
pub struct LogStats {
    /// Number of stored events.
    pub event_count: usize,
    /// Configured cap.
    pub max_events: usize,
    /// Whether the limit marker has been stored.
    pub limit_reached: bool,
    /// Count of each event kind.
    pub kind_counts: HashMap<EventKind, usize>,
}

impl LogStats {
    /// Returns the number of events of `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.kind_counts.get(&kind).copied().unwrap_or(0)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn truncate_chars(mut s: String, max_chars: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
    s
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
