//! Diagnostics for cartprobe simulations.
//!
//! This crate provides:
//! - [`EventLog`] - Ordered, capped, truncating diagnostic event store
//! - [`Sanitizer`] - Bounded conversion of value graphs into [`LogValue`]s
//! - [`HookTracer`] - Records every invocation of cataloged hook points
//! - [`HumanFormatter`], [`JsonFormatter`] - Event log output

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod log;
pub mod sanitize;
pub mod tracer;

pub use config::{LogConfig, SanitizeConfig};
pub use log::{
    DiagnosticEvent, EventFormatter, EventKind, EventLog, HumanFormatter, JsonFormatter,
    LIMIT_REACHED_MESSAGE, LogStats, PAYLOAD_TOO_LARGE_MESSAGE, SharedLog,
};
pub use sanitize::{LogValue, Marker, Sanitizer, SeenSet};
pub use tracer::{
    DEFAULT_PRIORITY, HookCatalog, HookTracer, SMART_COUPONS_ORIGIN, Subscription, TracerConfig,
};
