//! Extension-point tracer.
//!
//! The tracer subscribes one observer to every hook point in its
//! [`HookCatalog`] and records each invocation into the shared event log.
//! Filters always get their value back unchanged; the tracer only watches.
//!
//! The tracer has two states, inactive and active. [`HookTracer::start`] and
//! [`HookTracer::stop`] are both idempotent, and `stop` removes exactly the
//! subscriptions `start` added and nothing else.

mod catalog;

pub use catalog::{HookCatalog, SMART_COUPONS_ORIGIN};

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use cartprobe_foundation::{HookObserver, HookPoint, HookRegistry, Value};
use serde::Deserialize;

use crate::log::{EventKind, SharedLog};
use crate::sanitize::{LogValue, Marker, Sanitizer};

/// Subscription priority that runs after ordinary subscribers.
pub const DEFAULT_PRIORITY: i32 = 9999;

// =============================================================================
// Tracer Configuration
// =============================================================================

/// Configuration for the hook tracer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Priority used for every subscription.
    pub priority: i32,
    /// Hook points to observe.
    pub catalog: HookCatalog,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            catalog: HookCatalog::woocommerce(),
        }
    }
}

impl TracerConfig {
    /// Creates a configuration observing the WooCommerce catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the subscription priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder method to replace the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: HookCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}

// =============================================================================
// Trace Observer
// =============================================================================

/// Turns one invocation's arguments (and filter value) into a log payload.
type CaptureFn = fn(&Sanitizer, &[Value], Option<&Value>) -> LogValue;

fn capture_arguments(sanitizer: &Sanitizer, args: &[Value], value: Option<&Value>) -> LogValue {
    let mut entries = vec![("args", sanitizer.sanitize(&Value::List(args.to_vec())))];
    if let Some(value) = value {
        entries.push(("return", sanitizer.sanitize(value)));
    }
    LogValue::map(entries)
}

/// The callback registered with the hook registry.
struct TraceObserver {
    log: SharedLog,
    sanitizer: Sanitizer,
    active: Cell<bool>,
    capture: CaptureFn,
}

impl TraceObserver {
    fn record(&self, kind: EventKind, hook: &str, args: &[Value], value: Option<&Value>) {
        let label = match kind {
            EventKind::HookFilter => "Filter",
            _ => "Action",
        };

        let captured = catch_unwind(AssertUnwindSafe(|| {
            (self.capture)(&self.sanitizer, args, value)
        }));

        let (message, payload) = match captured {
            Ok(payload) => (format!("{label}: {hook}"), payload),
            Err(_) => {
                tracing::warn!(hook, "hook arguments could not be captured");
                (
                    format!("{label}: {hook} (arguments could not be captured)"),
                    Marker::Unavailable.into(),
                )
            }
        };

        // A hook fired from inside another log borrow is dropped, not fatal.
        match self.log.try_borrow_mut() {
            Ok(mut log) => {
                log.append(kind, message, Some(payload));
            }
            Err(_) => tracing::debug!(hook, "event log busy; hook event dropped"),
        }
    }
}

impl HookObserver for TraceObserver {
    fn on_filter(&self, hook: &str, value: Value, args: &[Value]) -> Value {
        if self.active.get() {
            self.record(EventKind::HookFilter, hook, args, Some(&value));
        }
        value
    }

    fn on_action(&self, hook: &str, args: &[Value]) {
        if self.active.get() {
            self.record(EventKind::HookAction, hook, args, None);
        }
    }
}

// =============================================================================
// Hook Tracer
// =============================================================================

/// One subscription the tracer added to the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    /// The hook point subscribed to.
    pub point: HookPoint,
    /// The priority it was subscribed at.
    pub priority: i32,
}

/// Attaches a recording observer to hook points for the duration of a run.
pub struct HookTracer {
    config: TracerConfig,
    observer: Rc<TraceObserver>,
    excluded_origins: Vec<String>,
    subscriptions: Vec<Subscription>,
}

impl HookTracer {
    /// Creates an inactive tracer that records into `log`.
    #[must_use]
    pub fn new(config: TracerConfig, sanitizer: Sanitizer, log: SharedLog) -> Self {
        Self {
            config,
            observer: Rc::new(TraceObserver {
                log,
                sanitizer,
                active: Cell::new(false),
                capture: capture_arguments,
            }),
            excluded_origins: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Returns true while subscriptions are in place.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.observer.active.get()
    }

    /// Returns the subscriptions currently held.
    #[must_use]
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Skips hook points declared by these origins on the next `start`.
    ///
    /// Used when an extension is being kept out of a run; observing hooks
    /// it declares would be meaningless.
    pub fn exclude_origins(&mut self, origins: impl IntoIterator<Item = String>) {
        self.excluded_origins = origins.into_iter().collect();
    }

    /// Subscribes to every catalog point not declared by an excluded origin.
    ///
    /// Does nothing if already active.
    pub fn start(&mut self, registry: &mut dyn HookRegistry) {
        if self.is_active() {
            return;
        }

        let handle = self.handle();
        let priority = self.config.priority;
        for point in self.config.catalog.iter() {
            if self.excluded_origins.iter().any(|o| *o == point.origin) {
                continue;
            }
            registry.attach(point, Rc::clone(&handle), priority);
            self.subscriptions.push(Subscription {
                point: point.clone(),
                priority,
            });
        }

        self.observer.active.set(true);
        let count = self.subscriptions.len();
        tracing::debug!(hooks = count, "hook tracking started");
        self.log_info(format!("Hook tracking started ({count} hooks)."));
    }

    /// Removes every subscription `start` added.
    ///
    /// Does nothing if inactive. Recording stops before detaching, so hooks
    /// fired during teardown are not logged.
    pub fn stop(&mut self, registry: &mut dyn HookRegistry) {
        if !self.is_active() {
            return;
        }
        self.observer.active.set(false);

        let handle = self.handle();
        for sub in self.subscriptions.drain(..) {
            if !registry.detach(&sub.point, &handle, sub.priority) {
                tracing::debug!(hook = %sub.point.name, "subscription already removed");
            }
        }

        tracing::debug!("hook tracking stopped");
        self.log_info("Hook tracking stopped.");
    }

    /// Records a filter invocation directly and returns `value` unchanged.
    pub fn observe_filter(&self, hook: &str, value: Value, args: &[Value]) -> Value {
        self.observer.on_filter(hook, value, args)
    }

    /// Records an action invocation directly.
    pub fn observe_action(&self, hook: &str, args: &[Value]) {
        self.observer.on_action(hook, args);
    }

    fn handle(&self) -> Rc<dyn HookObserver> {
        Rc::clone(&self.observer) as Rc<dyn HookObserver>
    }

    fn log_info(&self, message: impl Into<String>) {
        if let Ok(mut log) = self.observer.log.try_borrow_mut() {
            log.info(message);
        }
    }
}

impl std::fmt::Debug for HookTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookTracer")
            .field("active", &self.is_active())
            .field("subscriptions", &self.subscriptions.len())
            .field("excluded_origins", &self.excluded_origins)
            .finish_non_exhaustive()
    }
}
