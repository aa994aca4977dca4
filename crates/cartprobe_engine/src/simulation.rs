//! The simulation orchestrator.
//!
//! One run walks through six phases:
//!
//! 1. **Backup**: capture a [`CartSnapshot`]. Failure ends the run.
//! 2. **Isolate**: empty the cart and reset scratch session keys.
//! 3. **Configure**: switch user, add the requested products, fall back to a
//!    placeholder product when the cart is still empty.
//! 4. **Trace + Execute**: start the hook tracer, apply the code, stop the
//!    tracer.
//! 5. **Restore**: put the snapshot back.
//! 6. **Report**: return the outcome with the run's events.
//!
//! Once Backup succeeds, Restore always runs, whatever happened in between.
//! Panics raised by engine or extension code are contained and reported as
//! faults.

use std::cell::Ref;
use std::rc::Rc;

use cartprobe_debug::{
    DiagnosticEvent, EventKind, EventLog, HookTracer, LogValue, Sanitizer, SharedLog,
};
use cartprobe_foundation::{
    ApplyOutcome, ApplyPath, CartItem, EngineFault, Error, FaultKind, Money, ProductId,
    RuntimeWarning, Storefront, UserId, VariantId,
};
use serde::{Deserialize, Serialize};

use crate::classify::{ErrorClass, blamed_extension, classify, contain};
use crate::config::SimulatorConfig;
use crate::select::UnitPicker;
use crate::snapshot::{CartSnapshot, SnapshotManager};

// =============================================================================
// Request
// =============================================================================

/// One product to put in the simulated cart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ProductSelection {
    /// Requested product (a parent, for composite products).
    pub product: ProductId,
    /// Specific variant, for variable products.
    #[serde(default)]
    pub variant: Option<VariantId>,
    /// Quantity; zero is treated as one.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl ProductSelection {
    /// Selects one unit of `product`.
    #[must_use]
    pub const fn new(product: ProductId) -> Self {
        Self {
            product,
            variant: None,
            quantity: 1,
        }
    }

    /// Builder method to request a specific variant.
    #[must_use]
    pub const fn with_variant(mut self, variant: VariantId) -> Self {
        self.variant = Some(variant);
        self
    }

    /// Builder method to set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

/// What to simulate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationRequest {
    /// Discount code to apply.
    pub code: String,
    /// Products to put in the cart first.
    #[serde(default)]
    pub products: Vec<ProductSelection>,
    /// User to act as; absent or `0` means guest.
    #[serde(default)]
    pub user: Option<UserId>,
    /// Overrides the configured skip default when set.
    #[serde(default)]
    pub skip_incompatible: Option<bool>,
}

impl SimulationRequest {
    /// Creates a request for `code` with an empty product list, as a guest.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// Builder method to add a product.
    #[must_use]
    pub fn with_product(mut self, selection: ProductSelection) -> Self {
        self.products.push(selection);
        self
    }

    /// Builder method to act as a user.
    #[must_use]
    pub const fn with_user(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    /// Builder method to set the skip flag for this run.
    #[must_use]
    pub const fn with_skip_incompatible(mut self, skip: bool) -> Self {
        self.skip_incompatible = Some(skip);
        self
    }

    /// The code with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error when nothing is left after trimming.
    pub fn trimmed_code(&self) -> cartprobe_foundation::Result<&str> {
        let code = self.code.trim();
        if code.is_empty() {
            return Err(Error::invalid_request("no coupon code given"));
        }
        Ok(code)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SimulationOutcome {
    /// The code was applied.
    Applied {
        /// Cart total after the discount.
        total: Money,
        /// Discount amount.
        discount: Money,
    },
    /// The engine declined the code.
    Rejected {
        /// Reason given by the engine.
        reason: String,
    },
    /// A known-incompatible extension failed, so the code could not be tested.
    KnownIncompatibility {
        /// Extension held responsible.
        extension: Option<String>,
        /// The fault it raised.
        fault: EngineFault,
    },
    /// The engine or an extension failed.
    Faulted {
        /// The fault raised.
        fault: EngineFault,
    },
    /// The run stopped before the code was tried.
    Fatal {
        /// Why.
        reason: String,
    },
}

impl SimulationOutcome {
    /// Returns true if the code was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Returns true if the run stopped before the code was tried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Failure category, or `None` if the code was applied.
    #[must_use]
    pub const fn error_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Applied { .. } => None,
            Self::Rejected { .. } => Some(ErrorClass::Rejected),
            Self::KnownIncompatibility { .. } => Some(ErrorClass::KnownIncompatibility),
            Self::Faulted { .. } => Some(ErrorClass::Exception),
            Self::Fatal { .. } => Some(ErrorClass::Fatal),
        }
    }
}

/// Outcome of a run together with every event it logged.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// How the run ended.
    pub outcome: SimulationOutcome,
    /// Events in append order.
    pub events: Vec<DiagnosticEvent>,
}

impl SimulationResult {
    /// Returns true if the code was applied.
    #[must_use]
    pub const fn applied(&self) -> bool {
        self.outcome.is_applied()
    }

    /// Failure category, or `None` if the code was applied.
    #[must_use]
    pub const fn error_class(&self) -> Option<ErrorClass> {
        self.outcome.error_class()
    }

    /// Events of one kind.
    #[must_use]
    pub fn events_of(&self, kind: EventKind) -> Vec<&DiagnosticEvent> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }
}

// =============================================================================
// Simulator
// =============================================================================

/// Runs discount code simulations against a storefront.
///
/// A simulator owns the event log and the hook tracer, and caches the
/// placeholder product across runs. Runs must not overlap on one
/// storefront; `run` takes the storefront mutably for its whole duration.
pub struct Simulator {
    config: SimulatorConfig,
    log: SharedLog,
    sanitizer: Sanitizer,
    tracer: HookTracer,
    snapshots: SnapshotManager,
    picker: UnitPicker,
    placeholder: Option<ProductId>,
}

impl Simulator {
    /// Creates a simulator.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let log = EventLog::shared(config.log.clone());
        let sanitizer = Sanitizer::new(config.sanitize.clone());
        let tracer = HookTracer::new(config.tracer.clone(), sanitizer.clone(), Rc::clone(&log));
        let snapshots = SnapshotManager::new(config.scratch_keys.clone());
        let picker = UnitPicker::new(config.selection);
        Self {
            config,
            log,
            sanitizer,
            tracer,
            snapshots,
            picker,
            placeholder: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Borrows the event log of the latest run.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a hook observer while a run is logging.
    #[must_use]
    pub fn log(&self) -> Ref<'_, EventLog> {
        self.log.borrow()
    }

    /// Discards the logged events.
    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Returns the hook tracer.
    #[must_use]
    pub const fn tracer(&self) -> &HookTracer {
        &self.tracer
    }

    /// The cached placeholder product, once one has been created.
    #[must_use]
    pub const fn placeholder(&self) -> Option<ProductId> {
        self.placeholder
    }

    /// Runs one simulation.
    ///
    /// Never fails and never panics on behalf of engine code: every failure
    /// is part of the returned outcome and log. The storefront is restored
    /// to its captured state before this returns, except when the capture
    /// itself failed.
    pub fn run(&mut self, store: &mut dyn Storefront, request: &SimulationRequest) -> SimulationResult {
        self.clear_log();
        tracing::info!(code = %request.code, "simulation started");

        let code = match request.trimmed_code() {
            Ok(code) => code,
            Err(e) => {
                self.note(EventKind::Error, "Please enter a coupon code.");
                return self.finish(SimulationOutcome::Fatal {
                    reason: e.to_string(),
                });
            }
        };
        self.note(EventKind::Info, format!("Starting coupon test for: \"{code}\""));

        let captured = contain(|| self.snapshots.capture(store))
            .unwrap_or_else(|fault| Err(Error::engine(fault)));
        let snapshot = match captured {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.note(EventKind::Error, format!("Failed to backup cart state: {e}"));
                return self.finish(SimulationOutcome::Fatal {
                    reason: format!("cart state could not be backed up: {e}"),
                });
            }
        };
        tracing::debug!(items = snapshot.items().len(), "cart state captured");

        let outcome = self.isolated(store, code, request);

        if let Err(fault) = contain(|| self.tracer.stop(store.hooks())) {
            tracing::warn!(%fault, "panic while detaching hook observers");
            self.note(EventKind::Error, format!("Failed to stop hook tracking: {fault}"));
        }
        self.restore(store, &snapshot);

        tracing::info!(code, applied = outcome.is_applied(), "simulation finished");
        self.finish(outcome)
    }

    // -------------------------------------------------------------------------
    // Phases
    // -------------------------------------------------------------------------

    /// Everything between backup and restore.
    fn isolated(
        &mut self,
        store: &mut dyn Storefront,
        code: &str,
        request: &SimulationRequest,
    ) -> SimulationOutcome {
        match contain(|| self.configure(store, code, request)) {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return SimulationOutcome::Fatal { reason },
            Err(fault) => {
                tracing::warn!(%fault, "panic while preparing the cart");
                self.note(EventKind::Error, format!("Failed to prepare the cart: {fault}"));
                return SimulationOutcome::Fatal {
                    reason: fault.to_string(),
                };
            }
        }

        let skip = request
            .skip_incompatible
            .unwrap_or(self.config.skip_incompatible_default);
        match contain(|| self.execute(store, code, skip)) {
            Ok(outcome) => outcome,
            Err(fault) => {
                tracing::warn!(%fault, "panic while running the coupon test");
                self.fault_outcome(fault)
            }
        }
    }

    /// Isolate and configure. An `Err` carries the fatal reason.
    fn configure(
        &mut self,
        store: &mut dyn Storefront,
        code: &str,
        request: &SimulationRequest,
    ) -> Result<(), String> {
        if let Err(e) = self.snapshots.reset(store) {
            self.note(EventKind::Error, format!("Failed to reset the cart for testing: {e}"));
            return Err(format!("cart could not be isolated: {e}"));
        }

        self.report_known_extensions(store);
        self.switch_user(store, request.user);
        self.add_products(store, request);
        self.ensure_not_empty(store)?;

        if let Err(e) = store.cart().calculate_totals() {
            self.note(EventKind::Warning, format!("Could not calculate cart totals: {e}"));
        }
        self.describe_cart(store);
        self.describe_code(store, code);
        Ok(())
    }

    fn execute(&mut self, store: &mut dyn Storefront, code: &str, skip: bool) -> SimulationOutcome {
        let skipped = if skip {
            self.config.incompatibility.origins.clone()
        } else {
            Vec::new()
        };
        if skip {
            self.note(
                EventKind::Warning,
                format!(
                    "Skipping known-incompatible extensions for this test: {}. \
                     Results may differ from a real checkout.",
                    skipped.join(", ")
                ),
            );
        }
        self.tracer.exclude_origins(skipped.iter().cloned());

        let stale = store.cart().take_warnings();
        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "discarded warnings raised before apply");
        }

        self.tracer.start(store.hooks());
        self.note(EventKind::Info, format!("Attempting to apply coupon: \"{code}\""));

        let path = if skip {
            ApplyPath::Narrow { skipped: &skipped }
        } else {
            ApplyPath::Full
        };
        let result = contain(|| store.cart().apply_code(code, path)).unwrap_or_else(|fault| {
            tracing::warn!(%fault, "panic while applying coupon");
            Err(Error::engine(fault))
        });
        let warnings = store.cart().take_warnings();

        self.tracer.stop(store.hooks());
        self.interpret(store, code, result, warnings)
    }

    fn interpret(
        &mut self,
        store: &mut dyn Storefront,
        code: &str,
        result: cartprobe_foundation::Result<ApplyOutcome>,
        warnings: Vec<RuntimeWarning>,
    ) -> SimulationOutcome {
        let escalated = self.escalate_warnings(warnings);

        let applied = match result {
            Ok(applied) => applied,
            Err(err) => {
                let fault = err
                    .as_fault()
                    .cloned()
                    .unwrap_or_else(|| EngineFault::new(FaultKind::Runtime, err.to_string()));
                return self.fault_outcome(fault);
            }
        };
        if let Some(fault) = escalated {
            return self.fault_outcome(fault);
        }

        match applied {
            ApplyOutcome::Applied => self.applied_outcome(store),
            ApplyOutcome::Rejected { reason, notices } => {
                for notice in &notices {
                    self.note(EventKind::Warning, format!("Notice: {notice}"));
                }
                self.note(
                    EventKind::Error,
                    format!("Coupon \"{code}\" could not be applied: {reason}"),
                );
                SimulationOutcome::Rejected { reason }
            }
        }
    }

    fn restore(&mut self, store: &mut dyn Storefront, snapshot: &CartSnapshot) {
        let report = self.snapshots.restore(store, snapshot, &self.log);
        if !report.is_clean() {
            tracing::warn!(failures = report.failures.len(), "cart state only partly restored");
        }
    }

    fn finish(&self, outcome: SimulationOutcome) -> SimulationResult {
        SimulationResult {
            outcome,
            events: self.log.borrow().all().to_vec(),
        }
    }

    // -------------------------------------------------------------------------
    // Configure Steps
    // -------------------------------------------------------------------------

    fn report_known_extensions(&self, store: &mut dyn Storefront) {
        for ext in store.cart().active_extensions() {
            if self.config.incompatibility.matching_origin(&ext.name).is_some() {
                let version = ext.version.as_deref().unwrap_or("unknown version");
                self.note(
                    EventKind::Info,
                    format!("Known-incompatible extension detected: {} ({version})", ext.name),
                );
            }
        }
    }

    fn switch_user(&self, store: &mut dyn Storefront, requested: Option<UserId>) {
        if let Some(user) = requested.filter(|u| !u.is_anonymous()) {
            if !store.users().user_exists(user) {
                self.note(
                    EventKind::Warning,
                    format!("User ID {user} does not exist. Falling back to a guest."),
                );
            } else if let Err(e) = store.users().set_current_user(user) {
                self.note(EventKind::Warning, format!("Could not switch to user ID {user}: {e}"));
            } else {
                self.note(EventKind::Info, format!("Simulating user ID: {user}"));
                return;
            }
        }

        if let Err(e) = store.users().set_current_user(UserId::ANONYMOUS) {
            self.note(EventKind::Warning, format!("Could not switch to a guest: {e}"));
        }
        self.note(EventKind::Info, "Simulating guest user.");
    }

    fn add_products(&self, store: &mut dyn Storefront, request: &SimulationRequest) {
        for selection in &request.products {
            let line = match self.picker.resolve(selection, store.catalog()) {
                Ok(line) => line,
                Err(e) => {
                    self.note(EventKind::Warning, e.to_string());
                    continue;
                }
            };
            if let Some(picked) = &line.picked {
                self.note(EventKind::Info, picked.clone());
            }
            match store.cart().add_item(&line.item) {
                Ok(()) => self.note(
                    EventKind::Info,
                    format!("Added product to cart: {} (ID: {})", line.name, line.item.product),
                ),
                Err(e) => self.note(
                    EventKind::Warning,
                    format!("Failed to add product ID {} to cart: {e}", selection.product),
                ),
            }
        }
    }

    /// Adds the placeholder product if nothing else made it into the cart.
    fn ensure_not_empty(&mut self, store: &mut dyn Storefront) -> Result<(), String> {
        match store.cart().items() {
            Ok(items) if !items.is_empty() => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                self.note(EventKind::Error, format!("Could not read cart contents: {e}"));
                return Err(format!("cart contents could not be read: {e}"));
            }
        }

        let cached = self
            .placeholder
            .filter(|id| store.catalog().product(*id).is_some());
        let id = match cached {
            Some(id) => id,
            None => match store.catalog().create_placeholder(&self.config.placeholder) {
                Ok(id) => {
                    self.placeholder = Some(id);
                    tracing::debug!(%id, "placeholder product created");
                    id
                }
                Err(e) => {
                    self.note(
                        EventKind::Error,
                        format!("Could not create or find a placeholder product for testing: {e}"),
                    );
                    return Err("cart is empty and no placeholder product is available".to_string());
                }
            },
        };

        match store.cart().add_item(&CartItem::new(id, 1)) {
            Ok(()) => {
                self.note(
                    EventKind::Info,
                    format!("Cart was empty, added placeholder product (ID: {id}) for testing general coupons."),
                );
                Ok(())
            }
            Err(e) => {
                self.note(
                    EventKind::Error,
                    format!("Could not add placeholder product (ID: {id}) to cart: {e}"),
                );
                Err("cart is empty and the placeholder product could not be added".to_string())
            }
        }
    }

    fn describe_cart(&self, store: &mut dyn Storefront) {
        let items = match store.cart().items() {
            Ok(items) => items,
            Err(e) => {
                self.note(EventKind::Warning, format!("Could not read cart contents: {e}"));
                return;
            }
        };

        let lines = items
            .iter()
            .map(|item| {
                let info = store.catalog().product(item.product);
                let name = info.as_ref().map_or("(unknown)", |p| p.name.as_str());
                let price = info.as_ref().map_or(Money::ZERO, |p| p.price);
                let data = cartprobe_foundation::Value::map(
                    item.custom_data.iter().map(|(k, v)| (k.as_str(), v.clone())),
                );
                LogValue::map([
                    ("product_name", LogValue::from(name)),
                    ("product_id", LogValue::from(id_value(item.product.0))),
                    (
                        "variant_id",
                        item.variant.map_or(LogValue::Null, |v| LogValue::from(id_value(v.0))),
                    ),
                    ("quantity", LogValue::from(i64::from(item.quantity))),
                    ("price", LogValue::from(price.to_string())),
                    ("line_subtotal", LogValue::from(price.times(item.quantity).to_string())),
                    ("custom_data", self.sanitizer.sanitize(&data)),
                ])
            })
            .collect();
        self.note_with(
            EventKind::Info,
            "Cart Contents Details (Before Coupon)",
            LogValue::List(lines),
        );

        let total = store.cart().total();
        self.note(EventKind::Info, format!("Cart Total before applying coupon: {total}"));
    }

    fn describe_code(&self, store: &mut dyn Storefront, code: &str) {
        match store.cart().describe_code(code) {
            Some(details) => self.note_with(
                EventKind::Info,
                format!("Details for coupon \"{code}\""),
                self.sanitizer.sanitize(&details),
            ),
            None => self.note(
                EventKind::Warning,
                format!("Could not load coupon with code \"{code}\". It may not exist."),
            ),
        }
    }

    // -------------------------------------------------------------------------
    // Outcome Steps
    // -------------------------------------------------------------------------

    /// Logs ordinary warnings and returns the first one that comes from a
    /// known-incompatible extension, as a fault.
    fn escalate_warnings(&self, warnings: Vec<RuntimeWarning>) -> Option<EngineFault> {
        let mut escalated = None;
        for warning in warnings {
            let known = warning
                .origin
                .as_deref()
                .is_some_and(|o| self.config.incompatibility.matching_origin(o).is_some());
            if known {
                if escalated.is_none() {
                    let mut fault = EngineFault::new(FaultKind::Warning, warning.message);
                    fault.origin = warning.origin;
                    escalated = Some(fault);
                }
            } else {
                self.note(EventKind::Warning, format!("Runtime warning: {}", warning.message));
            }
        }
        escalated
    }

    fn fault_outcome(&self, fault: EngineFault) -> SimulationOutcome {
        let rules = &self.config.incompatibility;
        match classify(&fault, rules) {
            ErrorClass::KnownIncompatibility => {
                let extension = blamed_extension(&fault, rules);
                let name = extension.as_deref().unwrap_or("an extension");
                self.note(
                    EventKind::Error,
                    format!("Known compatibility error in {name}: {}", fault.message),
                );
                self.note(
                    EventKind::Warning,
                    format!(
                        "This is a known issue with {name}. The coupon may be valid but cannot \
                         be properly tested here; retry with known-incompatible extensions skipped."
                    ),
                );
                SimulationOutcome::KnownIncompatibility { extension, fault }
            }
            _ => {
                self.note(EventKind::Error, format!("Exception during coupon test: {fault}"));
                SimulationOutcome::Faulted { fault }
            }
        }
    }

    fn applied_outcome(&self, store: &mut dyn Storefront) -> SimulationOutcome {
        if let Err(e) = store.cart().calculate_totals() {
            self.note(EventKind::Warning, format!("Could not recalculate cart totals: {e}"));
        }
        let total = store.cart().total();
        let discount = store.cart().discount_total();

        self.note(EventKind::Success, "Coupon applied successfully!");
        self.note(EventKind::Success, format!("New Cart Total: {total}"));
        self.note(EventKind::Success, format!("Discount Amount: {discount}"));
        SimulationOutcome::Applied { total, discount }
    }

    // -------------------------------------------------------------------------
    // Logging
    // -------------------------------------------------------------------------

    fn note(&self, kind: EventKind, message: impl Into<String>) {
        self.log.borrow_mut().append(kind, message, None);
    }

    fn note_with(&self, kind: EventKind, message: impl Into<String>, payload: LogValue) {
        self.log.borrow_mut().append(kind, message, Some(payload));
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("config", &self.config)
            .field("tracer", &self.tracer)
            .field("placeholder", &self.placeholder)
            .finish_non_exhaustive()
    }
}

fn id_value(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}
