//! Cart state snapshots.
//!
//! A [`CartSnapshot`] is an immutable copy of everything a run may disturb:
//! cart lines, applied codes, the session map and the acting user. Capture is
//! fail-fast, since a partial snapshot cannot be restored faithfully. Restore
//! is best-effort: each failure is logged and the remaining steps still run.

use cartprobe_debug::SharedLog;
use cartprobe_foundation::{
    ApplyOutcome, ApplyPath, CartItem, Error, ErrorContext, Result, Storefront, UserId, Value,
};
use im::{OrdMap, Vector};

use crate::classify::contain;
use crate::config::ScratchKey;

// =============================================================================
// Cart Snapshot
// =============================================================================

/// Point-in-time copy of the shared cart state.
#[derive(Clone, Debug, PartialEq)]
pub struct CartSnapshot {
    items: Vector<CartItem>,
    applied_codes: Vector<String>,
    session: OrdMap<String, Value>,
    user: UserId,
}

impl CartSnapshot {
    /// Cart lines in cart order.
    #[must_use]
    pub fn items(&self) -> &Vector<CartItem> {
        &self.items
    }

    /// Applied codes in application order.
    #[must_use]
    pub fn applied_codes(&self) -> &Vector<String> {
        &self.applied_codes
    }

    /// Session entries.
    #[must_use]
    pub fn session(&self) -> &OrdMap<String, Value> {
        &self.session
    }

    /// Acting user.
    #[must_use]
    pub const fn user(&self) -> UserId {
        self.user
    }

    /// Returns true if the cart held no lines and no codes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.applied_codes.is_empty()
    }
}

// =============================================================================
// Restore Report
// =============================================================================

/// What went wrong during a restore.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// One entry per failed step.
    pub failures: Vec<String>,
}

impl RestoreReport {
    /// Returns true if every step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// Snapshot Manager
// =============================================================================

/// Captures, isolates and restores cart state.
#[derive(Clone, Debug)]
pub struct SnapshotManager {
    scratch_keys: Vec<ScratchKey>,
}

impl SnapshotManager {
    /// Creates a manager that resets `scratch_keys` on isolation.
    #[must_use]
    pub fn new(scratch_keys: Vec<ScratchKey>) -> Self {
        Self { scratch_keys }
    }

    /// Returns the scratch keys reset on isolation.
    #[must_use]
    pub fn scratch_keys(&self) -> &[ScratchKey] {
        &self.scratch_keys
    }

    /// Reads the current state.
    ///
    /// # Errors
    ///
    /// Returns the first read failure, typically because the cart or session
    /// has not been initialized.
    pub fn capture(&self, store: &mut dyn Storefront) -> Result<CartSnapshot> {
        let items = store.cart().items().map_err(during("reading cart items"))?;
        let applied_codes = store
            .cart()
            .applied_codes()
            .map_err(during("reading applied codes"))?;
        let session = store.session().get_all().map_err(during("reading session"))?;
        let user = store
            .users()
            .current_user()
            .map_err(during("reading current user"))?;

        Ok(CartSnapshot {
            items: items.into_iter().collect(),
            applied_codes: applied_codes.into_iter().collect(),
            session: session.into_iter().collect(),
            user,
        })
    }

    /// Empties the cart and resets the scratch session keys.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the cart may be partly reset.
    pub fn reset(&self, store: &mut dyn Storefront) -> Result<()> {
        store.cart().empty_cart().map_err(during("emptying cart"))?;
        for scratch in &self.scratch_keys {
            store
                .session()
                .set(&scratch.key, scratch.reset.to_value())
                .map_err(during("resetting session scratch keys"))?;
        }
        Ok(())
    }

    /// Puts `snapshot` back.
    ///
    /// Never fails and never panics on behalf of engine code: each failed or
    /// panicking step is recorded as an error event in `log` and in the
    /// returned report, and restoration moves on to the next step.
    /// Applied codes are restored by applying them again, so a code the run
    /// used up may be declined.
    pub fn restore(
        &self,
        store: &mut dyn Storefront,
        snapshot: &CartSnapshot,
        log: &SharedLog,
    ) -> RestoreReport {
        let mut report = RestoreReport::default();
        let mut fail = |what: String, err: &dyn std::fmt::Display| {
            let message = format!("Failed to restore {what}: {err}");
            tracing::warn!(%message, "cart restore step failed");
            log.borrow_mut().error(message.clone());
            report.failures.push(message);
        };

        if let Err(e) = step(|| store.cart().empty_cart()) {
            fail("cart contents".to_string(), &e);
        }
        for item in &snapshot.items {
            if let Err(e) = step(|| store.cart().add_item(item)) {
                fail(format!("cart line for product ID {}", item.product), &e);
            }
        }

        for (key, value) in &snapshot.session {
            if let Err(e) = step(|| store.session().set(key, value.clone())) {
                fail(format!("session key \"{key}\""), &e);
            }
        }
        match step(|| store.session().get_all()) {
            Ok(current) => {
                for key in current.keys().filter(|k| !snapshot.session.contains_key(*k)) {
                    if let Err(e) = step(|| store.session().remove(key)) {
                        fail(format!("session key \"{key}\""), &e);
                    }
                }
            }
            Err(e) => fail("session".to_string(), &e),
        }

        if let Err(e) = step(|| store.users().set_current_user(snapshot.user)) {
            fail(format!("user ID {}", snapshot.user), &e);
        }

        for code in &snapshot.applied_codes {
            match step(|| store.cart().apply_code(code, ApplyPath::Full)) {
                Ok(ApplyOutcome::Applied) => {}
                Ok(ApplyOutcome::Rejected { reason, .. }) => {
                    fail(format!("coupon \"{code}\""), &reason);
                }
                Err(e) => fail(format!("coupon \"{code}\""), &e),
            }
        }
        match contain(|| store.cart().take_warnings()) {
            Ok(stray) if !stray.is_empty() => {
                tracing::debug!(count = stray.len(), "discarded warnings raised during restore");
            }
            Ok(_) => {}
            Err(fault) => fail("runtime warnings".to_string(), &fault),
        }

        if let Err(e) = step(|| store.cart().calculate_totals()) {
            fail("cart totals".to_string(), &e);
        }

        if report.is_clean() {
            log.borrow_mut().info("Cart state restored successfully.");
        }
        report
    }
}

/// Runs one restore step; a panic inside the engine becomes an engine error.
fn step<T>(op: impl FnOnce() -> Result<T>) -> Result<T> {
    contain(op).unwrap_or_else(|fault| Err(Error::engine(fault)))
}

fn during(operation: &'static str) -> impl Fn(Error) -> Error {
    move |e| e.with_context(ErrorContext::new().with_operation(operation))
}
