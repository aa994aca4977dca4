//! Collaborator ports implemented by the surrounding system.
//!
//! The simulation core never owns the cart, session, user context, catalog,
//! or hook registry. It borrows them for the duration of one run through a
//! [`Storefront`]. Because a run takes `&mut dyn Storefront`, two runs can
//! never overlap on the same resource.

use std::collections::BTreeMap;

use crate::cart::{ApplyOutcome, ApplyPath, CartItem, ExtensionInfo, RuntimeWarning};
use crate::catalog::{PlaceholderSpec, ProductInfo};
use crate::error::Result;
use crate::hook::HookRegistry;
use crate::ids::{ProductId, UserId};
use crate::money::Money;
use crate::value::Value;

/// The cart/discount engine.
pub trait CartEngine {
    /// Returns the current cart lines in cart order.
    ///
    /// Fails if the cart is not initialized.
    fn items(&self) -> Result<Vec<CartItem>>;

    /// Removes every line and every applied code.
    fn empty_cart(&mut self) -> Result<()>;

    /// Adds a line through the engine's normal validation path.
    fn add_item(&mut self, item: &CartItem) -> Result<()>;

    /// Returns the applied discount codes in application order.
    fn applied_codes(&self) -> Result<Vec<String>>;

    /// Applies a discount code.
    ///
    /// `Ok` covers both acceptance and an ordinary rejection; `Err` means the
    /// engine or one of its extensions faulted.
    fn apply_code(&mut self, code: &str, path: ApplyPath<'_>) -> Result<ApplyOutcome>;

    /// Recomputes cart totals.
    fn calculate_totals(&mut self) -> Result<()>;

    /// Cart grand total as of the last calculation.
    fn total(&self) -> Money;

    /// Total discount as of the last calculation.
    fn discount_total(&self) -> Money;

    /// Returns the engine's view of a discount code for diagnostics, or
    /// `None` if the code does not exist.
    fn describe_code(&self, code: &str) -> Option<Value>;

    /// Drains runtime warnings emitted since the last call.
    fn take_warnings(&mut self) -> Vec<RuntimeWarning>;

    /// Lists extensions loaded into the engine.
    fn active_extensions(&self) -> Vec<ExtensionInfo>;

    /// Returns true if the cart has no lines.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.items()?.is_empty())
    }
}

/// The per-customer session key/value store.
pub trait SessionStore {
    /// Returns every session entry.
    ///
    /// Fails if the session is not initialized.
    fn get_all(&self) -> Result<BTreeMap<String, Value>>;

    /// Returns the value for `key`, or `default` when absent.
    fn get(&self, key: &str, default: Value) -> Value;

    /// Sets a session entry.
    fn set(&mut self, key: &str, value: Value) -> Result<()>;

    /// Removes a session entry. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// The acting-user identity.
pub trait UserContext {
    /// Returns the acting user; [`UserId::ANONYMOUS`] for guests.
    fn current_user(&self) -> Result<UserId>;

    /// Switches the acting user.
    fn set_current_user(&mut self, user: UserId) -> Result<()>;

    /// Returns true if `user` resolves to a known account.
    fn user_exists(&self, user: UserId) -> bool;
}

/// Product lookup and placeholder creation.
pub trait ProductCatalog {
    /// Resolves a product reference.
    fn product(&self, id: ProductId) -> Option<ProductInfo>;

    /// Creates a hidden, purchasable placeholder product.
    fn create_placeholder(&mut self, spec: &PlaceholderSpec) -> Result<ProductId>;
}

/// Handle to the whole mutable resource a simulation runs against.
pub trait Storefront {
    /// The cart/discount engine.
    fn cart(&mut self) -> &mut dyn CartEngine;

    /// The session store.
    fn session(&mut self) -> &mut dyn SessionStore;

    /// The user context.
    fn users(&mut self) -> &mut dyn UserContext;

    /// The product catalog.
    fn catalog(&mut self) -> &mut dyn ProductCatalog;

    /// The hook registry.
    fn hooks(&mut self) -> &mut dyn HookRegistry;
}
