//! An in-memory storefront implementing every collaborator port.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use cartprobe_foundation::{
    ApplyOutcome, ApplyPath, CartEngine, CartItem, EngineFault, Error, ExtensionInfo, HookRegistry,
    Money, ObjectRef, PlaceholderSpec, ProductCatalog, ProductId, ProductInfo, ProductKind,
    Result, RuntimeWarning, SessionStore, Storefront, UserContext, UserId, Value,
};

use crate::bus::HookBus;

// =============================================================================
// Coupons
// =============================================================================

/// How a coupon computes its discount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discount {
    /// Percentage of the cart subtotal.
    Percent(u32),
    /// Fixed amount off the cart, capped at the subtotal.
    FixedCart(Money),
}

/// A coupon the store knows about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CouponRule {
    /// Code as customers type it; matched case-insensitively.
    pub code: String,
    /// Discount computation.
    pub discount: Discount,
    /// Maximum number of successful applications, if limited.
    pub usage_limit: Option<u32>,
}

impl CouponRule {
    /// A percentage coupon with no usage limit.
    #[must_use]
    pub fn percent(code: &str, percent: u32) -> Self {
        Self {
            code: code.to_lowercase(),
            discount: Discount::Percent(percent),
            usage_limit: None,
        }
    }

    /// A fixed-cart coupon with no usage limit.
    #[must_use]
    pub fn fixed(code: &str, amount: Money) -> Self {
        Self {
            code: code.to_lowercase(),
            discount: Discount::FixedCart(amount),
            usage_limit: None,
        }
    }

    /// Builder method to limit successful applications.
    #[must_use]
    pub const fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_object(&self, id: u64) -> ObjectRef {
        let (amount, kind) = match self.discount {
            Discount::Percent(p) => (f64::from(p), "percent"),
            Discount::FixedCart(m) => (m.minor() as f64 / 100.0, "fixed_cart"),
        };
        ObjectRef::coupon(id, &self.code, amount, kind)
    }
}

// =============================================================================
// Injected Behavior
// =============================================================================

/// A panic raised from inside `apply_code`.
#[derive(Clone, Debug)]
struct InjectedPanic {
    message: String,
    origin: Option<String>,
}

#[derive(Clone, Debug, Default)]
struct Injections {
    apply_faults: BTreeMap<String, EngineFault>,
    apply_panics: BTreeMap<String, InjectedPanic>,
    apply_warnings: BTreeMap<String, Vec<RuntimeWarning>>,
    failing_products: BTreeSet<ProductId>,
    placeholder_fails: bool,
    cart_reads_fail: bool,
}

/// Returns true if `origin` names an extension the caller asked to skip.
fn skipped(path: ApplyPath<'_>, origin: Option<&String>) -> bool {
    match (path, origin) {
        (ApplyPath::Narrow { skipped }, Some(origin)) => skipped.contains(origin),
        _ => false,
    }
}

// =============================================================================
// Store State
// =============================================================================

/// The observable state of a [`MemoryStore`], for before/after comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreState {
    /// Cart lines.
    pub items: Vec<CartItem>,
    /// Applied codes.
    pub applied: Vec<String>,
    /// Session entries; `None` when the session is not initialized.
    pub session: Option<BTreeMap<String, Value>>,
    /// Acting user.
    pub user: UserId,
}

// =============================================================================
// Memory Store
// =============================================================================

/// A complete fake storefront.
///
/// Cart, session, users, catalog and hooks all live in one struct, and each
/// [`Storefront`] accessor hands out `self` (or the hook bus) as the
/// corresponding port.
#[derive(Debug)]
pub struct MemoryStore {
    hooks: HookBus,
    products: BTreeMap<ProductId, ProductInfo>,
    next_product_id: u64,
    coupons: BTreeMap<String, CouponRule>,
    usage: BTreeMap<String, u32>,
    items: Vec<CartItem>,
    applied: Vec<String>,
    subtotal: Money,
    discount: Money,
    session: Option<BTreeMap<String, Value>>,
    users: BTreeSet<UserId>,
    current_user: UserId,
    extensions: Vec<ExtensionInfo>,
    pending_warnings: Vec<RuntimeWarning>,
    injections: Injections,
    placeholders_created: usize,
    apply_calls: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty store with an initialized session and a guest user.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: HookBus::new(),
            products: BTreeMap::new(),
            next_product_id: 10_000,
            coupons: BTreeMap::new(),
            usage: BTreeMap::new(),
            items: Vec::new(),
            applied: Vec::new(),
            subtotal: Money::ZERO,
            discount: Money::ZERO,
            session: Some(BTreeMap::new()),
            users: BTreeSet::new(),
            current_user: UserId::ANONYMOUS,
            extensions: Vec::new(),
            pending_warnings: Vec::new(),
            injections: Injections::default(),
            placeholders_created: 0,
            apply_calls: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    /// Builder method to add a catalog product.
    #[must_use]
    pub fn with_product(mut self, product: ProductInfo) -> Self {
        self.products.insert(product.id, product);
        self
    }

    /// Builder method to add a coupon.
    #[must_use]
    pub fn with_coupon(mut self, rule: CouponRule) -> Self {
        self.coupons.insert(rule.code.clone(), rule);
        self
    }

    /// Builder method to register a user account.
    #[must_use]
    pub fn with_user(mut self, user: UserId) -> Self {
        self.users.insert(user);
        self
    }

    /// Builder method to report a loaded extension.
    #[must_use]
    pub fn with_extension(mut self, name: &str, version: Option<&str>) -> Self {
        self.extensions.push(ExtensionInfo {
            name: name.to_string(),
            version: version.map(str::to_string),
        });
        self
    }

    /// Builder method to seed a session entry.
    #[must_use]
    pub fn with_session(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Some(session) = &mut self.session {
            session.insert(key.to_string(), value.into());
        }
        self
    }

    // -------------------------------------------------------------------------
    // Injection
    // -------------------------------------------------------------------------

    /// Makes applying `code` fail with `fault` after validity filters ran.
    pub fn inject_fault(&mut self, code: &str, fault: EngineFault) {
        self.injections.apply_faults.insert(code.to_lowercase(), fault);
    }

    /// Makes applying `code` panic after validity filters ran.
    pub fn inject_panic(&mut self, code: &str, message: &str, origin: Option<&str>) {
        self.injections.apply_panics.insert(
            code.to_lowercase(),
            InjectedPanic {
                message: message.to_string(),
                origin: origin.map(str::to_string),
            },
        );
    }

    /// Makes applying `code` emit a runtime warning.
    pub fn inject_warning(&mut self, code: &str, warning: RuntimeWarning) {
        self.injections
            .apply_warnings
            .entry(code.to_lowercase())
            .or_default()
            .push(warning);
    }

    /// Makes adding `product` to the cart fail.
    pub fn fail_adding(&mut self, product: ProductId) {
        self.injections.failing_products.insert(product);
    }

    /// Makes placeholder creation fail.
    pub fn fail_placeholder(&mut self) {
        self.injections.placeholder_fails = true;
    }

    /// Makes cart reads fail, as if the cart were not loaded.
    pub fn fail_cart_reads(&mut self) {
        self.injections.cart_reads_fail = true;
    }

    /// Drops the session, as if it were never started.
    pub fn uninitialize_session(&mut self) {
        self.session = None;
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Captures the observable state.
    #[must_use]
    pub fn state(&self) -> StoreState {
        StoreState {
            items: self.items.clone(),
            applied: self.applied.clone(),
            session: self.session.clone(),
            user: self.current_user,
        }
    }

    /// Direct access to the hook bus.
    #[must_use]
    pub const fn bus(&self) -> &HookBus {
        &self.hooks
    }

    /// Mutable access to the hook bus, for attaching third-party observers.
    pub fn bus_mut(&mut self) -> &mut HookBus {
        &mut self.hooks
    }

    /// Number of placeholder products created so far.
    #[must_use]
    pub const fn placeholders_created(&self) -> usize {
        self.placeholders_created
    }

    /// Number of `apply_code` calls so far.
    #[must_use]
    pub const fn apply_calls(&self) -> usize {
        self.apply_calls
    }

    /// Subtotal as of the last calculation.
    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.subtotal
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn cart_object() -> Value {
        Value::Object(ObjectRef::cart())
    }

    fn coupon_id(&self, code: &str) -> u64 {
        self.coupons
            .keys()
            .position(|k| k == code)
            .and_then(|i| u64::try_from(i + 1).ok())
            .unwrap_or(0)
    }

    fn unit_price(&self, product: ProductId) -> Money {
        self.products.get(&product).map_or(Money::ZERO, |p| p.price)
    }

    fn validate_line(&self, item: &CartItem) -> Result<()> {
        let product = self
            .products
            .get(&item.product)
            .ok_or_else(|| Error::not_found(format!("product {}", item.product)))?;

        match (&product.kind, item.variant) {
            (ProductKind::Simple, _) if product.is_eligible() => Ok(()),
            (ProductKind::Variable { variants }, Some(variant)) => {
                match variants.iter().find(|v| v.id == variant) {
                    Some(v) if v.is_eligible() => Ok(()),
                    Some(_) => Err(Error::rejected(format!(
                        "variant {variant} of product {} is not available",
                        product.id
                    ))),
                    None => Err(Error::not_found(format!("variant {variant}"))),
                }
            }
            (ProductKind::Variable { .. }, None) => Err(Error::rejected(format!(
                "please choose product options for {}",
                product.name
            ))),
            (ProductKind::Grouped { .. }, _) => Err(Error::rejected(format!(
                "{} is a grouped product and cannot be purchased directly",
                product.name
            ))),
            (ProductKind::Simple, _) => Err(Error::rejected(format!(
                "{} is not purchasable or out of stock",
                product.name
            ))),
        }
    }

    fn reject(&self, code: &str, reason: String, error_code: i64) -> ApplyOutcome {
        let filtered = self.hooks.fire_filter(
            "woocommerce_coupon_error",
            Value::string(&reason),
            &[Value::Int(error_code), Value::string(code)],
        );
        let reason = filtered.as_str().map_or(reason, str::to_string);
        ApplyOutcome::rejected(reason)
    }
}

// =============================================================================
// Port Implementations
// =============================================================================

impl CartEngine for MemoryStore {
    fn items(&self) -> Result<Vec<CartItem>> {
        if self.injections.cart_reads_fail {
            return Err(Error::unavailable("cart is not loaded"));
        }
        Ok(self.items.clone())
    }

    fn empty_cart(&mut self) -> Result<()> {
        self.items.clear();
        self.applied.clear();
        self.subtotal = Money::ZERO;
        self.discount = Money::ZERO;
        Ok(())
    }

    fn add_item(&mut self, item: &CartItem) -> Result<()> {
        if self.injections.failing_products.contains(&item.product) {
            return Err(Error::rejected(format!(
                "product {} could not be added",
                item.product
            )));
        }
        self.validate_line(item)?;

        let existing = self.items.iter_mut().find(|line| {
            line.product == item.product
                && line.variant == item.variant
                && line.attributes == item.attributes
                && line.custom_data == item.custom_data
        });
        match existing {
            Some(line) => line.quantity += item.quantity,
            None => self.items.push(item.clone()),
        }
        Ok(())
    }

    fn applied_codes(&self) -> Result<Vec<String>> {
        if self.injections.cart_reads_fail {
            return Err(Error::unavailable("cart is not loaded"));
        }
        Ok(self.applied.clone())
    }

    fn apply_code(&mut self, code: &str, path: ApplyPath<'_>) -> Result<ApplyOutcome> {
        self.apply_calls += 1;
        let key = code.to_lowercase();

        let Some(rule) = self.coupons.get(&key).cloned() else {
            return Ok(self.reject(code, format!("Coupon \"{code}\" does not exist!"), 105));
        };
        let coupon = Value::Object(rule.as_object(self.coupon_id(&key)));
        self.hooks
            .fire_action("woocommerce_coupon_loaded", std::slice::from_ref(&coupon));

        if self.applied.contains(&key) {
            return Ok(self.reject(code, "Coupon code already applied!".to_string(), 103));
        }

        let valid = self.hooks.fire_filter(
            "woocommerce_coupon_is_valid",
            Value::Bool(true),
            &[coupon.clone(), Self::cart_object()],
        );

        if let Some(warnings) = self.injections.apply_warnings.get(&key) {
            let emitted = warnings
                .iter()
                .filter(|w| !skipped(path, w.origin.as_ref()))
                .cloned();
            self.pending_warnings.extend(emitted);
        }
        if let Some(fault) = self.injections.apply_faults.get(&key) {
            if !skipped(path, fault.origin.as_ref()) {
                return Err(Error::engine(fault.clone()));
            }
        }
        if let Some(injected) = self.injections.apply_panics.get(&key) {
            if !skipped(path, injected.origin.as_ref()) {
                panic!("{}", injected.message);
            }
        }

        if !valid.is_truthy() {
            return Ok(self.reject(code, "Sorry, this coupon is not valid.".to_string(), 100));
        }
        let used = self.usage.get(&key).copied().unwrap_or(0);
        if rule.usage_limit.is_some_and(|limit| used >= limit) {
            return Ok(self.reject(code, "Coupon usage limit has been reached.".to_string(), 106));
        }

        self.usage.insert(key.clone(), used + 1);
        self.applied.push(key.clone());
        self.hooks
            .fire_action("woocommerce_applied_coupon", &[Value::string(&key)]);
        self.calculate_totals()?;
        Ok(ApplyOutcome::Applied)
    }

    fn calculate_totals(&mut self) -> Result<()> {
        self.hooks
            .fire_action("woocommerce_before_calculate_totals", &[Self::cart_object()]);

        let subtotal = self
            .items
            .iter()
            .fold(Money::ZERO, |acc, line| acc + self.unit_price(line.product).times(line.quantity));

        let mut remaining = subtotal;
        for code in &self.applied {
            let Some(rule) = self.coupons.get(code) else {
                continue;
            };
            let computed = match rule.discount {
                Discount::Percent(p) => Money::from_minor(subtotal.minor() * i64::from(p) / 100),
                Discount::FixedCart(amount) => amount,
            };
            let filtered = self.hooks.fire_filter(
                "woocommerce_coupon_get_discount_amount",
                Value::Int(computed.minor()),
                &[
                    Value::Int(subtotal.minor()),
                    Value::Null,
                    Value::Bool(false),
                    Value::Object(rule.as_object(self.coupon_id(code))),
                ],
            );
            let amount = Money::from_minor(filtered.as_int().unwrap_or(computed.minor()));
            let amount = if amount.minor() > remaining.minor() {
                remaining
            } else {
                amount
            };
            remaining = remaining - amount;
        }

        self.subtotal = subtotal;
        self.discount = subtotal - remaining;
        self.hooks
            .fire_action("woocommerce_after_calculate_totals", &[Self::cart_object()]);
        Ok(())
    }

    fn total(&self) -> Money {
        self.subtotal - self.discount
    }

    fn discount_total(&self) -> Money {
        self.discount
    }

    fn describe_code(&self, code: &str) -> Option<Value> {
        let key = code.to_lowercase();
        self.coupons
            .get(&key)
            .map(|rule| Value::Object(rule.as_object(self.coupon_id(&key))))
    }

    fn take_warnings(&mut self) -> Vec<RuntimeWarning> {
        mem::take(&mut self.pending_warnings)
    }

    fn active_extensions(&self) -> Vec<ExtensionInfo> {
        self.extensions.clone()
    }
}

impl SessionStore for MemoryStore {
    fn get_all(&self) -> Result<BTreeMap<String, Value>> {
        self.session
            .clone()
            .ok_or_else(|| Error::unavailable("session is not initialized"))
    }

    fn get(&self, key: &str, default: Value) -> Value {
        self.session
            .as_ref()
            .and_then(|s| s.get(key).cloned())
            .unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::unavailable("session is not initialized"))?;
        session.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| Error::unavailable("session is not initialized"))?;
        session.remove(key);
        Ok(())
    }
}

impl UserContext for MemoryStore {
    fn current_user(&self) -> Result<UserId> {
        Ok(self.current_user)
    }

    fn set_current_user(&mut self, user: UserId) -> Result<()> {
        if !self.user_exists(user) {
            return Err(Error::not_found(format!("user {user}")));
        }
        self.current_user = user;
        Ok(())
    }

    fn user_exists(&self, user: UserId) -> bool {
        user.is_anonymous() || self.users.contains(&user)
    }
}

impl ProductCatalog for MemoryStore {
    fn product(&self, id: ProductId) -> Option<ProductInfo> {
        self.products.get(&id).cloned()
    }

    fn create_placeholder(&mut self, spec: &PlaceholderSpec) -> Result<ProductId> {
        if self.injections.placeholder_fails {
            return Err(Error::rejected("placeholder product could not be saved"));
        }
        let id = ProductId::new(self.next_product_id);
        self.next_product_id += 1;
        self.products
            .insert(id, ProductInfo::simple(id, spec.name.clone(), spec.price));
        self.placeholders_created += 1;
        Ok(id)
    }
}

impl Storefront for MemoryStore {
    fn cart(&mut self) -> &mut dyn CartEngine {
        self
    }

    fn session(&mut self) -> &mut dyn SessionStore {
        self
    }

    fn users(&mut self) -> &mut dyn UserContext {
        self
    }

    fn catalog(&mut self) -> &mut dyn ProductCatalog {
        self
    }

    fn hooks(&mut self) -> &mut dyn HookRegistry {
        &mut self.hooks
    }
}
