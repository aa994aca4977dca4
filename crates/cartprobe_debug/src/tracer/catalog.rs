//! The set of hook points the tracer observes.

use cartprobe_foundation::HookPoint;
use serde::Deserialize;

/// Origin tag for hooks contributed by the Smart Coupons extension.
pub const SMART_COUPONS_ORIGIN: &str = "woocommerce-smart-coupons";

const CORE_FILTERS: &[(&str, usize)] = &[
    ("woocommerce_coupon_is_valid", 3),
    ("woocommerce_coupon_is_valid_for_product", 4),
    ("woocommerce_coupon_validate_expiry_date", 3),
    ("woocommerce_coupon_get_discount_amount", 5),
    ("woocommerce_apply_individual_use_coupon", 3),
    ("woocommerce_apply_with_individual_use_coupon", 4),
    ("woocommerce_coupon_error", 3),
];

const SMART_COUPONS_FILTERS: &[(&str, usize)] = &[
    ("wc_sc_validate_coupon_amount", 2),
    ("wc_sc_is_send_coupon_email", 2),
    ("wc_sc_is_coupon_restriction_available", 2),
    ("wc_sc_percent_discount_types", 2),
    ("wc_sc_coupon_type", 3),
    ("wc_sc_coupon_amount", 2),
    ("wc_sc_generated_coupon_description", 2),
    ("wc_sc_max_fields_to_show_in_coupon_description", 2),
    ("wc_sc_max_restricted_category_names", 2),
    ("wc_sc_max_restricted_product_names", 2),
    ("wc_sc_generate_unique_coupon_code", 2),
    ("wc_sc_coupon_code_allowed_characters", 2),
    ("wc_sc_coupon_style_attributes", 1),
    ("wc_sc_coupon_container_classes", 1),
    ("wc_sc_coupon_content_classes", 1),
    ("wc_sc_coupon_design_thumbnail_src_set", 2),
    ("wc_sc_coupon_design_thumbnail_src", 2),
    ("wc_sc_storewide_offer_coupon_description", 2),
    ("wc_sc_get_wc_sc_coupon_styles", 1),
    ("wc_sc_get_coupon_styles", 3),
    ("wc_sc_coupon_cookie_life", 1),
    ("wc_sc_is_generated_store_credit_includes_tax", 2),
    ("wc_sc_read_price", 2),
    ("wc_sc_write_price", 2),
    ("wc_sc_after_get_post_meta", 2),
    ("wc_sc_before_update_post_meta", 2),
    ("wc_sc_after_get_session", 2),
    ("wc_sc_before_set_session", 2),
    ("wc_sc_after_get_order_item_meta", 2),
    ("wc_sc_before_update_order_item_meta", 2),
    ("wc_sc_pending_order_statuses", 2),
    ("wc_sc_order_actions_to_ignore_for_email", 2),
];

const CORE_ACTIONS: &[(&str, usize)] = &[
    ("woocommerce_applied_coupon", 1),
    ("woocommerce_removed_coupon", 1),
    ("woocommerce_coupon_loaded", 1),
    ("woocommerce_before_calculate_totals", 1),
    ("woocommerce_after_calculate_totals", 1),
];

const SMART_COUPONS_ACTIONS: &[(&str, usize)] = &[
    ("wc_sc_new_coupon_generated", 1),
    ("smart_coupons_after_calculate_totals", 0),
    ("sc_after_order_calculate_discount_amount", 1),
];

/// An ordered, duplicate-free list of hook points.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct HookCatalog {
    points: Vec<HookPoint>,
}

impl HookCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The discount engine's core hooks plus the Smart Coupons extension's.
    #[must_use]
    pub fn woocommerce() -> Self {
        let filters = CORE_FILTERS
            .iter()
            .map(|&(name, args)| HookPoint::filter(name, args))
            .chain(
                SMART_COUPONS_FILTERS
                    .iter()
                    .map(|&(name, args)| HookPoint::filter(name, args).with_origin(SMART_COUPONS_ORIGIN)),
            );
        let actions = CORE_ACTIONS
            .iter()
            .map(|&(name, args)| HookPoint::action(name, args))
            .chain(
                SMART_COUPONS_ACTIONS
                    .iter()
                    .map(|&(name, args)| HookPoint::action(name, args).with_origin(SMART_COUPONS_ORIGIN)),
            );

        filters.chain(actions).fold(Self::new(), Self::with)
    }

    /// Builder method to add a point. A point whose name is already present
    /// replaces the earlier entry in place.
    #[must_use]
    pub fn with(mut self, point: HookPoint) -> Self {
        self.insert(point);
        self
    }

    /// Adds a point, replacing any existing point of the same name.
    pub fn insert(&mut self, point: HookPoint) {
        match self.points.iter_mut().find(|p| p.name == point.name) {
            Some(existing) => *existing = point,
            None => self.points.push(point),
        }
    }

    /// Looks up a point by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HookPoint> {
        self.points.iter().find(|p| p.name == name)
    }

    /// Returns an iterator over points in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &HookPoint> {
        self.points.iter()
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the catalog has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
