//! Integration tests for the hook tracer
//!
//! Tests the tracer observing a storefront's hook bus while the engine
//! applies codes, alongside third-party subscribers.

use std::rc::Rc;

use cartprobe_debug::{
    EventKind, EventLog, HookCatalog, HookTracer, LogConfig, LogValue, Sanitizer, SharedLog,
    TracerConfig,
};
use cartprobe_foundation::{
    ApplyPath, CartEngine, CartItem, HookObserver, HookPoint, HookRegistry, Money, ProductId,
    ProductInfo, Storefront, Value,
};
use cartprobe_testkit::{CouponRule, FilterFn, HookBus, MemoryStore};
use proptest::prelude::*;

fn store() -> MemoryStore {
    let mut store = MemoryStore::new()
        .with_product(ProductInfo::simple(ProductId::new(1), "Mug", Money::from_major(20)))
        .with_coupon(CouponRule::percent("SAVE10", 10));
    store.add_item(&CartItem::new(ProductId::new(1), 1)).unwrap();
    store
}

fn tracer(log: &SharedLog) -> HookTracer {
    HookTracer::new(TracerConfig::default(), Sanitizer::default(), Rc::clone(log))
}

fn hook_messages(log: &SharedLog) -> Vec<String> {
    log.borrow()
        .iter()
        .filter(|e| e.kind.is_hook())
        .map(|e| e.message.clone())
        .collect()
}

// =============================================================================
// Tracing a Live Engine
// =============================================================================

#[test]
fn traces_a_successful_application_in_order() {
    let log = EventLog::shared(LogConfig::default());
    let mut store = store();
    let mut tracer = tracer(&log);

    tracer.start(store.hooks());
    store.apply_code("SAVE10", ApplyPath::Full).unwrap();
    tracer.stop(store.hooks());

    assert_eq!(
        hook_messages(&log),
        vec![
            "Action: woocommerce_coupon_loaded",
            "Filter: woocommerce_coupon_is_valid",
            "Action: woocommerce_applied_coupon",
            "Action: woocommerce_before_calculate_totals",
            "Filter: woocommerce_coupon_get_discount_amount",
            "Action: woocommerce_after_calculate_totals",
        ]
    );
}

#[test]
fn tracer_sees_value_after_earlier_subscribers() {
    let log = EventLog::shared(LogConfig::default());
    let mut store = store();
    let veto: Rc<dyn HookObserver> = Rc::new(FilterFn(|_: Value, _: &[Value]| Value::Bool(false)));
    store.bus_mut().attach(
        &HookPoint::filter("woocommerce_coupon_is_valid", 1),
        veto,
        10,
    );
    let mut tracer = tracer(&log);

    tracer.start(store.hooks());
    let outcome = store.apply_code("SAVE10", ApplyPath::Full).unwrap();
    tracer.stop(store.hooks());

    assert!(!outcome.is_applied());
    let log = log.borrow();
    let is_valid = log
        .iter()
        .find(|e| e.message == "Filter: woocommerce_coupon_is_valid")
        .unwrap();
    assert_eq!(
        is_valid.payload.as_ref().and_then(|p| p.get("return")),
        Some(&LogValue::Bool(false))
    );
    assert!(log.iter().any(|e| e.message == "Filter: woocommerce_coupon_error"));
}

#[test]
fn tracer_does_not_change_engine_results() {
    let log = EventLog::shared(LogConfig::default());
    let mut traced = store();
    let mut untraced = store();
    let mut tracer = tracer(&log);

    tracer.start(traced.hooks());
    traced.apply_code("SAVE10", ApplyPath::Full).unwrap();
    tracer.stop(traced.hooks());
    untraced.apply_code("SAVE10", ApplyPath::Full).unwrap();

    assert_eq!(traced.total(), untraced.total());
    assert_eq!(traced.total(), Money::from_major(18));
}

#[test]
fn double_start_records_each_firing_once() {
    let log = EventLog::shared(LogConfig::default());
    let mut store = store();
    let mut tracer = tracer(&log);

    tracer.start(store.hooks());
    tracer.start(store.hooks());
    store.apply_code("SAVE10", ApplyPath::Full).unwrap();
    tracer.stop(store.hooks());
    tracer.stop(store.hooks());

    let loaded = hook_messages(&log)
        .iter()
        .filter(|m| *m == "Action: woocommerce_coupon_loaded")
        .count();
    assert_eq!(loaded, 1);
    assert_eq!(store.bus().total_subscribers(), 0);
}

#[test]
fn stopped_tracer_is_silent() {
    let log = EventLog::shared(LogConfig::default());
    let mut store = store();
    let mut tracer = tracer(&log);

    tracer.start(store.hooks());
    tracer.stop(store.hooks());
    log.borrow_mut().clear();
    store.apply_code("SAVE10", ApplyPath::Full).unwrap();

    assert!(log.borrow().is_empty());
}

#[test]
fn every_catalog_point_is_attached() {
    let log = EventLog::shared(LogConfig::default());
    let mut bus = HookBus::new();
    let mut tracer = tracer(&log);
    tracer.start(&mut bus);

    let catalog = HookCatalog::woocommerce();
    assert_eq!(bus.total_subscribers(), catalog.len());
    for point in catalog.iter() {
        assert_eq!(bus.subscriber_count(&point.name), 1, "{}", point.name);
    }
    tracer.stop(&mut bus);
}

// =============================================================================
// Start/Stop Sequences
// =============================================================================

#[derive(Clone, Copy, Debug)]
enum Op {
    Start,
    Stop,
    Fire,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Start), Just(Op::Stop), Just(Op::Fire)]
}

proptest! {
    #[test]
    fn events_only_while_active(ops in prop::collection::vec(arb_op(), 0..40)) {
        let log = EventLog::shared(LogConfig::default());
        let mut bus = HookBus::new();
        let mut tracer = tracer(&log);
        let mut active = false;
        let mut expected = 0;

        for op in ops {
            match op {
                Op::Start => {
                    tracer.start(&mut bus);
                    active = true;
                }
                Op::Stop => {
                    tracer.stop(&mut bus);
                    active = false;
                }
                Op::Fire => {
                    let out = bus.fire_filter("woocommerce_coupon_is_valid", Value::Int(7), &[]);
                    prop_assert_eq!(out, Value::Int(7));
                    if active {
                        expected += 1;
                    }
                }
            }
            prop_assert_eq!(tracer.is_active(), active);
            prop_assert_eq!(bus.subscriber_count("woocommerce_coupon_is_valid"), usize::from(active));
        }

        prop_assert_eq!(log.borrow().by_kind(EventKind::HookFilter).len(), expected);
    }
}
