//! Integration tests for the simulator
//!
//! Tests configuration loading, log limits and state across repeated runs.

use cartprobe_debug::{EventKind, LIMIT_REACHED_MESSAGE, LogConfig, SMART_COUPONS_ORIGIN};
use cartprobe_engine::{
    ErrorClass, IncompatibilityRules, ProductSelection, SelectionPolicy, SimulationOutcome,
    SimulationRequest, Simulator, SimulatorConfig,
};
use cartprobe_foundation::{
    ApplyPath, CartEngine, CartItem, EngineFault, FaultKind, Money, ProductId, ProductInfo,
};
use cartprobe_testkit::{CouponRule, MemoryStore};

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_product(ProductInfo::simple(ProductId::new(1), "Lamp", Money::from_major(40)))
        .with_coupon(CouponRule::percent("save10", 10))
        .with_coupon(CouponRule::fixed("fiver", Money::from_major(5)))
}

#[test]
fn config_loads_from_json() {
    let config: SimulatorConfig = serde_json::from_str(
        r#"{
            "log": { "max_events": 50 },
            "selection": { "seeded": 3 },
            "skip_incompatible_default": true
        }"#,
    )
    .unwrap();

    assert_eq!(config.log.max_events, 50);
    assert_eq!(config.log.max_message_chars, LogConfig::default().max_message_chars);
    assert_eq!(config.selection, SelectionPolicy::Seeded(3));
    assert!(config.skip_incompatible_default);
    assert_eq!(config.scratch_keys, SimulatorConfig::default().scratch_keys);
}

#[test]
fn log_cap_bounds_a_run() {
    let mut store = store();
    let before = store.state();
    let mut simulator =
        Simulator::new(SimulatorConfig::default().with_log(LogConfig::default().with_max_events(4)));

    let result = simulator.run(&mut store, &SimulationRequest::new("SAVE10"));

    assert!(result.applied());
    assert_eq!(result.events.len(), 4);
    let last = result.events.last().unwrap();
    assert_eq!(last.kind, EventKind::Warning);
    assert_eq!(last.message, LIMIT_REACHED_MESSAGE);
    assert_eq!(store.state(), before);
}

#[test]
fn each_run_starts_with_a_fresh_log() {
    let mut store = store();
    let mut simulator = Simulator::new(SimulatorConfig::default());

    simulator.run(&mut store, &SimulationRequest::new("SAVE10"));
    let second = simulator.run(&mut store, &SimulationRequest::new("FIVER"));

    assert_eq!(second.events[0].message, "Starting coupon test for: \"FIVER\"");
    assert!(second.events.iter().all(|e| !e.mentions("SAVE10")));
    assert_eq!(simulator.log().len(), second.events.len());

    simulator.clear_log();
    assert!(simulator.log().is_empty());
}

#[test]
fn repeated_runs_reuse_placeholder_and_leave_no_subscribers() {
    let mut store = store();
    let mut simulator = Simulator::new(SimulatorConfig::default());

    for code in ["SAVE10", "FIVER", "NOPE"] {
        simulator.run(&mut store, &SimulationRequest::new(code));
        assert_eq!(store.bus().total_subscribers(), 0);
        assert!(!simulator.tracer().is_active());
    }

    assert_eq!(store.placeholders_created(), 1);
    assert_eq!(simulator.placeholder(), Some(ProductId::new(10_000)));
    assert!(store.state().items.is_empty());
}

#[test]
fn placeholder_not_needed_when_products_requested() {
    let mut store = store();
    let mut simulator = Simulator::new(SimulatorConfig::default());

    let result = simulator.run(
        &mut store,
        &SimulationRequest::new("fiver")
            .with_product(ProductSelection::new(ProductId::new(1))),
    );

    assert_eq!(
        result.outcome,
        SimulationOutcome::Applied {
            total: Money::from_major(35),
            discount: Money::from_major(5),
        }
    );
    assert_eq!(store.placeholders_created(), 0);
}

#[test]
fn without_rules_every_fault_is_an_exception() {
    let mut store = store();
    store.inject_fault(
        "save10",
        EngineFault::new(FaultKind::Type, "Cannot access offset of type string on string")
            .with_origin(SMART_COUPONS_ORIGIN),
    );
    let mut simulator = Simulator::new(
        SimulatorConfig::default().with_incompatibility(IncompatibilityRules::none()),
    );

    let result = simulator.run(&mut store, &SimulationRequest::new("SAVE10"));

    assert_eq!(result.error_class(), Some(ErrorClass::Exception));
    assert!(matches!(result.outcome, SimulationOutcome::Faulted { .. }));
}

#[test]
fn prior_cart_survives_a_run() {
    let mut store = store();
    store.add_item(&CartItem::new(ProductId::new(1), 2)).unwrap();
    store.apply_code("fiver", ApplyPath::Full).unwrap();
    let before = store.state();
    let total = store.total();

    let result = Simulator::new(SimulatorConfig::default())
        .run(&mut store, &SimulationRequest::new("SAVE10"));

    assert!(result.applied());
    assert_eq!(store.state(), before);
    assert_eq!(store.total(), total);
}
