//! Scenarios for successful, rejected and faulting coupon runs.

use cartprobe_debug::{EventKind, SMART_COUPONS_ORIGIN};
use cartprobe_engine::{
    ErrorClass, ProductSelection, SimulationOutcome, SimulationRequest, Simulator,
    SimulatorConfig,
};
use cartprobe_foundation::{
    ApplyPath, CartEngine, CartItem, EngineFault, FaultKind, Money, ProductId, ProductInfo,
    SessionStore, UserId, Value,
};
use cartprobe_testkit::{CouponRule, MemoryStore};

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_product(ProductInfo::simple(ProductId::new(1), "Kettle", Money::from_major(25)))
        .with_product(ProductInfo::simple(ProductId::new(2), "Teapot", Money::from_major(12)))
        .with_coupon(CouponRule::percent("save10", 10))
        .with_user(UserId::new(3))
}

#[test]
fn general_coupon_on_empty_cart_as_guest() {
    let mut store = store();
    let before = store.state();
    let mut simulator = Simulator::new(SimulatorConfig::default());

    let result = simulator.run(&mut store, &SimulationRequest::new("SAVE10"));

    assert!(result.applied());
    assert_eq!(result.error_class(), None);
    assert_eq!(
        result.outcome,
        SimulationOutcome::Applied {
            total: Money::from_major(90),
            discount: Money::from_major(10),
        }
    );
    assert!(
        result
            .events_of(EventKind::Info)
            .iter()
            .any(|e| e.message == "Simulating guest user.")
    );
    assert!(
        result
            .events_of(EventKind::Info)
            .iter()
            .any(|e| e.mentions("added placeholder product"))
    );
    let successes = result.events_of(EventKind::Success);
    assert!(successes.iter().any(|e| e.message == "New Cart Total: 90.00"));
    assert!(successes.iter().any(|e| e.message == "Discount Amount: 10.00"));
    assert!(result.events_of(EventKind::Error).is_empty());
    assert_eq!(store.state(), before);
}

#[test]
fn unknown_code_leaves_prior_cart_intact() {
    let mut store = store();
    store.add_item(&CartItem::new(ProductId::new(1), 2)).unwrap();
    store.apply_code("save10", ApplyPath::Full).unwrap();
    store.set("wc_notices", Value::string("keep me")).unwrap();
    let before = store.state();
    let total = store.total();

    let result = Simulator::new(SimulatorConfig::default())
        .run(&mut store, &SimulationRequest::new("NOSUCHCODE"));

    assert!(!result.applied());
    assert_eq!(result.error_class(), Some(ErrorClass::Rejected));
    let errors = result.events_of(EventKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].mentions("NOSUCHCODE"));
    assert!(errors[0].mentions("does not exist"));

    assert_eq!(store.state(), before);
    assert_eq!(store.total(), total);
}

#[test]
fn known_incompatibility_is_reported_once() {
    let mut store = store();
    store.inject_fault(
        "save10",
        EngineFault::new(FaultKind::Type, "Cannot access offset of type string on string")
            .with_origin(SMART_COUPONS_ORIGIN),
    );
    let before = store.state();
    let mut simulator = Simulator::new(SimulatorConfig::default());

    let result = simulator.run(&mut store, &SimulationRequest::new("SAVE10"));

    assert!(!result.applied());
    assert_eq!(result.error_class(), Some(ErrorClass::KnownIncompatibility));
    let errors = result.events_of(EventKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].mentions("Known compatibility error"));
    assert!(!simulator.tracer().is_active());
    assert_eq!(store.bus().total_subscribers(), 0);
    assert_eq!(store.state(), before);
}

#[test]
fn skipping_the_extension_lets_the_coupon_apply() {
    let mut store = store();
    store.inject_fault(
        "save10",
        EngineFault::new(FaultKind::Type, "Cannot access offset of type string on string")
            .with_origin(SMART_COUPONS_ORIGIN),
    );

    let result = Simulator::new(SimulatorConfig::default()).run(
        &mut store,
        &SimulationRequest::new("SAVE10").with_skip_incompatible(true),
    );

    assert!(result.applied());
    assert!(
        result
            .events_of(EventKind::Warning)
            .iter()
            .any(|e| e.mentions("Skipping known-incompatible extensions"))
    );
}

#[test]
fn registered_user_with_products() {
    let mut store = store();
    let before = store.state();

    let result = Simulator::new(SimulatorConfig::default()).run(
        &mut store,
        &SimulationRequest::new("save10")
            .with_user(UserId::new(3))
            .with_product(ProductSelection::new(ProductId::new(1)).with_quantity(2))
            .with_product(ProductSelection::new(ProductId::new(2))),
    );

    assert_eq!(
        result.outcome,
        SimulationOutcome::Applied {
            total: Money::from_minor(5580),
            discount: Money::from_minor(620),
        }
    );
    let infos = result.events_of(EventKind::Info);
    assert!(infos.iter().any(|e| e.message == "Simulating user ID: 3"));
    assert!(infos.iter().any(|e| e.message == "Added product to cart: Kettle (ID: 1)"));
    assert!(infos.iter().any(|e| e.message == "Added product to cart: Teapot (ID: 2)"));
    assert!(infos.iter().any(|e| e.message == "Cart Total before applying coupon: 62.00"));
    assert_eq!(store.state(), before);
    assert_eq!(store.state().user, UserId::ANONYMOUS);
}
