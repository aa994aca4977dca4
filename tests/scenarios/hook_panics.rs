//! Scenarios where a third-party hook panics outside the coupon application
//! itself: while totals are recalculated after apply, and during restore.

use std::cell::Cell;
use std::rc::Rc;

use cartprobe_debug::EventKind;
use cartprobe_engine::{ErrorClass, SimulationOutcome, SimulationRequest, Simulator, SimulatorConfig};
use cartprobe_foundation::{
    CartEngine, CartItem, FaultKind, HookObserver, HookPoint, HookRegistry, Money, ProductId,
    ProductInfo, UserContext, UserId, Value,
};
use cartprobe_testkit::{CouponRule, MemoryStore};

const AFTER_TOTALS: &str = "woocommerce_after_calculate_totals";

/// Panics on the `nth` firing of the hook it is attached to.
struct PanicOnCall {
    nth: usize,
    calls: Cell<usize>,
}

impl PanicOnCall {
    fn new(nth: usize) -> Rc<Self> {
        Rc::new(Self {
            nth,
            calls: Cell::new(0),
        })
    }

    fn tick(&self) {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        assert!(call != self.nth, "totals listener exploded on call {call}");
    }
}

impl HookObserver for PanicOnCall {
    fn on_filter(&self, _hook: &str, value: Value, _args: &[Value]) -> Value {
        self.tick();
        value
    }

    fn on_action(&self, _hook: &str, _args: &[Value]) {
        self.tick();
    }
}

/// A storefront holding three mugs for user 7, with a listener that panics
/// on the `nth` totals recalculation from here on.
///
/// One run recalculates totals four times: after the placeholder is added,
/// inside the apply, after the apply, and at the end of restore.
fn store_with_listener(nth: usize) -> MemoryStore {
    let mut store = MemoryStore::new()
        .with_product(ProductInfo::simple(ProductId::new(1), "Mug", Money::from_major(12)))
        .with_coupon(CouponRule::percent("save10", 10))
        .with_user(UserId::new(7))
        .with_session("cart_hash", "abc123");
    store.add_item(&CartItem::new(ProductId::new(1), 3)).unwrap();
    store.set_current_user(UserId::new(7)).unwrap();

    let listener: Rc<dyn HookObserver> = PanicOnCall::new(nth);
    store
        .bus_mut()
        .attach(&HookPoint::action(AFTER_TOTALS, 1), listener, 10);
    store
}

#[test]
fn panic_after_apply_is_reported_and_cart_restored() {
    let mut store = store_with_listener(3);
    let before = store.state();
    let mut simulator = Simulator::new(SimulatorConfig::default());

    let result = simulator.run(&mut store, &SimulationRequest::new("SAVE10"));

    match &result.outcome {
        SimulationOutcome::Faulted { fault } => {
            assert_eq!(fault.kind, FaultKind::Panic);
            assert!(fault.message.contains("call 3"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(result.error_class(), Some(ErrorClass::Exception));
    let errors = result.events_of(EventKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].mentions("Exception during coupon test"));

    assert!(!simulator.tracer().is_active());
    assert_eq!(store.bus().total_subscribers(), 1);
    assert_eq!(store.state(), before);
}

#[test]
fn panic_during_restore_is_logged_and_remaining_state_restored() {
    let mut store = store_with_listener(4);
    let before = store.state();
    let mut simulator = Simulator::new(SimulatorConfig::default());

    let result = simulator.run(&mut store, &SimulationRequest::new("SAVE10"));

    assert!(result.applied());
    let errors = result.events_of(EventKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].mentions("Failed to restore cart totals"));
    assert!(errors[0].mentions("call 4"));
    assert!(
        result
            .events
            .iter()
            .all(|e| e.message != "Cart state restored successfully.")
    );

    assert!(!simulator.tracer().is_active());
    assert_eq!(store.state(), before);
}
