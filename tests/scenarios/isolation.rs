//! Property: a run never changes the storefront it ran against.

use cartprobe_engine::{ProductSelection, SimulationRequest, Simulator, SimulatorConfig};
use cartprobe_foundation::{
    ApplyPath, CartEngine, CartItem, EngineFault, FaultKind, Money, ProductId, ProductInfo,
    SessionStore, UserContext, UserId, Value,
};
use cartprobe_testkit::{CouponRule, MemoryStore};
use proptest::prelude::*;

const CODES: [&str; 4] = ["save10", "fiver", "broken", "missing"];

fn store() -> MemoryStore {
    let mut store = MemoryStore::new()
        .with_product(ProductInfo::simple(ProductId::new(1), "Kettle", Money::from_major(25)))
        .with_product(ProductInfo::simple(ProductId::new(2), "Teapot", Money::from_major(12)))
        .with_coupon(CouponRule::percent("save10", 10))
        .with_coupon(CouponRule::fixed("fiver", Money::from_major(5)))
        .with_coupon(CouponRule::percent("broken", 50))
        .with_user(UserId::new(3));
    store.inject_fault(
        "broken",
        EngineFault::new(FaultKind::Runtime, "database went away"),
    );
    store
}

proptest! {
    #[test]
    fn run_leaves_storefront_unchanged(
        prior in prop::collection::vec((1u64..=2, 1u32..4), 0..3),
        prior_code in prop::option::of(0usize..2),
        prior_user in prop_oneof![Just(0u64), Just(3u64)],
        code in 0usize..4,
        requested in prop::collection::vec((1u64..=5, 0u32..3), 0..3),
        user in prop::option::of(0u64..5),
        skip in any::<bool>(),
    ) {
        let mut store = store();
        for (product, quantity) in prior {
            store.add_item(&CartItem::new(ProductId::new(product), quantity)).unwrap();
        }
        if let Some(index) = prior_code {
            store.apply_code(CODES[index], ApplyPath::Full).unwrap();
        }
        store.set_current_user(UserId::new(prior_user)).unwrap();
        store.set("greeting", Value::string("hello")).unwrap();
        let before = store.state();

        let mut request = SimulationRequest::new(CODES[code]).with_skip_incompatible(skip);
        for (product, quantity) in requested {
            request = request
                .with_product(ProductSelection::new(ProductId::new(product)).with_quantity(quantity));
        }
        if let Some(user) = user {
            request = request.with_user(UserId::new(user));
        }

        let mut simulator = Simulator::new(SimulatorConfig::default());
        let result = simulator.run(&mut store, &request);

        prop_assert_eq!(store.state(), before);
        prop_assert!(!simulator.tracer().is_active());
        prop_assert_eq!(store.bus().total_subscribers(), 0);
        prop_assert_eq!(result.applied(), code < 2);
    }
}
