//! Integration tests for snapshot capture and restore
//!
//! Tests that restoring a captured snapshot reproduces arbitrary cart states.

use cartprobe_debug::{EventLog, LogConfig};
use cartprobe_engine::{ScratchKey, SimulatorConfig, SnapshotManager};
use cartprobe_foundation::{
    ApplyPath, CartEngine, CartItem, Money, ProductId, ProductInfo, SessionStore, UserContext,
    UserId, Value,
};
use cartprobe_testkit::{CouponRule, MemoryStore};
use proptest::prelude::*;

const CODES: [&str; 3] = ["spring", "loyal", "freeship"];

#[derive(Clone, Debug)]
struct CartState {
    lines: Vec<(u64, u32)>,
    codes: Vec<usize>,
    user: u64,
    session: Vec<(String, i64)>,
}

fn arb_state() -> impl Strategy<Value = CartState> {
    (
        prop::collection::btree_map(1u64..=6, 1u32..5, 0..6),
        prop::sample::subsequence(vec![0usize, 1, 2], 0..=3),
        prop_oneof![Just(0u64), Just(7u64), Just(8u64)],
        prop::collection::vec(("[a-z]{1,6}", any::<i64>()), 0..5),
    )
        .prop_map(|(lines, codes, user, session)| CartState {
            lines: lines.into_iter().collect(),
            codes,
            user,
            session,
        })
}

fn build(state: &CartState) -> MemoryStore {
    let mut store = (1..=6).fold(MemoryStore::new(), |store, id| {
        store.with_product(ProductInfo::simple(
            ProductId::new(id),
            format!("Product {id}"),
            Money::from_major(i64::try_from(id).unwrap() * 5),
        ))
    });
    store = store
        .with_coupon(CouponRule::percent(CODES[0], 10))
        .with_coupon(CouponRule::percent(CODES[1], 5))
        .with_coupon(CouponRule::fixed(CODES[2], Money::from_major(3)))
        .with_user(UserId::new(7))
        .with_user(UserId::new(8));

    for &(product, quantity) in &state.lines {
        store
            .add_item(&CartItem::new(ProductId::new(product), quantity))
            .unwrap();
    }
    for &code in &state.codes {
        store.apply_code(CODES[code], ApplyPath::Full).unwrap();
    }
    for (key, value) in &state.session {
        store.set(key, Value::Int(*value)).unwrap();
    }
    store.set_current_user(UserId::new(state.user)).unwrap();
    store
}

proptest! {
    #[test]
    fn restore_reproduces_captured_state(state in arb_state()) {
        let mut store = build(&state);
        let before = store.state();
        let manager = SnapshotManager::new(SimulatorConfig::default().scratch_keys);
        let snapshot = manager.capture(&mut store).unwrap();

        manager.reset(&mut store).unwrap();
        store.add_item(&CartItem::new(ProductId::new(1), 9)).unwrap();
        store.set_current_user(UserId::new(8)).unwrap();
        store.set("leftover", Value::Bool(true)).unwrap();

        let log = EventLog::shared(LogConfig::default());
        let report = manager.restore(&mut store, &snapshot, &log);

        prop_assert!(report.is_clean(), "{:?}", report.failures);
        prop_assert_eq!(store.state(), before);
        prop_assert_eq!(manager.capture(&mut store).unwrap(), snapshot);
    }

    #[test]
    fn reset_always_yields_empty_baseline(state in arb_state()) {
        let mut store = build(&state);
        let manager = SnapshotManager::new(vec![ScratchKey::null("sc_coupon_error")]);
        manager.reset(&mut store).unwrap();

        let after = store.state();
        prop_assert!(after.items.is_empty());
        prop_assert!(after.applied.is_empty());
        let session = after.session.unwrap();
        prop_assert_eq!(
            session.get("sc_coupon_error"),
            Some(&Value::Null)
        );
    }
}

#[test]
fn applied_codes_are_restored_in_order() {
    let state = CartState {
        lines: vec![(2, 1)],
        codes: vec![2, 0],
        user: 0,
        session: Vec::new(),
    };
    let mut store = build(&state);
    let manager = SnapshotManager::new(Vec::new());
    let snapshot = manager.capture(&mut store).unwrap();
    let total = store.total();

    manager.reset(&mut store).unwrap();
    manager.restore(&mut store, &snapshot, &EventLog::shared(LogConfig::default()));

    assert_eq!(store.state().applied, vec!["freeship", "spring"]);
    assert_eq!(store.total(), total);
}

#[test]
fn empty_cart_snapshot() {
    let mut store = build(&CartState {
        lines: Vec::new(),
        codes: Vec::new(),
        user: 7,
        session: Vec::new(),
    });
    let snapshot = SnapshotManager::new(Vec::new()).capture(&mut store).unwrap();

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.user(), UserId::new(7));
    assert!(snapshot.session().is_empty());
}
