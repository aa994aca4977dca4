//! Integration tests for report encoding of real runs
//!
//! Tests that a finished run encodes to JSON and MessagePack with its
//! traced hook events and sanitized payloads intact.

use cartprobe_debug::SMART_COUPONS_ORIGIN;
use cartprobe_engine::{SimulationRequest, Simulator, SimulatorConfig};
use cartprobe_foundation::{EngineFault, FaultKind, Money, ProductId, ProductInfo};
use cartprobe_testkit::{CouponRule, MemoryStore};

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_product(ProductInfo::simple(ProductId::new(1), "Lamp", Money::from_major(40)))
        .with_coupon(CouponRule::percent("save10", 10))
}

#[test]
fn applied_run_report() {
    let mut store = store();
    let result = Simulator::new(SimulatorConfig::default())
        .run(&mut store, &SimulationRequest::new("SAVE10"));

    let json: serde_json::Value =
        serde_json::from_str(&result.report().to_json().unwrap()).unwrap();
    assert_eq!(json["applied"], true);
    assert_eq!(json["outcome"]["status"], "applied");

    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), result.events.len());
    assert!(events.iter().any(|e| e["type"] == "filter"));
    assert!(events.iter().any(|e| e["type"] == "action"));
    assert!(events.iter().any(|e| e["type"] == "success"));

    let ids: Vec<u64> = events.iter().map(|e| e["id"].as_u64().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn faulted_run_report_in_msgpack() {
    let mut store = store();
    store.inject_fault(
        "save10",
        EngineFault::new(FaultKind::Type, "Cannot access offset of type string on string")
            .with_origin(SMART_COUPONS_ORIGIN),
    );
    let result = Simulator::new(SimulatorConfig::default())
        .run(&mut store, &SimulationRequest::new("SAVE10"));

    let bytes = result.report().to_msgpack().unwrap();
    let decoded: serde_json::Value = rmp_serde::from_slice(&bytes).unwrap();
    assert_eq!(decoded["applied"], false);
    assert_eq!(decoded["error_class"], "known-incompatibility");
    assert_eq!(decoded["outcome"]["extension"], SMART_COUPONS_ORIGIN);
}

#[test]
fn pretty_report_matches_compact() {
    let mut store = store();
    let result = Simulator::new(SimulatorConfig::default())
        .run(&mut store, &SimulationRequest::new("NOPE"));
    let report = result.report();

    let compact: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let pretty: serde_json::Value =
        serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(compact, pretty);
    assert_eq!(compact["error_class"], "rejected");
}
