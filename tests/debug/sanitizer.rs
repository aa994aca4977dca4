//! Integration tests for the value sanitizer
//!
//! Tests depth and size bounds and termination on cyclic object graphs.

use cartprobe_debug::{LogValue, Marker, SanitizeConfig, Sanitizer};
use cartprobe_foundation::{ObjectRef, Value};
use proptest::prelude::*;

fn depth(value: &LogValue) -> usize {
    match value {
        LogValue::List(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        LogValue::Map(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

fn has_marker(value: &LogValue, wanted: &dyn Fn(&Marker) -> bool) -> bool {
    match value {
        LogValue::Marker(m) => wanted(m),
        LogValue::List(items) => items.iter().any(|v| has_marker(v, wanted)),
        LogValue::Map(map) => map.values().any(|v| has_marker(v, wanted)),
        _ => false,
    }
}

fn longest_collection(value: &LogValue) -> usize {
    match value {
        LogValue::List(items) => items
            .iter()
            .map(longest_collection)
            .max()
            .unwrap_or(0)
            .max(items.len()),
        LogValue::Map(map) => map
            .values()
            .map(longest_collection)
            .max()
            .unwrap_or(0)
            .max(map.len()),
        _ => 0,
    }
}

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z]{0,8}".prop_map(Value::string),
    ];
    leaf.prop_recursive(8, 256, 12, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..12).prop_map(Value::List),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..12).prop_map(Value::map),
        ]
    })
}

/// Builds a chain of `len` records whose last link points back at `back_to`.
fn cyclic_chain(len: usize, back_to: usize) -> Value {
    let nodes: Vec<ObjectRef> = (0..len).map(|i| ObjectRef::record(format!("Node{i}"))).collect();
    for (i, node) in nodes.iter().enumerate() {
        let next = nodes.get(i + 1).unwrap_or(&nodes[back_to]);
        node.set_field("next", Value::Object(next.clone()));
    }
    Value::Object(nodes[0].clone())
}

// =============================================================================
// Bounds
// =============================================================================

#[test]
fn four_level_mapping_with_cap_two() {
    let value = Value::map([(
        "l1",
        Value::map([("l2", Value::map([("l3", Value::map([("l4", Value::Int(1))]))]))]),
    )]);
    let out = Sanitizer::new(SanitizeConfig::new().with_max_depth(2)).sanitize(&value);

    let level3 = out.get("l1").and_then(|v| v.get("l2")).and_then(|v| v.get("l3"));
    assert_eq!(level3, Some(&LogValue::Marker(Marker::MaxDepth)));
    assert_eq!(Marker::MaxDepth.to_string(), "[Max Depth Reached]");
}

#[test]
fn sequence_of_150_with_cap_100() {
    let value = Value::list((0..150).map(Value::Int));
    let out = Sanitizer::new(SanitizeConfig::default()).sanitize(&value);
    assert_eq!(out, LogValue::Marker(Marker::LargeCollection(150)));
}

proptest! {
    #[test]
    fn output_respects_depth_and_size(
        value in arb_value(),
        max_depth in 0usize..6,
        max_len in 0usize..10,
    ) {
        let config = SanitizeConfig::new()
            .with_max_depth(max_depth)
            .with_max_collection_len(max_len);
        let out = Sanitizer::new(config).sanitize(&value);

        prop_assert!(depth(&out) <= max_depth + 1);
        prop_assert!(longest_collection(&out) <= max_len);
    }

    #[test]
    fn cyclic_chains_terminate(len in 1usize..20, back in 0usize..20) {
        let back_to = back % len;
        let value = cyclic_chain(len, back_to);
        let out = Sanitizer::new(SanitizeConfig::new().with_max_depth(64)).sanitize(&value);

        let circular = has_marker(&out, &|m| {
            matches!(m, Marker::Circular(class) if *class == format!("Node{back_to}"))
        });
        prop_assert!(circular);
    }

    #[test]
    fn cyclic_chains_terminate_under_tight_depth(len in 1usize..20, max_depth in 0usize..4) {
        let value = cyclic_chain(len, 0);
        let out = Sanitizer::new(SanitizeConfig::new().with_max_depth(max_depth)).sanitize(&value);
        prop_assert!(out.contains_marker());
    }
}
