//! Integration tests for the event log
//!
//! Tests the cap invariant, truncation, and formatting of a filled log.

use cartprobe_debug::{
    EventFormatter, EventKind, EventLog, HumanFormatter, JsonFormatter, LIMIT_REACHED_MESSAGE,
    LogConfig, LogValue, PAYLOAD_TOO_LARGE_MESSAGE,
};
use proptest::prelude::*;

// =============================================================================
// Cap
// =============================================================================

#[test]
fn cap_of_1000_with_1005_appends() {
    let mut log = EventLog::new(LogConfig::default());
    for i in 0..1005 {
        log.info(format!("event {i}"));
    }

    assert_eq!(log.len(), 1000);
    assert!(log.is_limit_reached());
    assert_eq!(log.all()[999].message, LIMIT_REACHED_MESSAGE);
    assert_eq!(log.all()[999].kind, EventKind::Warning);
    assert_eq!(log.all()[998].message, "event 998");

    log.error("one more");
    assert_eq!(log.len(), 1000);
}

proptest! {
    #[test]
    fn stored_events_never_exceed_cap(cap in 0usize..200, appends in 0usize..400) {
        let mut log = EventLog::new(LogConfig::new().with_max_events(cap));
        for i in 0..appends {
            log.append(EventKind::ALL[i % EventKind::ALL.len()], format!("e{i}"), None);
        }

        prop_assert_eq!(log.len(), appends.min(cap));
        let markers = log.iter().filter(|e| e.message == LIMIT_REACHED_MESSAGE).count();
        if cap > 0 && appends >= cap {
            prop_assert!(log.is_limit_reached());
            prop_assert_eq!(markers, 1);
            prop_assert_eq!(&log.all()[cap - 1].message, LIMIT_REACHED_MESSAGE);
        } else {
            prop_assert_eq!(markers, 0);
        }
    }

    #[test]
    fn ids_strictly_increase(appends in 1usize..100) {
        let mut log = EventLog::new(LogConfig::default());
        for i in 0..appends {
            log.info(format!("e{i}"));
        }
        let ids: Vec<u64> = log.iter().map(|e| e.id).collect();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}

// =============================================================================
// Truncation
// =============================================================================

#[test]
fn long_message_and_payload_are_bounded() {
    let config = LogConfig::new()
        .with_max_message_chars(10)
        .with_max_payload_bytes(64);
    let mut log = EventLog::new(config);

    let big = LogValue::List((0..100).map(LogValue::Int).collect());
    log.append(EventKind::Info, "x".repeat(50), Some(big));

    let event = &log.all()[0];
    assert_eq!(event.message.chars().count(), 10);
    let payload = event.payload.as_ref().unwrap();
    assert_eq!(
        payload.get("message").and_then(LogValue::as_str),
        Some(PAYLOAD_TOO_LARGE_MESSAGE)
    );
}

// =============================================================================
// Formatting
// =============================================================================

#[test]
fn json_dump_of_full_log_parses() {
    let mut log = EventLog::new(LogConfig::new().with_max_events(3));
    log.info("a");
    log.success("b");
    log.error("c");

    let json = JsonFormatter::new().format_many(log.all());
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let kinds: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["info", "success", "warning"]);
}

#[test]
fn human_dump_is_one_line_per_event() {
    let mut log = EventLog::new(LogConfig::default());
    log.info("first");
    log.warning("second");

    let text = HumanFormatter::new().format_many(log.all());
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("WARNING"));
}
