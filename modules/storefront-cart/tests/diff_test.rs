//! Diff-engine correctness: which events a pair of snapshots produces, with
//! what payload shape, in what order.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use storefront_cart::{CartDiffEngine, CartLine, CartSnapshot};
use storefront_events::types::{
    CART_UPDATED, PRODUCT_ADDED_TO_CART, PRODUCT_REMOVED_FROM_CART,
};
use storefront_events::{Event, EventBus};

type EventLog = Arc<Mutex<Vec<(String, Value)>>>;

fn engine_with_log() -> (CartDiffEngine, EventLog) {
    let bus = Arc::new(EventBus::new(|| true));
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));

    for name in [CART_UPDATED, PRODUCT_ADDED_TO_CART, PRODUCT_REMOVED_FROM_CART] {
        let log = log.clone();
        bus.subscribe(
            name,
            Arc::new(move |event: &Event| -> anyhow::Result<()> {
                log.lock()
                    .unwrap()
                    .push((event.name.clone(), event.payload.clone()));
                Ok(())
            }),
        );
    }

    (CartDiffEngine::new(bus), log)
}

fn ts(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, secs).unwrap()
}

fn snapshot(secs: u32, lines: &[(&str, u32)]) -> CartSnapshot {
    CartSnapshot {
        id: "gid://cart/1".to_string(),
        updated_at: ts(secs),
        lines: lines
            .iter()
            .map(|(id, quantity)| CartLine {
                id: id.to_string(),
                quantity: *quantity,
                merchandise: json!({"sku": format!("sku-{id}")}),
            })
            .collect(),
    }
}

fn names(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
}

// =========================================================================
// First observation
// =========================================================================

#[test]
fn first_observation_publishes_cart_updated_only() {
    let (engine, log) = engine_with_log();
    let current = snapshot(0, &[("L1", 2), ("L2", 1)]);

    engine.run(None, &current);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    let (name, payload) = &log[0];
    assert_eq!(name, CART_UPDATED);
    assert_eq!(payload["prevCart"], Value::Null);
    assert_eq!(payload["cart"]["id"], "gid://cart/1");
}

// =========================================================================
// Line-level diffs
// =========================================================================

#[test]
fn pure_addition_emits_one_added_event() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[]);
    let current = snapshot(10, &[("L1", 2)]);

    engine.run(Some(&previous), &current);

    assert_eq!(names(&log), vec![CART_UPDATED, PRODUCT_ADDED_TO_CART]);
    let log = log.lock().unwrap();
    let (_, payload) = &log[1];
    assert_eq!(payload["currentLine"]["id"], "L1");
    assert_eq!(payload["currentLine"]["quantity"], 2);
    // A brand-new line has no previous counterpart.
    assert!(payload.get("prevLine").is_none());
}

#[test]
fn pure_removal_emits_one_removed_event_without_current_line() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[("L1", 1)]);
    let current = snapshot(10, &[]);

    engine.run(Some(&previous), &current);

    assert_eq!(names(&log), vec![CART_UPDATED, PRODUCT_REMOVED_FROM_CART]);
    let log = log.lock().unwrap();
    let (_, payload) = &log[1];
    assert_eq!(payload["prevLine"]["id"], "L1");
    assert!(payload.get("currentLine").is_none());
}

#[test]
fn quantity_increase_is_reported_as_addition() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[("L1", 1)]);
    let current = snapshot(10, &[("L1", 3)]);

    engine.run(Some(&previous), &current);

    assert_eq!(names(&log), vec![CART_UPDATED, PRODUCT_ADDED_TO_CART]);
    let log = log.lock().unwrap();
    let (_, payload) = &log[1];
    assert_eq!(payload["prevLine"]["quantity"], 1);
    assert_eq!(payload["currentLine"]["quantity"], 3);
}

#[test]
fn quantity_decrease_is_reported_as_removal() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[("L1", 3)]);
    let current = snapshot(10, &[("L1", 1)]);

    engine.run(Some(&previous), &current);

    assert_eq!(names(&log), vec![CART_UPDATED, PRODUCT_REMOVED_FROM_CART]);
    let log = log.lock().unwrap();
    let (_, payload) = &log[1];
    assert_eq!(payload["prevLine"]["quantity"], 3);
    assert_eq!(payload["currentLine"]["quantity"], 1);
}

#[test]
fn unchanged_line_emits_nothing() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[("L1", 2)]);
    let current = snapshot(10, &[("L1", 2)]);

    engine.run(Some(&previous), &current);

    assert_eq!(names(&log), vec![CART_UPDATED]);
}

#[test]
fn emptying_the_cart_emits_a_removal_per_line_in_order() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[("L1", 1), ("L2", 4), ("L3", 2)]);
    let current = snapshot(10, &[]);

    engine.run(Some(&previous), &current);

    assert_eq!(
        names(&log),
        vec![
            CART_UPDATED,
            PRODUCT_REMOVED_FROM_CART,
            PRODUCT_REMOVED_FROM_CART,
            PRODUCT_REMOVED_FROM_CART,
        ]
    );
    let log = log.lock().unwrap();
    assert_eq!(log[1].1["prevLine"]["id"], "L1");
    assert_eq!(log[2].1["prevLine"]["id"], "L2");
    assert_eq!(log[3].1["prevLine"]["id"], "L3");
}

#[test]
fn removals_and_changes_precede_additions() {
    let (engine, log) = engine_with_log();
    // L1 vanishes, L2 shrinks, L3 grows, L4 is new.
    let previous = snapshot(0, &[("L1", 1), ("L2", 3), ("L3", 1)]);
    let current = snapshot(10, &[("L3", 2), ("L2", 1), ("L4", 5)]);

    engine.run(Some(&previous), &current);

    // Phase one follows previous.lines order; phase two current.lines order.
    assert_eq!(
        names(&log),
        vec![
            CART_UPDATED,
            PRODUCT_REMOVED_FROM_CART, // L1 gone
            PRODUCT_REMOVED_FROM_CART, // L2 quantity down
            PRODUCT_ADDED_TO_CART,     // L3 quantity up
            PRODUCT_ADDED_TO_CART,     // L4 new
        ]
    );
    let log = log.lock().unwrap();
    assert_eq!(log[1].1["prevLine"]["id"], "L1");
    assert_eq!(log[2].1["prevLine"]["id"], "L2");
    assert_eq!(log[3].1["currentLine"]["id"], "L3");
    assert_eq!(log[4].1["currentLine"]["id"], "L4");
}

#[test]
fn duplicate_line_ids_in_current_produce_no_line_event() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[("L1", 1)]);
    let current = snapshot(10, &[("L1", 1), ("L1", 2)]);

    engine.run(Some(&previous), &current);

    // No single counterpart exists for L1, so only the cart-level event.
    assert_eq!(names(&log), vec![CART_UPDATED]);
}

#[test]
fn cart_updated_carries_both_snapshots() {
    let (engine, log) = engine_with_log();
    let previous = snapshot(0, &[("L1", 1)]);
    let current = snapshot(10, &[("L1", 2)]);

    engine.run(Some(&previous), &current);

    let log = log.lock().unwrap();
    let (_, payload) = &log[0];
    assert_eq!(payload["cart"]["lines"][0]["quantity"], 2);
    assert_eq!(payload["prevCart"]["lines"][0]["quantity"], 1);
    // The bus stamps a delivery timestamp on every payload.
    assert!(payload["eventTimestamp"].as_i64().is_some());
}
