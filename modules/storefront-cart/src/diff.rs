//! CartDiffEngine — derives line-level commerce events from two snapshots.

use serde_json::json;
use std::sync::Arc;
use storefront_events::types::{CART_UPDATED, PRODUCT_ADDED_TO_CART, PRODUCT_REMOVED_FROM_CART};
use storefront_events::EventBus;

use crate::types::CartSnapshot;

/// Compares the previous and current snapshots and publishes `cart_updated`
/// plus zero or more `product_added_to_cart` / `product_removed_from_cart`
/// events. Pure with respect to the snapshots; all output goes through the
/// bus.
pub struct CartDiffEngine {
    bus: Arc<EventBus>,
}

impl CartDiffEngine {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Run one diff. Callers must have cleared the snapshots through the
    /// dedup guard first.
    ///
    /// `cart_updated` always publishes before any line-level event. Removals
    /// and quantity changes follow `previous.lines` order and complete before
    /// additions, which follow `current.lines` order.
    pub fn run(&self, previous: Option<&CartSnapshot>, current: &CartSnapshot) {
        let Some(previous) = previous else {
            // First observation: nothing meaningful to diff against.
            self.bus.publish(
                CART_UPDATED,
                json!({"cart": current, "prevCart": null}),
            );
            return;
        };

        self.bus.publish(
            CART_UPDATED,
            json!({"cart": current, "prevCart": previous}),
        );

        // Phase one: walk previous lines, reporting removals and quantity
        // changes on surviving lines.
        for prev_line in &previous.lines {
            let mut matches = current.lines_with_id(&prev_line.id);
            let (first, second) = (matches.next(), matches.next());

            match (first, second) {
                (Some(current_line), None) => {
                    if current_line.quantity > prev_line.quantity {
                        // Quantity increase on an existing line is an
                        // addition, not a delta.
                        self.bus.publish(
                            PRODUCT_ADDED_TO_CART,
                            json!({
                                "prevLine": prev_line,
                                "currentLine": current_line,
                                "cart": current,
                                "prevCart": previous,
                            }),
                        );
                    } else if current_line.quantity < prev_line.quantity {
                        self.bus.publish(
                            PRODUCT_REMOVED_FROM_CART,
                            json!({
                                "prevLine": prev_line,
                                "currentLine": current_line,
                                "cart": current,
                                "prevCart": previous,
                            }),
                        );
                    }
                    // Equal quantity: the line is unchanged, no event.
                }
                (None, _) => {
                    // Line vanished entirely.
                    self.bus.publish(
                        PRODUCT_REMOVED_FROM_CART,
                        json!({
                            "prevLine": prev_line,
                            "cart": current,
                            "prevCart": previous,
                        }),
                    );
                }
                (Some(_), Some(_)) => {
                    // Ambiguous: the id appears on several current lines.
                    // No single counterpart exists, so no event.
                }
            }
        }

        // Phase two: lines that exist only in the current snapshot.
        for current_line in &current.lines {
            if previous.lines_with_id(&current_line.id).next().is_none() {
                self.bus.publish(
                    PRODUCT_ADDED_TO_CART,
                    json!({
                        "currentLine": current_line,
                        "cart": current,
                        "prevCart": previous,
                    }),
                );
            }
        }
    }
}
