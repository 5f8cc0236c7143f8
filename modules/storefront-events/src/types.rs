//! Core types for the event bus. Domain-agnostic.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Well-known event names. The name set is open; anything outside this list
/// is treated as a free-form custom event and delivered the same way.
pub const PAGE_VIEWED: &str = "page_viewed";
pub const PRODUCT_VIEWED: &str = "product_viewed";
pub const COLLECTION_VIEWED: &str = "collection_viewed";
pub const CART_VIEWED: &str = "cart_viewed";
pub const SEARCH_VIEWED: &str = "search_viewed";
pub const CART_UPDATED: &str = "cart_updated";
pub const PRODUCT_ADDED_TO_CART: &str = "product_added_to_cart";
pub const PRODUCT_REMOVED_FROM_CART: &str = "product_removed_from_cart";

/// Payload key the bus stamps with the publish time (epoch milliseconds)
/// when the publisher did not set one itself.
pub const EVENT_TIMESTAMP_KEY: &str = "eventTimestamp";

/// A published event. The payload is immutable once published; subscribers
/// receive a shared reference and must not rely on mutating it.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

/// Subscriber callback. An `Err` is logged and swallowed by the bus; it never
/// aborts delivery to other subscribers or the hold-queue drain.
pub type EventCallback = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;
