//! Cart analytics pipeline: snapshot validation, two-generation snapshot
//! store, persisted dedup guard, and the diff engine that derives
//! `cart_updated` / `product_added_to_cart` / `product_removed_from_cart`
//! events from successive cart states.
//!
//! Publishes onto a [`storefront_events::EventBus`] supplied by the host.

pub mod dedup;
pub mod diff;
pub mod error;
pub mod pipeline;
pub mod snapshot;
pub mod storage;
pub mod types;

pub use dedup::DedupGuard;
pub use diff::CartDiffEngine;
pub use error::SnapshotError;
pub use pipeline::{AnalyticsConfig, AnalyticsPipeline};
pub use snapshot::{CartSnapshotStore, CartValue};
pub use storage::{KeyValueStorage, MemoryStorage};
pub use types::{CartLine, CartSnapshot, DedupRecord, RawCartLine, RawCartSnapshot};
