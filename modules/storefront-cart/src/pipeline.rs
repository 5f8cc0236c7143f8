//! AnalyticsPipeline — the wiring of snapshot store, dedup guard, and diff
//! engine behind a single cart-observation entry point.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use storefront_events::EventBus;
use tracing::debug;

use crate::dedup::DedupGuard;
use crate::diff::CartDiffEngine;
use crate::snapshot::{CartSnapshotStore, CartValue};
use crate::storage::KeyValueStorage;

/// Storage key for the dedup record, shared with prior page loads.
pub const DEDUP_STORAGE_KEY: &str = "cartLastUpdatedAt";

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Key under which the dedup record lives in the host's storage.
    pub dedup_storage_key: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            dedup_storage_key: DEDUP_STORAGE_KEY.to_string(),
        }
    }
}

/// Control flow per observed cart value: resolve → validate → shift the
/// snapshot store → dedup check → mark processed → diff and publish.
///
/// Construct one pipeline per bus at application start; there are no
/// module-level singletons.
pub struct AnalyticsPipeline {
    bus: Arc<EventBus>,
    store: Mutex<CartSnapshotStore>,
    dedup: DedupGuard,
    diff: CartDiffEngine,
}

impl AnalyticsPipeline {
    pub fn new(
        bus: Arc<EventBus>,
        storage: Arc<dyn KeyValueStorage>,
        config: AnalyticsConfig,
    ) -> Self {
        Self {
            bus: bus.clone(),
            store: Mutex::new(CartSnapshotStore::new()),
            dedup: DedupGuard::new(storage, config.dedup_storage_key),
            diff: CartDiffEngine::new(bus),
        }
    }

    /// The bus this pipeline publishes on, for hosts that want to subscribe
    /// or publish their own events through the same instance.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Feed a newly observed cart value through the pipeline.
    ///
    /// Accepts a resolved snapshot, `None` (the collaborator had nothing to
    /// hand over), or a deferred value; awaiting the deferred form is the
    /// only suspension point. Everything after resolution runs
    /// synchronously: the dedup record is overwritten before the first
    /// derived event publishes, so a re-entrant observation triggered by a
    /// subscriber cannot reprocess the same cart version.
    pub async fn observe_cart(&self, value: impl Into<CartValue>) {
        let Some(raw) = value.into().resolve().await else {
            return;
        };

        let (previous, current) = {
            let mut store = self.lock_store();
            if !store.observe(raw) {
                return;
            }
            match store.current().cloned() {
                Some(current) => (store.previous().cloned(), current),
                None => return,
            }
        };

        if !self.dedup.should_process(&current) {
            debug!(cart_id = %current.id, "cart version already processed, skipping diff");
            return;
        }
        self.dedup.mark_processed(&current);

        self.diff.run(previous.as_ref(), &current);
    }

    fn lock_store(&self) -> MutexGuard<'_, CartSnapshotStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
