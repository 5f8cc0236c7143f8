//! DedupGuard — at-most-once processing of cart versions across reloads.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::storage::KeyValueStorage;
use crate::types::{CartSnapshot, DedupRecord};

/// Guards against re-emitting events for a cart version that an earlier
/// pipeline run (possibly before a page reload) already processed.
///
/// The record is read once per snapshot arrival and rewritten once; it is
/// the only pipeline state that survives process restarts.
pub struct DedupGuard {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl DedupGuard {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Whether this snapshot is a version we haven't processed yet.
    ///
    /// Fails open: an unreadable or corrupt record is treated as "no prior
    /// record" rather than blocking the pipeline.
    pub fn should_process(&self, snapshot: &CartSnapshot) -> bool {
        match self.read_record() {
            Some(record) => !record.matches(snapshot),
            None => true,
        }
    }

    /// Overwrite the persisted record with this snapshot's version.
    ///
    /// Called immediately after a positive `should_process` and before any
    /// derived event is published, so a synchronous re-entrant run cannot
    /// reprocess the same version.
    pub fn mark_processed(&self, snapshot: &CartSnapshot) {
        let record = DedupRecord::of(snapshot);
        let encoded = match serde_json::to_string(&record) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode dedup record");
                return;
            }
        };

        if let Err(e) = self.storage.set(&self.key, &encoded) {
            // Non-fatal: the next run may re-emit, which is the fail-open
            // trade-off. The pipeline keeps going.
            warn!(error = %e, key = %self.key, "failed to persist dedup record");
        }
    }

    fn read_record(&self) -> Option<DedupRecord> {
        let raw = match self.storage.get(&self.key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, key = %self.key, "dedup record unreadable, treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, key = %self.key, "corrupt dedup record, treating as absent");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::CartLine;
    use chrono::Utc;

    fn snapshot(id: &str) -> CartSnapshot {
        CartSnapshot {
            id: id.to_string(),
            updated_at: Utc::now(),
            lines: Vec::<CartLine>::new(),
        }
    }

    #[test]
    fn unseen_snapshot_is_processed_then_suppressed() {
        let storage = Arc::new(MemoryStorage::new());
        let guard = DedupGuard::new(storage, "cartLastUpdatedAt");
        let cart = snapshot("gid://cart/1");

        assert!(guard.should_process(&cart));
        guard.mark_processed(&cart);
        assert!(!guard.should_process(&cart));
    }

    #[test]
    fn same_id_newer_timestamp_is_processed() {
        let storage = Arc::new(MemoryStorage::new());
        let guard = DedupGuard::new(storage, "cartLastUpdatedAt");

        let mut cart = snapshot("gid://cart/1");
        guard.mark_processed(&cart);

        cart.updated_at = cart.updated_at + chrono::Duration::seconds(5);
        assert!(guard.should_process(&cart));
    }

    #[test]
    fn corrupt_record_fails_open() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("cartLastUpdatedAt", "not json at all").unwrap();

        let guard = DedupGuard::new(storage, "cartLastUpdatedAt");
        assert!(guard.should_process(&snapshot("gid://cart/1")));
    }
}
