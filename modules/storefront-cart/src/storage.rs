//! Key-value storage boundary for state that must survive process restarts.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Narrow persisted-storage interface supplied by the host (browser
/// localStorage, a file, a cookie jar). Only the dedup record lives behind
/// it. Synchronous on purpose: the dedup write must complete before any
/// derived event is published.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// In-memory storage. Process-lifetime only — dedup state is lost on
/// restart, so reloads may re-emit. Useful for tests and hosts without
/// durable storage.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
