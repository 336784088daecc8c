//! In-process metadata cache.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{CacheResult, KeyScan, MetadataCache};

/// A [`MetadataCache`] held in a mutex-guarded map.
///
/// Used by tests and by `memory://` runs. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Delete a key, returning its value.
    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().remove(key)
    }

    /// Delete everything.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl MetadataCache for MemoryCache {
    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn scan_keys(&self) -> CacheResult<KeyScan<'_>> {
        // Snapshot so callers can read and write while iterating
        let keys: Vec<String> = self.entries.lock().keys().cloned().collect();
        Ok(KeyScan::new(keys.into_iter().map(Ok)))
    }
}
