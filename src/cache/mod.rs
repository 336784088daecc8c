//! Metadata cache for favscan.
//!
//! This module defines the contract the scanner needs from the external
//! key-value store and provides two implementations of it.
//!
//! # Architecture
//!
//! * [`MetadataCache`]: get / set / batched set / scan-all-keys.
//! * [`redis_cache`]: Redis-protocol backend with a small connection pool.
//! * [`memory`]: In-process backend for tests and offline runs.
//! * [`entry`]: The records stored in the cache.
//!
//! # Consistency
//!
//! Each file is committed as two keys written in one batched round trip:
//! the record under `hash(path)` and the path under `path:hash(path)`. The
//! batch is not a transaction. Readers treat a record without a resolvable
//! reverse entry as absent, which is what makes a partial write harmless.

pub mod entry;
pub mod memory;
pub mod redis_cache;

use std::sync::Arc;
use std::time::Duration;

pub use entry::{CacheEntry, FileRecord};
pub use memory::MemoryCache;
pub use redis_cache::{RedisCache, RedisOptions};

/// URL scheme selecting the in-process backend.
pub const MEMORY_URL: &str = "memory://";

/// Errors returned by cache backends.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The store could not be reached.
    #[error("Failed to connect to cache at '{url}': {reason}")]
    Connection {
        /// Store URL
        url: String,
        /// Why the connection failed
        reason: String,
    },

    /// A command failed in transport or on the server.
    #[error("Cache operation failed: {0}")]
    Operation(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Operation(err.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// A forward-only sequence of every key in the store.
///
/// Order is unspecified. The sequence cannot be restarted; call
/// [`MetadataCache::scan_keys`] again to enumerate afresh. A backend may
/// report a key more than once.
pub struct KeyScan<'a> {
    inner: Box<dyn Iterator<Item = CacheResult<String>> + 'a>,
}

impl<'a> KeyScan<'a> {
    /// Wrap a backend iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = CacheResult<String>> + 'a,
    {
        Self {
            inner: Box::new(iter),
        }
    }
}

impl Iterator for KeyScan<'_> {
    type Item = CacheResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Contract over the external key-value store.
///
/// Implementations must be safe to share between worker threads.
pub trait MetadataCache: Send + Sync {
    /// Upsert a single key.
    fn set(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    /// Upsert several keys in one round trip.
    ///
    /// Not atomic: on error, any subset of the keys may have been written.
    fn set_many(&self, entries: &[(String, Vec<u8>)]) -> CacheResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Fetch a key. `Ok(None)` means the key does not exist.
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Start a scan over every key currently stored.
    fn scan_keys(&self) -> CacheResult<KeyScan<'_>>;

    /// Check that the store is reachable.
    fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// Connection settings shared by the backends.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Read/write timeout per command
    pub io_timeout: Duration,
    /// `COUNT` hint for each `SCAN` round trip
    pub scan_batch: usize,
    /// Idle connections kept for reuse
    pub max_idle: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(30),
            scan_batch: 1000,
            max_idle: 20,
        }
    }
}

/// Open the backend named by `url` and verify it is reachable.
///
/// `memory://` selects [`MemoryCache`]; anything else is handed to the
/// Redis client.
///
/// # Errors
///
/// Returns [`CacheError::Connection`] if the URL is invalid or the store
/// does not answer a ping.
pub fn open_cache(url: &str, options: &CacheOptions) -> CacheResult<Arc<dyn MetadataCache>> {
    if url == MEMORY_URL {
        log::debug!("Using in-process metadata cache");
        return Ok(Arc::new(MemoryCache::new()));
    }

    let cache = RedisCache::connect(url, RedisOptions::from(options))?;
    Ok(Arc::new(cache))
}
