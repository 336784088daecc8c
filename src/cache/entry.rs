//! Cached record definitions.

use std::fs::Metadata;
use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scanner::PathKey;

/// Size and modification time of one file, as stored in the cache.
///
/// Produced by statting a path and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub mod_time: DateTime<Utc>,
}

impl FileRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(size: u64, mod_time: DateTime<Utc>) -> Self {
        Self { size, mod_time }
    }

    /// Build a record from filesystem metadata.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the platform does not report modification
    /// times.
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        let modified = metadata.modified()?;
        Ok(Self {
            size: metadata.len(),
            mod_time: DateTime::<Utc>::from(modified),
        })
    }

    /// Modification time as Unix epoch seconds (UTC).
    #[must_use]
    pub fn mod_time_epoch(&self) -> i64 {
        self.mod_time.timestamp()
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns a serialization error; in practice this cannot fail for a
    /// well-formed record.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize a stored record.
    ///
    /// # Errors
    ///
    /// Returns an error for bytes that are not a record (corrupt or foreign).
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// The pair of cache writes that commits one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Primary key: hash of the absolute path
    pub key: PathKey,
    /// The absolute path, stored under the reverse key
    pub path: String,
    /// The record stored under the primary key
    pub record: FileRecord,
}

impl CacheEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(key: PathKey, path: String, record: FileRecord) -> Self {
        Self { key, path, record }
    }

    /// The `(key, value)` pairs to write, record first.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized.
    pub fn to_writes(&self) -> Result<Vec<(String, Vec<u8>)>, serde_json::Error> {
        Ok(vec![
            (self.key.as_str().to_string(), self.record.encode()?),
            (self.key.reverse_key(), self.path.as_bytes().to_vec()),
        ])
    }
}
