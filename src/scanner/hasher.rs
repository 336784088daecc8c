//! SHA-256 path hasher.
//!
//! # Overview
//!
//! Cache keys are derived from the absolute path of a file, never from its
//! content. The digest is rendered as 64 lowercase hex characters so keys
//! written by earlier tooling against the same store remain readable.
//!
//! The key is not reversible, which is why every record is written together
//! with a reverse-path entry under [`REVERSE_KEY_PREFIX`].

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Prefix of the cache entry that maps a key back to its original path.
pub const REVERSE_KEY_PREFIX: &str = "path:";

/// Length of a rendered key in characters.
pub const KEY_LEN: usize = 64;

/// Fixed-length opaque key for a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    /// The key as stored in the cache.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the reverse-path entry for this key.
    ///
    /// # Example
    ///
    /// ```
    /// use favscan::scanner::hasher::hash_path;
    ///
    /// let key = hash_path("/data/big.iso");
    /// assert!(key.reverse_key().starts_with("path:"));
    /// ```
    #[must_use]
    pub fn reverse_key(&self) -> String {
        reverse_key_for(&self.0)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hash a path string into its cache key.
///
/// Deterministic and infallible: the same input always yields the same key.
#[must_use]
pub fn hash_path(path: &str) -> PathKey {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    PathKey(format!("{:x}", hasher.finalize()))
}

/// Hash a filesystem path, using its lossy UTF-8 form.
///
/// The returned string is the exact value that must be stored as the
/// reverse-path entry, so both sides agree for non-UTF-8 names.
#[must_use]
pub fn hash_fs_path(path: &Path) -> (PathKey, String) {
    let path_str = path.to_string_lossy().into_owned();
    (hash_path(&path_str), path_str)
}

/// Reverse-path key for an arbitrary raw cache key.
#[must_use]
pub fn reverse_key_for(key: &str) -> String {
    format!("{REVERSE_KEY_PREFIX}{key}")
}

/// Whether a raw cache key is a reverse-path entry.
#[must_use]
pub fn is_reverse_key(key: &str) -> bool {
    key.starts_with(REVERSE_KEY_PREFIX)
}
