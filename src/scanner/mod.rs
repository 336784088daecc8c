//! Scanner module for directory traversal and path keys.
//!
//! This module provides functionality for:
//! - Parallel directory reads using jwalk, consumed on one thread
//! - Wildcard exclusion rules
//! - SHA-256 path keys for the metadata cache
//! - Lexical relative paths for reports
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal, filtering and task dispatch
//! - [`exclude`]: Exclusion rule compilation and pattern file loading
//! - [`hasher`]: Path hashing
//! - [`path_utils`]: Relative path computation
//!
//! # Example
//!
//! ```no_run
//! use favscan::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     min_size: 200 * 1024 * 1024,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/data"), config);
//! let (tasks, stats) = walker.collect_tasks().unwrap();
//! for task in &tasks {
//!     println!("{:?}: {}", task.kind, task.path.display());
//! }
//! println!("{} entries dispatched", stats.dispatched);
//! ```

pub mod exclude;
pub mod hasher;
pub mod path_utils;
pub mod walker;

use std::fs::FileType;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use exclude::{ExcludeError, ExclusionRule, ExclusionSet};
pub use hasher::{hash_fs_path, hash_path, PathKey, REVERSE_KEY_PREFIX};
pub use walker::Walker;

/// Classification of a filesystem entry from a non-following stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory
    Directory,
    /// A regular file
    File,
    /// A symbolic link (never followed)
    Symlink,
    /// Sockets, FIFOs, devices
    Other,
}

impl EntryKind {
    /// Classify a file type obtained without following symlinks.
    #[must_use]
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// A unit of work for the worker pool: one qualifying entry.
///
/// Built once per entry and moved into the pool by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Full path of the entry
    pub path: PathBuf,
    /// Entry classification at walk time
    pub kind: EntryKind,
}

impl Task {
    /// Create a new task.
    #[must_use]
    pub fn new(path: PathBuf, kind: EntryKind) -> Self {
        Self { path, kind }
    }
}

/// How excluded directories are treated during traversal.
///
/// This is one global choice for the whole walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcludePolicy {
    /// Skip the directory entry itself but still visit its children.
    #[default]
    Descend,
    /// Do not read the children of an excluded directory at all.
    Prune,
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Exclusion rules checked against every full path.
    pub rules: ExclusionSet,

    /// Minimum size in bytes (from `symlink_metadata`) for an entry to qualify.
    pub min_size: u64,

    /// Traversal policy for excluded directories.
    pub exclude_policy: ExcludePolicy,
}

impl WalkerConfig {
    /// Create a new walker configuration.
    #[must_use]
    pub fn new(rules: ExclusionSet, min_size: u64, exclude_policy: ExcludePolicy) -> Self {
        Self {
            rules,
            min_size,
            exclude_policy,
        }
    }
}

/// Counters collected over one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Entries yielded by the traversal, excluding the root
    pub visited: u64,
    /// Entries vetoed by an exclusion rule
    pub excluded: u64,
    /// Entries below the size threshold
    pub too_small: u64,
    /// Tasks handed to the dispatch callback
    pub dispatched: u64,
    /// Per-entry errors that were logged and skipped
    pub errors: u64,
}

/// Fatal errors for a walk. Per-entry failures are never returned here.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// The root does not exist.
    #[error("Path not found: {0}")]
    RootNotFound(PathBuf),

    /// The root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The root exists but cannot be opened.
    #[error("Cannot open directory {path}: {source}")]
    RootUnreadable {
        /// The root path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The dispatch callback refused a task.
    #[error(transparent)]
    Dispatch(#[from] walker::DispatchError),
}
