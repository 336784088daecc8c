//! Task body run by the worker pool.
//!
//! Regular files are restatted, serialized and committed to the cache as a
//! record plus a reverse-path entry. The progress counter moves only after
//! that batched write succeeds.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheEntry, CacheError, FileRecord, MetadataCache};
use crate::progress::ProgressCounter;
use crate::scanner::{hash_fs_path, EntryKind, Task};

/// Errors while recording a single file.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// The file could not be statted.
    #[error("Error stating file: {0}")]
    Stat(#[source] std::io::Error),

    /// The record could not be serialized.
    #[error("Error encoding record: {0}")]
    Encode(#[from] serde_json::Error),

    /// The batched cache write failed.
    #[error("Error executing pipeline: {0}")]
    Cache(#[from] CacheError),
}

/// Records qualifying files in the metadata cache.
#[derive(Clone)]
pub struct FileProcessor {
    cache: Arc<dyn MetadataCache>,
    counter: Arc<ProgressCounter>,
}

impl std::fmt::Debug for FileProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProcessor")
            .field("processed", &self.counter.get())
            .finish_non_exhaustive()
    }
}

impl FileProcessor {
    /// Create a processor writing to `cache` and counting into `counter`.
    #[must_use]
    pub fn new(cache: Arc<dyn MetadataCache>, counter: Arc<ProgressCounter>) -> Self {
        Self { cache, counter }
    }

    /// Run one task. Never fails: errors are logged and the task is dropped.
    pub fn handle(&self, task: Task) {
        match task.kind {
            EntryKind::File => {
                if let Err(e) = self.process(&task.path) {
                    log::error!("{}: {}", task.path.display(), e);
                }
            }
            EntryKind::Directory => {
                log::debug!("Processing directory: {}", task.path.display());
            }
            EntryKind::Symlink => {
                log::debug!("Processing symlink: {}", task.path.display());
            }
            EntryKind::Other => {
                log::debug!("Skipping unknown type: {}", task.path.display());
            }
        }
    }

    /// Record one regular file and bump the counter.
    ///
    /// The file is statted again (following symlinks), so the stored record
    /// reflects the file at write time. Re-running on the same file
    /// overwrites the same two keys.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if the stat, the encoding or the cache
    /// write fails. The counter is untouched in that case.
    pub fn process(&self, path: &Path) -> Result<FileRecord, ProcessError> {
        let metadata = fs::metadata(path).map_err(ProcessError::Stat)?;
        let record = FileRecord::from_metadata(&metadata).map_err(ProcessError::Stat)?;

        let (key, path_str) = hash_fs_path(path);
        let entry = CacheEntry::new(key, path_str, record);
        let writes = entry.to_writes()?;

        self.cache.set_many(&writes)?;

        let processed = self.counter.increment();
        log::trace!(
            "Recorded {} ({} bytes), {} processed",
            path.display(),
            entry.record.size,
            processed
        );
        Ok(entry.record)
    }

    /// Shared progress counter.
    #[must_use]
    pub fn counter(&self) -> &Arc<ProgressCounter> {
        &self.counter
    }
}
