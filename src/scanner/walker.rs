//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, which traverses a directory
//! tree and hands one [`Task`] per qualifying entry to a dispatch callback.
//! Directory reads run in parallel on jwalk's rayon pool, but entries are
//! consumed on the calling thread, so a blocking callback (the worker pool's
//! `submit`) throttles dispatch. It does not bound directory reads: jwalk
//! reads ahead into unbounded internal queues.
//!
//! # Filtering order
//!
//! 1. Exclusion rules against the full path
//! 2. `symlink_metadata` (links are never followed)
//! 3. Size threshold against the entry's own size
//! 4. Classification into [`EntryKind`]
//!
//! Entries that fail to stat are logged and skipped. Only a root that cannot
//! be opened fails the walk.
//!
//! # Example
//!
//! ```no_run
//! use favscan::scanner::{ExclusionSet, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     rules: ExclusionSet::from_patterns(["*.tmp"]).unwrap(),
//!     min_size: 1024,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), config);
//! let (tasks, stats) = walker.collect_tasks().unwrap();
//! println!("{} of {} entries qualify", tasks.len(), stats.visited);
//! ```

use std::convert::Infallible;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{EntryKind, ExcludePolicy, ExclusionSet, Task, WalkError, WalkStats, WalkerConfig};

/// Error raised when the dispatch callback refuses a task.
#[derive(thiserror::Error, Debug)]
#[error("Failed to dispatch {path}: {source}")]
pub struct DispatchError {
    /// Path of the task that could not be dispatched
    pub path: PathBuf,
    /// The callback's error
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

/// Directory walker that dispatches qualifying entries.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path, config: WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    /// The root being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Make sure the root exists, is a directory and can be listed.
    fn check_root(&self) -> Result<(), WalkError> {
        let metadata = match fs::metadata(&self.root) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(WalkError::RootNotFound(self.root.clone()));
            }
            Err(source) => {
                return Err(WalkError::RootUnreadable {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        if !metadata.is_dir() {
            return Err(WalkError::NotADirectory(self.root.clone()));
        }

        fs::read_dir(&self.root)
            .map(drop)
            .map_err(|source| WalkError::RootUnreadable {
                path: self.root.clone(),
                source,
            })
    }

    /// Walk the tree, calling `dispatch` for every qualifying entry.
    ///
    /// The callback may block; traversal resumes when it returns. If it
    /// returns an error the walk stops and the error is propagated, since a
    /// refused dispatch means nothing downstream is consuming tasks anymore.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError`] if the root cannot be opened, or wraps the
    /// callback's error in [`WalkError::Dispatch`].
    pub fn walk<F, E>(&self, mut dispatch: F) -> Result<WalkStats, WalkError>
    where
        F: FnMut(Task) -> Result<(), E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.check_root()?;

        let mut stats = WalkStats::default();
        let rules = Arc::new(self.config.rules.clone());

        let mut walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .sort(false);

        if self.config.exclude_policy == ExcludePolicy::Prune && !rules.is_empty() {
            let prune_rules = Arc::clone(&rules);
            walk_dir = walk_dir.process_read_dir(move |_depth, _path, _state, children| {
                prune_excluded_dirs(&prune_rules, children);
            });
        }

        for entry_result in walk_dir {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    stats.errors += 1;
                    let path = e.path().map_or_else(|| self.root.clone(), Path::to_path_buf);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    continue;
                }
            };

            let path = entry.path();

            // Skip the root directory itself
            if path == self.root {
                continue;
            }
            stats.visited += 1;

            if let Some(rule) = rules.matching_rule(&path.to_string_lossy()) {
                stats.excluded += 1;
                log::trace!("Excluded by '{}': {}", rule.pattern(), path.display());
                continue;
            }

            let metadata = match fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    stats.errors += 1;
                    log_stat_error(&path, &e);
                    continue;
                }
            };

            let size = metadata.len();
            if size < self.config.min_size {
                stats.too_small += 1;
                continue;
            }

            let kind = EntryKind::from_file_type(metadata.file_type());
            log::trace!("Dispatching {:?} ({} bytes): {}", kind, size, path.display());

            dispatch(Task::new(path.clone(), kind)).map_err(|e| {
                WalkError::Dispatch(DispatchError {
                    path,
                    source: Box::new(e),
                })
            })?;
            stats.dispatched += 1;
        }

        log::debug!(
            "Walk of {} finished: visited={} excluded={} too_small={} dispatched={} errors={}",
            self.root.display(),
            stats.visited,
            stats.excluded,
            stats.too_small,
            stats.dispatched,
            stats.errors
        );

        Ok(stats)
    }

    /// Walk the tree and collect every task instead of dispatching it.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError`] if the root cannot be opened.
    pub fn collect_tasks(&self) -> Result<(Vec<Task>, WalkStats), WalkError> {
        let mut tasks = Vec::new();
        let stats = self.walk(|task| {
            tasks.push(task);
            Ok::<(), Infallible>(())
        })?;
        Ok((tasks, stats))
    }
}

/// Stop jwalk from reading the children of excluded directories.
fn prune_excluded_dirs(
    rules: &ExclusionSet,
    children: &mut [Result<jwalk::DirEntry<((), ())>, jwalk::Error>],
) {
    for child in children.iter_mut().flatten() {
        if child.file_type().is_dir() && rules.is_excluded(&child.path()) {
            log::trace!("Pruning excluded directory: {}", child.path().display());
            child.read_children_path = None;
        }
    }
}

/// Log a per-entry stat failure at a level matching its severity.
fn log_stat_error(path: &Path, error: &std::io::Error) {
    match error.kind() {
        ErrorKind::PermissionDenied => {
            log::warn!("Permission denied: {}", path.display());
        }
        ErrorKind::NotFound => {
            log::debug!("File not found (may have been deleted): {}", path.display());
        }
        _ => {
            log::warn!("Error getting file info for {}: {}", path.display(), error);
        }
    }
}
