//! The scan pipeline: walk, drain, report.
//!
//! The walk feeds a [`WorkerPool`] running a [`FileProcessor`]. Reports are
//! only generated after [`WorkerPool::drain`] has returned, so every task
//! has finished before the cache is read back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::MetadataCache;
use crate::pool::{DrainStats, PoolError, WorkerPool};
use crate::processor::FileProcessor;
use crate::progress::{ProgressCounter, ProgressSink, ProgressTicker};
use crate::report::{
    ReportError, ReportGenerator, ReportOrder, MOD_TIME_REPORT_NAME, SIZE_REPORT_NAME,
};
use crate::scanner::path_utils::clean;
use crate::scanner::{Task, WalkError, WalkStats, Walker, WalkerConfig};

/// Errors that stop a scan before any report is written.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The walk could not start or was aborted.
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// The worker pool could not be started.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The progress thread could not be started.
    #[error("Failed to start progress reporter: {0}")]
    Progress(#[source] std::io::Error),
}

/// Settings for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Walk filters
    pub walker: WalkerConfig,
    /// Number of executor threads
    pub workers: usize,
    /// Interval between progress lines
    pub progress_interval: Duration,
}

/// One report's outcome.
#[derive(Debug)]
pub struct ReportOutcome {
    /// Sort order of the report
    pub order: ReportOrder,
    /// Where the report was (or would have been) written
    pub path: PathBuf,
    /// Failure, if any
    pub error: Option<ReportError>,
}

impl ReportOutcome {
    /// Whether the report was written.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a completed scan.
#[derive(Debug)]
pub struct ScanSummary {
    /// The root that was scanned, made absolute
    pub root: PathBuf,
    /// Walk counters
    pub walk: WalkStats,
    /// Pool counters
    pub drain: DrainStats,
    /// Files recorded in the cache by this run
    pub processed: u64,
    /// Size report outcome
    pub size_report: ReportOutcome,
    /// Modification time report outcome
    pub mod_time_report: ReportOutcome,
}

impl ScanSummary {
    /// Whether both reports were written.
    #[must_use]
    pub fn reports_ok(&self) -> bool {
        self.size_report.is_ok() && self.mod_time_report.is_ok()
    }
}

/// Make `root` absolute and lexically clean without resolving symlinks.
///
/// Cache keys hash the full path, so `/data` and `/data/sub/..` must map to
/// the same root.
///
/// # Errors
///
/// Returns [`WalkError::RootUnreadable`] if the current directory is needed
/// and cannot be read.
pub fn absolute_root(root: &Path) -> Result<PathBuf, WalkError> {
    let absolute = std::path::absolute(root).map_err(|source| WalkError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(clean(&absolute).into_iter().collect())
}

/// Run a full scan of `root` and write both reports into it.
///
/// Report failures do not abort the run; they are returned in the summary
/// after both reports have been attempted.
///
/// # Errors
///
/// Returns [`ScanError`] if the walk cannot start, the pool cannot be
/// started, or the walk is aborted.
pub fn run_scan(
    root: &Path,
    cache: Arc<dyn MetadataCache>,
    options: &ScanOptions,
    sink: Arc<dyn ProgressSink>,
) -> Result<ScanSummary, ScanError> {
    let root = absolute_root(root)?;
    let walker = Walker::new(&root, options.walker.clone());
    log::info!(
        "Scanning {} for files of at least {}",
        root.display(),
        bytesize::ByteSize::b(options.walker.min_size)
    );

    let counter = Arc::new(ProgressCounter::new());
    let processor = FileProcessor::new(Arc::clone(&cache), Arc::clone(&counter));
    let pool = WorkerPool::new(options.workers, move |task: Task| processor.handle(task))?;

    let ticker = ProgressTicker::start(
        Arc::clone(&counter),
        Arc::clone(&sink),
        options.progress_interval,
    )
    .map_err(ScanError::Progress)?;

    let walked = walker.walk(|task| pool.submit(task));

    // Drain even on a failed walk so no executor outlives the run
    let drain = pool.drain();
    ticker.stop();

    let walk = walked?;
    if drain.panicked > 0 {
        log::warn!("{} tasks panicked during the scan", drain.panicked);
    }

    let processed = counter.get();
    sink.on_finish(processed);

    let generator = ReportGenerator::new(cache);
    let size_report = write_report(&generator, &root, SIZE_REPORT_NAME, ReportOrder::BySize);
    let mod_time_report = write_report(
        &generator,
        &root,
        MOD_TIME_REPORT_NAME,
        ReportOrder::ByModTime,
    );

    Ok(ScanSummary {
        root,
        walk,
        drain,
        processed,
        size_report,
        mod_time_report,
    })
}

fn write_report(
    generator: &ReportGenerator,
    root: &Path,
    name: &str,
    order: ReportOrder,
) -> ReportOutcome {
    match generator.generate(root, name, order) {
        Ok(path) => ReportOutcome {
            order,
            path,
            error: None,
        },
        Err(e) => {
            log::error!("Error saving to {}: {}", name, e);
            ReportOutcome {
                order,
                path: root.join(name),
                error: Some(e),
            }
        }
    }
}
