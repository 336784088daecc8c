//! favscan - large file finder with a persistent metadata cache
//!
//! Walks a directory tree, records the size and modification time of every
//! file at or above a threshold in a Redis-protocol cache keyed by a hash of
//! its path, and writes two reports from the full cache contents: one sorted
//! by size, one by modification time.
//!
//! # Architecture
//!
//! * [`scanner`]: traversal, exclusion rules, path keys
//! * [`pool`]: fixed worker pool fed by the walk
//! * [`processor`]: per-file task body writing to the cache
//! * [`cache`]: cache contract with Redis and in-memory backends
//! * [`report`]: report generation from a cache snapshot
//! * [`pipeline`]: walk, drain, report
//!
//! # Example
//!
//! ```no_run
//! use favscan::cache::{MemoryCache, MetadataCache};
//! use favscan::pipeline::{run_scan, ScanOptions};
//! use favscan::progress::StdoutProgress;
//! use favscan::scanner::WalkerConfig;
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let options = ScanOptions {
//!     walker: WalkerConfig {
//!         min_size: 200 * 1024 * 1024,
//!         ..Default::default()
//!     },
//!     workers: 20,
//!     progress_interval: Duration::from_secs(1),
//! };
//! let cache: Arc<dyn MetadataCache> = Arc::new(MemoryCache::new());
//! let summary = run_scan(
//!     Path::new("/data"),
//!     cache,
//!     &options,
//!     Arc::new(StdoutProgress::new(true)),
//! )
//! .unwrap();
//! println!("{} files recorded", summary.processed);
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod pool;
pub mod processor;
pub mod progress;
pub mod report;
pub mod scanner;

use std::sync::Arc;

use anyhow::Context;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::ExitCode;
use crate::pipeline::{ScanOptions, ScanSummary};
use crate::progress::StdoutProgress;
use crate::report::ReportOrder;
use crate::scanner::{ExclusionSet, WalkerConfig};

/// Run the application for parsed CLI arguments.
///
/// # Errors
///
/// Returns an error for any fatal condition: bad configuration, an
/// unreachable cache, an invalid exclusion pattern, or an unusable root.
/// Report failures are not errors here; they yield
/// [`ExitCode::GeneralError`] after both reports were attempted.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(&cli).context("Failed to load configuration")?;
    log::debug!("Effective configuration: {:?}", config);

    let root = pipeline::absolute_root(&cli.directory)?;

    let cache = cache::open_cache(&config.cache_url, &config.cache_options())
        .context("Error connecting to cache")?;

    let exclude_file = config.exclude_file_for(&root);
    let rules = ExclusionSet::load(&exclude_file)
        .with_context(|| format!("Failed to load exclude patterns from {}", exclude_file.display()))?;

    let options = ScanOptions {
        walker: WalkerConfig::new(rules, config.min_size, config.exclude_policy),
        workers: config.workers,
        progress_interval: config.progress_interval(),
    };

    let sink = Arc::new(StdoutProgress::new(config.show_progress));
    let summary = pipeline::run_scan(&root, cache, &options, sink)
        .with_context(|| format!("Scan of {} failed", root.display()))?;

    Ok(print_report_outcomes(&summary))
}

/// Print the per-report result lines and pick the exit code.
fn print_report_outcomes(summary: &ScanSummary) -> ExitCode {
    let mut code = ExitCode::Success;

    for outcome in [&summary.size_report, &summary.mod_time_report] {
        match &outcome.error {
            None => match outcome.order {
                ReportOrder::BySize => println!("Saved data to {}", outcome.path.display()),
                ReportOrder::ByModTime => {
                    println!("Saved sorted data to {}", outcome.path.display());
                }
            },
            Some(e) => {
                eprintln!("Error saving to {}: {}", outcome.path.display(), e);
                code = ExitCode::GeneralError;
            }
        }
    }

    log::info!(
        "Recorded {} files ({} entries visited, {} excluded, {} errors)",
        summary.processed,
        summary.walk.visited,
        summary.walk.excluded,
        summary.walk.errors
    );
    code
}
