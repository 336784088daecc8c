//! Progress accounting and the periodic progress printer.
//!
//! [`ProgressCounter`] is shared by every worker and bumped once per file
//! whose cache write succeeded. [`ProgressTicker`] runs on its own thread and
//! hands the current count to a [`ProgressSink`] once per interval until it
//! is stopped.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

/// Count of files successfully recorded in the cache.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    processed: AtomicU64,
}

impl ProgressCounter {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more processed file and return the new total.
    pub fn increment(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current total.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }
}

/// Receives progress updates.
///
/// Implement this trait to redirect the progress lines, e.g. into a buffer
/// in tests.
pub trait ProgressSink: Send + Sync {
    /// Called once per interval while the scan runs.
    fn on_tick(&self, processed: u64);

    /// Called once after every worker has finished.
    fn on_finish(&self, processed: u64);
}

/// Text of a periodic progress line.
#[must_use]
pub fn progress_line(processed: u64) -> String {
    format!("Progress: {processed} files processed.")
}

/// Text of the final progress line.
#[must_use]
pub fn final_progress_line(processed: u64) -> String {
    format!("Final progress: {processed} files processed.")
}

/// Prints progress lines to stdout.
#[derive(Debug, Clone, Copy)]
pub struct StdoutProgress {
    show_ticks: bool,
}

impl StdoutProgress {
    /// Create a stdout sink.
    ///
    /// # Arguments
    ///
    /// * `show_ticks` - If false, periodic lines are suppressed and only the
    ///   final line is printed.
    #[must_use]
    pub fn new(show_ticks: bool) -> Self {
        Self { show_ticks }
    }

    fn emit(line: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout must not take the scan down with it
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

impl ProgressSink for StdoutProgress {
    fn on_tick(&self, processed: u64) {
        if self.show_ticks {
            Self::emit(&progress_line(processed));
        }
    }

    fn on_finish(&self, processed: u64) {
        Self::emit(&final_progress_line(processed));
    }
}

/// Collects progress lines in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines recorded so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_tick(&self, processed: u64) {
        self.lines.lock().push(progress_line(processed));
    }

    fn on_finish(&self, processed: u64) {
        self.lines.lock().push(final_progress_line(processed));
    }
}

/// Background thread reporting the counter at a fixed interval.
///
/// The first report happens one interval after [`ProgressTicker::start`].
pub struct ProgressTicker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Spawn the ticker thread.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the thread cannot be spawned.
    pub fn start(
        counter: Arc<ProgressCounter>,
        sink: Arc<dyn ProgressSink>,
        interval: Duration,
    ) -> io::Result<Self> {
        let (stop, stopped) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("favscan-progress".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => sink.on_tick(counter.get()),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self { stop, handle })
    }

    /// Stop the ticker and wait for its thread to exit.
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            log::warn!("Progress thread terminated abnormally");
        }
    }
}
