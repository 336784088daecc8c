//! Fixed-size worker pool with a rendezvous hand-off.
//!
//! The producer blocks in [`WorkerPool::submit`] until an executor is idle,
//! so the walk can never run ahead of the workers by more than one task per
//! executor. [`WorkerPool::drain`] consumes the pool: once it returns, every
//! submitted task has finished and no further submission is possible.
//!
//! # Example
//!
//! ```
//! use favscan::pool::WorkerPool;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! let pool = WorkerPool::new(4, move |n: usize| {
//!     counter.fetch_add(n, Ordering::Relaxed);
//! })
//! .unwrap();
//!
//! for n in 1..=10 {
//!     pool.submit(n).unwrap();
//! }
//! let stats = pool.drain();
//!
//! assert_eq!(stats.completed, 10);
//! assert_eq!(seen.load(Ordering::Relaxed), 55);
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

/// Errors from the worker pool.
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    /// Zero executors requested.
    #[error("Worker count must be at least 1")]
    NoWorkers,

    /// An executor thread could not be started.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Every executor has exited, so the task cannot be accepted.
    #[error("Worker pool is closed")]
    Closed,
}

/// Outcome counts reported by [`WorkerPool::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Tasks that ran to completion
    pub completed: u64,
    /// Tasks that panicked
    pub panicked: u64,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// A pool of `W` executor threads running one handler.
pub struct WorkerPool<T: Send + 'static> {
    sender: Sender<T>,
    handles: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `workers` executors, each calling `handler` for every task it
    /// receives.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoWorkers`] for zero workers and
    /// [`PoolError::Spawn`] if the OS refuses a thread.
    pub fn new<F>(workers: usize, handler: F) -> Result<Self, PoolError>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        if workers == 0 {
            return Err(PoolError::NoWorkers);
        }

        // Zero capacity: submit completes only when an executor takes the task
        let (sender, receiver) = bounded::<T>(0);
        let handler = Arc::new(handler);
        let counters = Arc::new(Counters::default());

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let handler = Arc::clone(&handler);
            let counters = Arc::clone(&counters);

            let handle = thread::Builder::new()
                .name(format!("favscan-worker-{id}"))
                .spawn(move || executor_loop(id, &receiver, handler.as_ref(), &counters))?;
            handles.push(handle);
        }

        log::debug!("Started {} worker threads", workers);
        Ok(Self {
            sender,
            handles,
            counters,
        })
    }

    /// Number of executor threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Hand a task to an idle executor, blocking until one accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if no executor is left to receive it.
    pub fn submit(&self, task: T) -> Result<(), PoolError> {
        self.sender.send(task).map_err(|_| PoolError::Closed)
    }

    /// Close submission and wait for every executor to finish.
    #[must_use = "drain statistics report panicked tasks"]
    pub fn drain(self) -> DrainStats {
        let Self {
            sender,
            handles,
            counters,
        } = self;

        // Disconnect so executors exit once the channel is empty
        drop(sender);

        for handle in handles {
            if handle.join().is_err() {
                log::error!("Worker thread terminated abnormally");
            }
        }

        let stats = DrainStats {
            completed: counters.completed.load(Ordering::Acquire),
            panicked: counters.panicked.load(Ordering::Acquire),
        };
        log::debug!(
            "Worker pool drained: {} completed, {} panicked",
            stats.completed,
            stats.panicked
        );
        stats
    }
}

fn executor_loop<T, F>(id: usize, receiver: &Receiver<T>, handler: &F, counters: &Counters)
where
    F: Fn(T),
{
    for task in receiver.iter() {
        match panic::catch_unwind(AssertUnwindSafe(|| handler(task))) {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::AcqRel);
            }
            Err(payload) => {
                counters.panicked.fetch_add(1, Ordering::AcqRel);
                log::error!("Task panicked on worker {}: {}", id, panic_message(&payload));
            }
        }
    }
    log::trace!("Worker {} exiting", id);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
