//! Fatigue-balanced worker pool.
//!
//! The `WorkerPool` owns a fixed set of [`Worker`]s and a min-heap of the idle
//! ones keyed by [`WorkerLoad`]. `submit` hands each task to the least
//! fatigued idle worker, blocking while every worker is busy. `submit_all`
//! is a fan-out/fan-in barrier: it returns once every task it handed out has
//! finished.
//!
//! The heap, the in-flight counter and the collected task failures sit behind
//! one mutex, with a single condition variable signalled whenever a worker
//! comes back to the heap.
//!
//! # Example
//!
//! ```ignore
//! use lae::scheduling::{RowTask, WorkerPool};
//!
//! let pool = WorkerPool::new(4)?;
//! let tasks: Vec<RowTask> = (0..16).map(|_| Box::new(|| Ok(())) as RowTask).collect();
//! pool.submit_all(tasks)?;
//! println!("{}", pool.report());
//! pool.shutdown();
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::scheduling::worker::{Worker, WorkerLoad, WorkerSnapshot, WorkerStats};
use crate::{lae_log, lae_log_debug, lae_log_trace, lae_log_warn};

/// A task submitted to the pool. Errors are collected and reported by the
/// next barrier.
pub type RowTask = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

#[derive(Default)]
struct PoolState {
    idle: BinaryHeap<Reverse<WorkerLoad>>,
    in_flight: usize,
    failures: Vec<Error>,
}

struct Shared {
    state: Mutex<PoolState>,
    changed: Condvar,
}

impl Shared {
    /// Return a worker to the heap and release its in-flight slot.
    fn release(&self, stats: &WorkerStats) {
        let mut state = self.state.lock();
        state.in_flight -= 1;
        state.idle.push(Reverse(stats.load()));
        self.changed.notify_all();
    }

    fn record_failure(&self, error: Error) {
        self.state.lock().failures.push(error);
    }
}

/// Per-worker statistics for one pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub workers: Vec<WorkerSnapshot>,
}

impl std::fmt::Display for PoolReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for worker in &self.workers {
            writeln!(f, "{}", worker)?;
        }
        Ok(())
    }
}

pub struct WorkerPool {
    workers: Vec<Worker>,
    shared: Arc<Shared>,
    shut_down: AtomicBool,
}

impl WorkerPool {
    /// Create a pool of `threads` workers with default fatigue settings.
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_config(threads, &Config::default())
    }

    /// Create a pool of `threads` workers, drawing each fatigue factor from
    /// the configured range.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `threads` is zero or the fatigue range is empty.
    pub fn with_config(threads: usize, config: &Config) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidArgument(
                "thread count must be positive".to_string(),
            ));
        }
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let workers: Vec<Worker> = (0..threads)
            .map(|id| Worker::new(id, rng.gen_range(config.fatigue_range())))
            .collect();

        let mut state = PoolState::default();
        for worker in &workers {
            state.idle.push(Reverse(worker.stats().load()));
        }
        for worker in &workers {
            worker.start()?;
        }

        lae_log!("WorkerPool started with {} workers", threads);
        Ok(Self {
            workers,
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                changed: Condvar::new(),
            }),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Number of tasks handed to workers and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.state.lock().in_flight
    }

    /// Hand `task` to the least fatigued idle worker, waiting for one to
    /// become idle if necessary.
    ///
    /// Errors returned by the task, and panics inside it, do not surface here;
    /// they are reported by the next [`WorkerPool::wait_idle`].
    ///
    /// # Errors
    ///
    /// `InvalidArgument` once the pool is shut down. A failed handoff returns
    /// the worker's error after restoring the pool's bookkeeping.
    pub fn submit(&self, task: RowTask) -> Result<()> {
        let id = {
            let mut state = self.shared.state.lock();
            let load = loop {
                if self.shut_down.load(Ordering::Acquire) {
                    return Err(Error::InvalidArgument("pool is shut down".to_string()));
                }
                if let Some(Reverse(load)) = state.idle.pop() {
                    break load;
                }
                self.shared.changed.wait(&mut state);
            };
            state.in_flight += 1;
            load.id
        };

        let worker = &self.workers[id];
        lae_log_trace!("Submitting task to worker {}", id);

        let failures = Arc::clone(&self.shared);
        let run: Box<dyn FnOnce() + Send> = Box::new(move || {
            match catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    lae_log_warn!("Task on worker {} failed: {}", id, error);
                    failures.record_failure(error);
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    lae_log_warn!("Task on worker {} panicked: {}", id, message);
                    failures.record_failure(Error::TaskPanicked(message));
                }
            }
        });

        let shared = Arc::clone(&self.shared);
        let stats = Arc::clone(worker.stats());
        let on_complete: Box<dyn FnOnce() + Send> = Box::new(move || shared.release(&stats));

        if let Err(error) = worker.assign_then(run, on_complete) {
            lae_log_warn!("Handoff to worker {} failed: {}", id, error);
            self.shared.release(worker.stats());
            return Err(error);
        }
        Ok(())
    }

    /// Submit every task, then wait for all of them to finish.
    ///
    /// Every task runs even if some fail. The first failure is returned
    /// wrapped in `TaskFailed` together with the number of failed tasks.
    pub fn submit_all<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = RowTask>,
    {
        let mut submitted = 0usize;
        for task in tasks {
            if let Err(error) = self.submit(task) {
                // Let the tasks already handed out finish before bailing.
                if let Err(failed) = self.wait_idle() {
                    lae_log_warn!("Discarding partial batch failures: {}", failed);
                }
                return Err(error);
            }
            submitted += 1;
        }
        lae_log_debug!("Submitted batch of {} tasks", submitted);
        self.wait_idle()
    }

    /// Block until no task is in flight, then report failures collected
    /// since the previous call.
    pub fn wait_idle(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        while state.in_flight > 0 {
            self.shared.changed.wait(&mut state);
        }
        let failures = std::mem::take(&mut state.failures);
        drop(state);

        let failed = failures.len();
        match failures.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(Error::TaskFailed {
                failed,
                first: Box::new(first),
            }),
        }
    }

    /// Wait for in-flight work, then stop and join every worker.
    ///
    /// Later calls return immediately.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut state = self.shared.state.lock();
            while state.in_flight > 0 {
                self.shared.changed.wait(&mut state);
            }
            // Wake submitters still waiting for a worker so they see the flag.
            self.shared.changed.notify_all();
        }

        for worker in &self.workers {
            worker.request_stop();
        }
        for worker in &self.workers {
            worker.join();
        }
        lae_log!("WorkerPool shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    pub fn report(&self) -> PoolReport {
        PoolReport {
            workers: self
                .workers
                .iter()
                .map(|worker| worker.stats().snapshot())
                .collect(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
