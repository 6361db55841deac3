//! Single-slot worker thread.
//!
//! A `Worker` owns one OS thread and a mailbox that holds at most one pending
//! task. An occupied mailbox is what the pool treats as "busy": assigning to
//! a worker whose slot is still full fails with `QueueFull`.
//!
//! Timing counters live in [`WorkerStats`], shared between the worker handle
//! and its thread through atomics. They are for ranking and reporting only and
//! may be briefly stale.

use std::cmp::Ordering as CmpOrdering;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::{lae_log_debug, lae_log_trace, lae_log_warn};

/// Unit of work run on a worker thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct Job {
    task: Task,
    /// Runs after the worker has booked the task's time and gone idle.
    on_complete: Option<Task>,
}

/// Counters shared between a [`Worker`] and its thread.
#[derive(Debug)]
pub struct WorkerStats {
    id: usize,
    fatigue_factor: f64,
    busy: AtomicBool,
    time_used_ns: AtomicU64,
    time_idle_ns: AtomicU64,
    completed: AtomicU64,
}

impl WorkerStats {
    fn new(id: usize, fatigue_factor: f64) -> Self {
        Self {
            id,
            fatigue_factor,
            busy: AtomicBool::new(false),
            time_used_ns: AtomicU64::new(0),
            time_idle_ns: AtomicU64::new(0),
            completed: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn fatigue_factor(&self) -> f64 {
        self.fatigue_factor
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn time_used(&self) -> Duration {
        Duration::from_nanos(self.time_used_ns.load(Ordering::Relaxed))
    }

    pub fn time_idle(&self) -> Duration {
        Duration::from_nanos(self.time_idle_ns.load(Ordering::Relaxed))
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Accumulated busy time weighted by the fatigue factor.
    pub fn fatigue(&self) -> f64 {
        self.time_used_ns.load(Ordering::Relaxed) as f64 * self.fatigue_factor
    }

    pub fn load(&self) -> WorkerLoad {
        WorkerLoad {
            fatigue: self.fatigue(),
            id: self.id,
        }
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.id,
            busy: self.is_busy(),
            time_used: self.time_used(),
            time_idle: self.time_idle(),
            completed: self.completed(),
            fatigue_factor: self.fatigue_factor,
            fatigue: self.fatigue(),
        }
    }
}

/// Ranking key for idle workers: lower fatigue first, then lower id.
#[derive(Debug, Clone, Copy)]
pub struct WorkerLoad {
    pub fatigue: f64,
    pub id: usize,
}

impl PartialEq for WorkerLoad {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for WorkerLoad {}

impl PartialOrd for WorkerLoad {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkerLoad {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.fatigue
            .total_cmp(&other.fatigue)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Point-in-time view of one worker, as shown in reports.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    pub id: usize,
    pub busy: bool,
    pub time_used: Duration,
    pub time_idle: Duration,
    pub completed: u64,
    pub fatigue_factor: f64,
    pub fatigue: f64,
}

impl std::fmt::Display for WorkerSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Worker {} | busy={} | used={:?} | idle={:?} | tasks={} | fatigue_factor={:.3} | fatigue={:.0}",
            self.id,
            self.busy,
            self.time_used,
            self.time_idle,
            self.completed,
            self.fatigue_factor,
            self.fatigue
        )
    }
}

/// A task runner with a one-task mailbox and its own thread.
///
/// Dropping a `Worker` stops it and joins its thread.
pub struct Worker {
    stats: Arc<WorkerStats>,
    sender: Mutex<Option<Sender<Job>>>,
    receiver: Mutex<Option<Receiver<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Create a worker. Its thread does not run until [`Worker::start`].
    pub fn new(id: usize, fatigue_factor: f64) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        Self {
            stats: Arc::new(WorkerStats::new(id, fatigue_factor)),
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> usize {
        self.stats.id
    }

    pub fn stats(&self) -> &Arc<WorkerStats> {
        &self.stats
    }

    pub fn is_busy(&self) -> bool {
        self.stats.is_busy()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the worker thread.
    pub fn start(&self) -> Result<()> {
        let receiver = self.receiver.lock().take().ok_or_else(|| {
            Error::InvalidArgument(format!("worker {} already started", self.id()))
        })?;
        let stats = Arc::clone(&self.stats);
        let handle = thread::Builder::new()
            .name(format!("lae-worker-{}", self.id()))
            .spawn(move || run(&stats, &receiver))?;
        *self.handle.lock() = Some(handle);
        lae_log_debug!("Worker {} started", self.id());
        Ok(())
    }

    /// Put `task` in the mailbox.
    ///
    /// # Errors
    ///
    /// `QueueFull` if a previous task has not been picked up yet,
    /// `WorkerStopped` after [`Worker::request_stop`].
    pub fn assign(&self, task: Task) -> Result<()> {
        self.assign_job(Job {
            task,
            on_complete: None,
        })
    }

    /// Like [`Worker::assign`], running `on_complete` on the worker thread
    /// once the task's time has been booked and the worker is idle again.
    pub fn assign_then(&self, task: Task, on_complete: Task) -> Result<()> {
        self.assign_job(Job {
            task,
            on_complete: Some(on_complete),
        })
    }

    fn assign_job(&self, job: Job) -> Result<()> {
        let worker = self.id();
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(Error::WorkerStopped { worker })?;
        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::QueueFull { worker }),
            Err(TrySendError::Disconnected(_)) => Err(Error::WorkerStopped { worker }),
        }
    }

    /// Stop accepting tasks. A pending task still runs before the thread
    /// exits.
    pub fn request_stop(&self) {
        if self.sender.lock().take().is_some() {
            lae_log_debug!("Worker {} stop requested", self.id());
        }
    }

    /// Block until the worker thread has exited.
    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                lae_log_warn!("Worker {} thread panicked", self.id());
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.request_stop();
        self.join();
    }
}

fn run(stats: &WorkerStats, receiver: &Receiver<Job>) {
    let mut idle_since = Instant::now();
    while let Ok(job) = receiver.recv() {
        add_elapsed(&stats.time_idle_ns, idle_since);
        stats.busy.store(true, Ordering::Release);

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(job.task));
        add_elapsed(&stats.time_used_ns, started);
        stats.completed.fetch_add(1, Ordering::Relaxed);

        stats.busy.store(false, Ordering::Release);
        idle_since = Instant::now();

        if outcome.is_err() {
            lae_log_warn!("Worker {} task panicked", stats.id);
        }
        lae_log_trace!("Worker {} finished task in {:?}", stats.id, started.elapsed());
        if let Some(on_complete) = job.on_complete {
            on_complete();
        }
    }
    add_elapsed(&stats.time_idle_ns, idle_since);
    lae_log_debug!("Worker {} exiting", stats.id);
}

fn add_elapsed(counter: &AtomicU64, since: Instant) {
    let nanos = u64::try_from(since.elapsed().as_nanos()).unwrap_or(u64::MAX);
    counter.fetch_add(nanos, Ordering::Relaxed);
}
