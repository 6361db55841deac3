//! Worker threads and the fatigue-balanced pool that feeds them.

pub mod pool;
pub mod worker;

pub use pool::{PoolReport, RowTask, WorkerPool};
pub use worker::{Task, Worker, WorkerLoad, WorkerSnapshot, WorkerStats};
