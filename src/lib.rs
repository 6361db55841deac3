pub mod config;
pub mod error;
pub mod log;

// Shared state, scheduling and evaluation
pub mod app;
pub mod engine;
pub mod expr;
pub mod memory;
pub mod output;
pub mod scheduling;

pub use engine::Engine;
pub use error::{Error, Result};
pub use expr::{ComputationNode, MatrixData, NodeKind};
pub use memory::{Orientation, SharedMatrix, SharedVector};
pub use output::{Outcome, RunReport};
pub use scheduling::WorkerPool;
