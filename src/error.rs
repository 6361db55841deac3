use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Illegal operation: {0}")]
    Shape(String),

    #[error("Illegal operation: dimensions mismatch (expected {expected}, got {actual})")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Illegal operation: orientations mismatch")]
    OrientationMismatch,

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Worker {worker} already has a pending task")]
    QueueFull { worker: usize },

    #[error("Worker {worker} is no longer accepting tasks")]
    WorkerStopped { worker: usize },

    #[error("{failed} task(s) failed, first: {first}")]
    TaskFailed {
        failed: usize,
        #[source]
        first: Box<Error>,
    },

    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No home directory")]
    NoHomeDir,
}

impl Error {
    /// True for errors caused by operands whose shapes cannot be combined.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Error::Shape(_) | Error::DimensionMismatch { .. } | Error::OrientationMismatch
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
