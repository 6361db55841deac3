//! Result files.
//!
//! A run writes exactly one JSON document: `{"result": [[...]]}` when the
//! expression evaluated, `{"error": "..."}` otherwise.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::expr::MatrixData;
use crate::scheduling::PoolReport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Result(MatrixData),
    Error(String),
}

impl Outcome {
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    pub fn write_to(&self, path: &Path, pretty: bool) -> Result<()> {
        fs::write(path, self.to_json(pretty)?)?;
        Ok(())
    }
}

/// Timing and worker statistics printed after a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub total_runtime: Duration,
    pub workers: Option<PoolReport>,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Total Runtime ===")?;
        writeln!(f, "{:.3} ms", self.total_runtime.as_secs_f64() * 1000.0)?;
        if let Some(workers) = &self.workers {
            writeln!(f, "=== Worker Report ===")?;
            write!(f, "{}", workers)?;
        }
        Ok(())
    }
}
