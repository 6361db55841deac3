//! One end-to-end run: parse, evaluate, write the outcome.
//!
//! Every recoverable failure, including a bad thread count, ends up in the
//! output file as an error document; only a failure to write that file is
//! returned to the caller.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::expr::{parse_file, MatrixData};
use crate::output::{Outcome, RunReport};
use crate::{lae_log, lae_log_error};

/// Output message for a thread count that is not a positive integer.
pub const INVALID_THREADS: &str = "Invalid number of threads";

#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Thread count as typed by the user; validated here, not by the parser.
    pub threads: String,
    pub input: PathBuf,
    pub output: PathBuf,
}

pub fn parse_threads(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(threads) if threads > 0 => Ok(threads),
        _ => Err(Error::InvalidArgument(format!("{}: '{}'", INVALID_THREADS, raw))),
    }
}

/// Run the engine for `args` and write the outcome file.
pub fn run(args: &RunArgs, config: &Config) -> Result<RunReport> {
    let started = Instant::now();
    lae_log!(
        "Run: threads={} input={} output={}",
        args.threads,
        args.input.display(),
        args.output.display()
    );

    let threads = match parse_threads(&args.threads) {
        Ok(threads) => threads,
        Err(error) => {
            lae_log_error!("{}", error);
            Outcome::Error(INVALID_THREADS.to_string())
                .write_to(&args.output, config.pretty_output)?;
            return Ok(RunReport {
                total_runtime: started.elapsed(),
                workers: None,
            });
        }
    };

    let mut engine = None;
    let outcome = match compute(args, config, threads, &mut engine) {
        Ok(matrix) => Outcome::Result(matrix),
        Err(error) => {
            lae_log_error!("Run failed: {}", error);
            Outcome::Error(error.to_string())
        }
    };

    let workers = engine.map(|engine| {
        engine.shutdown();
        engine.worker_report()
    });
    outcome.write_to(&args.output, config.pretty_output)?;

    Ok(RunReport {
        total_runtime: started.elapsed(),
        workers,
    })
}

fn compute(
    args: &RunArgs,
    config: &Config,
    threads: usize,
    engine: &mut Option<Engine>,
) -> Result<MatrixData> {
    let root = parse_file(&args.input)?;
    let engine = engine.insert(Engine::with_config(threads, config)?);
    engine
        .run(root)?
        .into_matrix()
        .ok_or_else(|| Error::InternalInconsistency("evaluation did not yield a matrix".to_string()))
}
