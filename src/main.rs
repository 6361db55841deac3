use std::path::PathBuf;

use clap::Parser;

use lae::app::{self, RunArgs};
use lae::config::Config;
use lae::{lae_log, Result};

/// Lae - evaluate matrix expressions on a pool of fatigue-aware workers
#[derive(Parser, Debug)]
#[command(name = "lae")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    LAE_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Number of worker threads (a positive integer)
    #[arg(allow_hyphen_values = true)]
    pub threads: String,

    /// JSON file holding the expression tree
    pub input: PathBuf,

    /// File the result or error document is written to
    pub output: PathBuf,

    /// Enable debug logging (writes to ~/.lae/lae.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Config file to use instead of ~/.lae/lae.toml
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json_report: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    lae::log::init_with_debug(cli.debug);
    if cli.debug {
        lae_log!("Lae starting (debug mode enabled)");
        if let Some(path) = lae::log::path() {
            eprintln!("Debug log: {}", path.display());
        }
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let args = RunArgs {
        threads: cli.threads,
        input: cli.input,
        output: cli.output,
    };
    let report = app::run(&args, &config)?;

    if cli.json_report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
