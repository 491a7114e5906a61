//! qpcheck
//!
//! Runs the randomized differential sweep between the reference (Clarabel)
//! and candidate (interior-point) QP solvers and exits 0 only when every
//! trial agreed within tolerance.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use qpcheck_report::ConsoleReporter;
use qpcheck_sim::{RunSummary, SweepConfig, SweepRunner};
use qpcheck_types::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Exit code for configuration and environment errors
const EXIT_ENVIRONMENT: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "qpcheck", version, about = "Differential tester for convex QP solvers")]
struct Args {
    /// JSON sweep configuration; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Generator seed for a reproducible sweep
    #[arg(long)]
    seed: Option<u64>,

    /// Number of repetitions over the cost scales
    #[arg(long)]
    repetitions: Option<usize>,

    /// Absolute per-coordinate tolerance
    #[arg(long)]
    tolerance: Option<f64>,

    /// Per-solve time limit in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Solve with both backends concurrently
    #[arg(long)]
    parallel: bool,

    /// Forward solver progress output
    #[arg(long)]
    show_progress: bool,

    /// Print only failing trials
    #[arg(long)]
    quiet: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Args {
    fn sweep_config(&self) -> Result<SweepConfig> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::from_path(path)?,
            None => SweepConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(repetitions) = self.repetitions {
            config.repetitions = repetitions;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.solve_timeout_ms = Some(timeout_ms);
        }
        config.parallel_solves |= self.parallel;
        config.show_progress |= self.show_progress;

        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args) -> Result<RunSummary> {
    let config = args.sweep_config()?;
    let runner = SweepRunner::with_default_solvers(config)?;
    let mut reporter = ConsoleReporter::new(!args.quiet);
    runner.run_sweep(&mut reporter)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let summary = match run(&args) {
        Ok(summary) => summary,
        Err(e) => {
            error!("sweep aborted: {}", e);
            process::exit(EXIT_ENVIRONMENT);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("cannot serialize summary: {}", e);
                process::exit(EXIT_ENVIRONMENT);
            }
        }
    }

    process::exit(summary.exit_status().code());
}
