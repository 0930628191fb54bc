//! scheduler: headless driver for workload scripts.
//!
//! Loads a `.sl` script, seeds a fresh scheduler, steps the simulation to
//! completion and prints the metrics snapshot. Exit code 0 on a clean run, 1
//! on file, lex, parse or interpret errors.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;

use simsched::{
    entropy_seed, interpret, metrics, MetricsTracker, PolicyKind, Scheduler, DEFAULT_QUANTUM,
    MAX_CORES,
};

/// Run a workload script through the scheduling simulator.
#[derive(Parser)]
#[command(name = "scheduler")]
struct Cli {
    /// Path to a workload script (.sl).
    script: PathBuf,

    /// Number of simulated CPU cores.
    #[arg(short, long, default_value_t = 1)]
    cores: usize,

    /// Scheduling policy.
    #[arg(short, long, value_enum, default_value_t = PolicyKind::RoundRobin)]
    policy: PolicyKind,

    /// Round Robin quantum in ticks.
    #[arg(long, default_value_t = DEFAULT_QUANTUM)]
    quantum: u64,

    /// Workload PRNG seed; defaults to OS entropy.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the metrics snapshot to this file after the run.
    #[arg(long, value_name = "PATH")]
    met: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    if let Err(error) = run(&cli) {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    ensure!(
        (1..=MAX_CORES).contains(&cli.cores),
        "--cores must be between 1 and {MAX_CORES}"
    );

    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("failed to read {}", cli.script.display()))?;

    let mut scheduler = Scheduler::new(cli.cores, cli.policy.build(cli.quantum));

    let seed = cli.seed.unwrap_or_else(entropy_seed);
    info!(seed, "seeding workload PRNG (pass --seed {seed} to reproduce)");
    let mut rng = SmallRng::seed_from_u64(seed);

    interpret(&source, &mut scheduler, &mut rng)
        .with_context(|| format!("failed to run {}", cli.script.display()))?;

    let mut tracker = MetricsTracker::new();
    while !scheduler.complete() {
        scheduler.step();
        tracker.observe(&scheduler);
    }
    info!(
        ticks = scheduler.timer,
        finished = scheduler.finished.len(),
        dropped = scheduler.dropped_count,
        "simulation complete"
    );

    let snapshot = metrics::snapshot(&scheduler, &tracker);
    print!("{snapshot}");

    if let Some(path) = &cli.met {
        std::fs::write(path, &snapshot)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote metrics snapshot");
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
