//! Dining philosophers simulator CLI
//!
//! Seats philosophers at the active tables, watches for deadlocks and moves
//! philosophers to the overflow table until it deadlocks too, everyone
//! finishes, or Ctrl-C is pressed.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use symposium_core::EventLog;
use symposium_deadlock::DetectionMode;
use symposium_simulation::{MigrationPolicy, SimulationRunner};
use symposium_simulator::{FileConfig, RunReport, TimingSection};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "symposium-sim")]
#[command(about = "Dining philosophers simulation with deadlock recovery")]
#[command(version)]
struct Cli {
    /// TOML config file; flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of active tables (an overflow table is always added)
    #[arg(long)]
    tables: Option<u32>,

    /// Seats per table
    #[arg(long)]
    seats: Option<u32>,

    /// Upper bound on a thinking period, in milliseconds
    #[arg(long)]
    thinking_ms: Option<u64>,

    /// Upper bound on an eating period, in milliseconds
    #[arg(long)]
    eating_ms: Option<u64>,

    /// Fixed pause between taking the left fork and trying the right one,
    /// in milliseconds
    #[arg(long)]
    wait_ms: Option<u64>,

    /// Time between deadlock scans, in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Think/eat rounds per philosopher
    #[arg(long)]
    rounds: Option<u32>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Deadlock signature (none-eating, wait-for-graph)
    #[arg(long, value_parser = parse_detection)]
    detection: Option<DetectionMode>,

    /// What happens to a migrated philosopher's old task (retire, detach)
    #[arg(long, value_parser = parse_migration)]
    migration: Option<MigrationPolicy>,

    /// Log filter, e.g. "debug" or "symposium_simulation=debug". Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> FileConfig {
        FileConfig {
            active_tables: self.tables,
            seats_per_table: self.seats,
            poll_interval_ms: self.poll_ms,
            detection: self.detection,
            migration: self.migration,
            seed: self.seed,
            timing: TimingSection {
                thinking_ms: self.thinking_ms,
                eating_ms: self.eating_ms,
                wait_for_fork_ms: self.wait_ms,
                rounds: self.rounds,
            },
        }
    }
}

fn parse_detection(s: &str) -> Result<DetectionMode, String> {
    match s.to_lowercase().as_str() {
        "none-eating" | "noneeating" => Ok(DetectionMode::NoneEating),
        "wait-for-graph" | "waitforgraph" | "graph" => Ok(DetectionMode::WaitForGraph),
        _ => Err(format!("Unknown detection mode: {}", s)),
    }
}

fn parse_migration(s: &str) -> Result<MigrationPolicy, String> {
    match s.to_lowercase().as_str() {
        "retire" => Ok(MigrationPolicy::Retire),
        "detach" => Ok(MigrationPolicy::Detach),
        _ => Err(format!("Unknown migration policy: {}", s)),
    }
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let file = match &cli.config {
        Some(path) => FileConfig::from_toml_file(path)?,
        None => FileConfig::default(),
    };
    let config = file.merge(cli.overrides()).into_simulation_config();

    let mut runner = SimulationRunner::new(config, EventLog::new())
        .context("Invalid simulation configuration")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, stopping simulation");
                cancel.cancel();
            }
        }
    });

    let started = Instant::now();
    let outcome = runner.run(cancel).await;
    let report = RunReport::collect(&runner, outcome, started.elapsed());
    runner.shutdown().await;

    print!("{report}");
    Ok(())
}
