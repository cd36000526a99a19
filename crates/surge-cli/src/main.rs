//! surge — autoscaler operator tools.
//!
//! # Usage
//!
//! ```text
//! surge check-config autoscaler.toml
//! surge replay --config autoscaler.toml --samples trace.jsonl --tick-ms 1000
//! ```

mod replay;

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use surge_autoscale::AutoscalerConfig;

#[derive(Parser)]
#[command(name = "surge", about = "Surge autoscaler tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate an autoscaler config, printing the effective values.
    CheckConfig {
        /// Path to the TOML config file.
        path: PathBuf,
    },
    /// Replay a recorded concurrency trace and print each decision.
    Replay {
        /// Autoscaler config (defaults apply when omitted).
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON-lines trace: {"at_ms": .., "replica": "..", "concurrency": ..}.
        #[arg(long)]
        samples: PathBuf,

        /// Decision interval in milliseconds.
        #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
        tick_ms: u64,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,surge=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::CheckConfig { path } => check_config(&path),
        Command::Replay {
            config,
            samples,
            tick_ms,
        } => run_replay(config.as_deref(), &samples, Duration::from_millis(tick_ms)),
    }
}

fn load_config(path: &Path) -> anyhow::Result<AutoscalerConfig> {
    let config = AutoscalerConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    let config = load_config(path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn run_replay(config: Option<&Path>, samples: &Path, tick: Duration) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => load_config(path)?,
        None => AutoscalerConfig::default(),
    };

    let file = File::open(samples)
        .with_context(|| format!("failed to open trace {}", samples.display()))?;
    let samples = replay::read_samples(BufReader::new(file))?;
    info!(samples = samples.len(), tick_ms = tick.as_millis() as u64, "replaying trace");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in replay::replay(config, samples, tick) {
        writeln!(out, "{}", serde_json::to_string(&line)?)?;
    }
    Ok(())
}
