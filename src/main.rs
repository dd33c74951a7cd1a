use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gridiron::{JobState, SyncScheduler};
use gridiron_core::config::Config;
use gridiron_core::ResourceType;

#[derive(Parser)]
#[command(name = "gridiron", about = "Gridiron — NFL data sync")]
struct Cli {
    /// Config file to use instead of ~/.config/gridiron/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one sync for each resource (default: all configured resources).
    Sync { resources: Vec<ResourceType> },
    /// Sync on a fixed interval until Ctrl-C.
    Watch {
        /// Seconds between rounds (default: sync.interval_secs).
        #[arg(long)]
        interval: Option<u64>,
        resources: Vec<ResourceType>,
    },
    /// Print the sync ledger.
    Status,
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }
    Ok(())
}

fn pick(requested: Vec<ResourceType>, cfg: &Config) -> anyhow::Result<Vec<ResourceType>> {
    if requested.is_empty() {
        cfg.sync.resource_types()
    } else {
        Ok(requested)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let cfg = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };

    let scheduler = SyncScheduler::from_config(&cfg)?;

    match cli.command {
        Command::Sync { resources } => {
            let resources = pick(resources, &cfg)?;
            let mut ok = true;
            for (resource, result) in scheduler.run_all(&resources).await {
                match result {
                    Ok(r) => {
                        println!("{}", serde_json::to_string(&r)?);
                        ok &= r.state == JobState::Completed && !r.ledger_failed();
                    }
                    Err(e) => {
                        eprintln!("{resource}: {e}");
                        ok = false;
                    }
                }
            }
            if !ok {
                anyhow::bail!("one or more syncs did not complete cleanly");
            }
        }
        Command::Watch { interval, resources } => {
            let resources = pick(resources, &cfg)?;
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| cfg.sync.interval());

            let shutdown = scheduler.shutdown_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("ctrl-c received, finishing current pages");
                    shutdown.cancel();
                }
            });
            scheduler.run_every(&resources, interval).await;
        }
        Command::Status => {
            let entries = scheduler.ledger().read_all().await?;
            if entries.is_empty() {
                println!("no syncs recorded");
            }
            for entry in entries.values() {
                println!(
                    "{:<18} {:<8} {}",
                    entry.resource_type,
                    entry.status.to_string(),
                    entry.timestamp.to_rfc3339()
                );
            }
        }
    }

    Ok(())
}
