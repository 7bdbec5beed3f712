//! envmon - home environment monitor.
//!
//! Run with: `cargo run -p envmon-service -- run --simulate`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use envmon_core::{DaemonEvent, Monitor};
use envmon_service::report::{format_reading, format_summary};
use envmon_service::{Config, SensorMode, build_sensor, default_config_path, parse_local_time};
use envmon_store::{Archive, ArchiveQuery, TimeWindow};

/// envmon - samples climate and particulate sensors into rotating log files.
#[derive(Parser, Debug)]
#[command(name = "envmon")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log file directory (overrides config).
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor in the foreground until Ctrl-C (default behavior).
    Run(RunArgs),

    /// Load archived log files and print a summary.
    Archive(ArchiveArgs),

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(ClapArgs, Debug, Default)]
struct RunArgs {
    /// Seconds between samples (overrides config).
    #[arg(short, long)]
    interval: Option<f64>,

    /// Samples per log file (overrides config).
    #[arg(long)]
    samples_per_file: Option<usize>,

    /// Use simulated sensors instead of hardware.
    #[arg(long)]
    simulate: bool,

    /// Seconds between latest-reading log lines.
    #[arg(long, default_value_t = 60)]
    status_every: u64,
}

#[derive(ClapArgs, Debug)]
struct ArchiveArgs {
    /// Look-back window from the newest file: 1h, 8h, 24h, 7d, 1m, 6m or 1y.
    #[arg(short, long, conflicts_with_all = ["from", "to"])]
    window: Option<TimeWindow>,

    /// Start of the range (local time, YYYY-MM-DD[ HH:MM[:SS]]).
    #[arg(long, value_parser = parse_local_time)]
    from: Option<NaiveDateTime>,

    /// End of the range (local time, YYYY-MM-DD[ HH:MM[:SS]]).
    #[arg(long, value_parser = parse_local_time)]
    to: Option<NaiveDateTime>,

    /// Average into buckets of this many seconds.
    #[arg(long)]
    resample: Option<u64>,

    /// Write the rows to this CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Convert cumulative particle counts into per-size-bin counts.
    #[arg(long)]
    differential: bool,

    /// Keep rows with missing values.
    #[arg(long)]
    keep_incomplete: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("envmon=info")),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_else(|e| {
            warn!("Ignoring default config: {}", e);
            Config::default()
        }),
    };
    if let Some(dir) = args.data_dir {
        config.monitor.data_dir = dir;
    }

    match args.command {
        Some(Command::Archive(archive_args)) => run_archive(&config, archive_args),
        Some(Command::Config) => print_config(&config, args.config),
        Some(Command::Run(run_args)) => run_monitor(config, run_args).await,
        None => run_monitor(config, RunArgs::default()).await,
    }
}

async fn run_monitor(mut config: Config, run_args: RunArgs) -> anyhow::Result<()> {
    if let Some(interval) = run_args.interval {
        config.monitor.sampling_interval_secs = interval;
    }
    if let Some(samples) = run_args.samples_per_file {
        config.monitor.samples_per_file = samples;
    }
    if run_args.simulate {
        config.sensors.mode = SensorMode::Simulated;
    }
    config.validate()?;

    let sensor = build_sensor(&config.sensors).context("Failed to open sensors")?;
    let mut monitor = Monitor::new(config.monitor_config(), sensor)?;
    let mut events = monitor.subscribe_events();
    let latest = monitor.latest_cache();

    info!(
        "Writing to {} every {}s, {} samples per file",
        config.monitor.data_dir.display(),
        config.monitor.sampling_interval_secs,
        config.monitor.samples_per_file
    );
    monitor.start()?;

    let mut status = tokio::time::interval(Duration::from_secs(run_args.status_every.max(1)));
    status.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Received Ctrl-C, stopping");
                break;
            }
            event = events.recv() => match event {
                Ok(DaemonEvent::Failed { error }) => {
                    error!("Sampling stopped: {}", error);
                    break;
                }
                Ok(DaemonEvent::CycleCompleted { path, discarded, .. }) => {
                    info!("Completed {}", path.display());
                    if discarded > 0 {
                        debug!("{} hand-off lines were never consumed", discarded);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!("Skipped {} daemon events", skipped),
                Err(RecvError::Closed) => break,
            },
            _ = status.tick() => match latest.get_latest() {
                Some(reading) => info!("{}", format_reading(&reading)),
                None => info!("No reading yet"),
            },
        }
    }

    if let Some(report) = monitor.stop().await? {
        if report.worker_timed_out {
            warn!("Latest-reading worker was left running at shutdown");
        }
        info!(
            "Recorded {} samples ({} sensor failures) in {:?}",
            report.stats.samples_written, report.stats.sensor_failures, report.uptime
        );
    }
    Ok(())
}

fn run_archive(config: &Config, args: ArchiveArgs) -> anyhow::Result<()> {
    let archive = Archive::new(&config.monitor.data_dir);

    let mut query = ArchiveQuery::new();
    if let Some(window) = args.window {
        query = query.window(window);
    }
    if let Some(from) = args.from {
        query = query.since(from);
    }
    if let Some(to) = args.to {
        query = query.until(to);
    }
    if !args.keep_incomplete {
        query = query.drop_incomplete();
    }
    if args.differential {
        query = query.differential_counts();
    }

    let mut table = archive
        .query(&query)
        .with_context(|| format!("Failed to load archive {}", archive.dir().display()))?;
    if let Some(secs) = args.resample {
        table = table.resample_mean(Duration::from_secs(secs))?;
    }

    print!("{}", format_summary(&table));

    if let Some(path) = args.csv {
        table
            .export_csv(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} rows to {}", table.len(), path.display());
    }
    Ok(())
}

fn print_config(config: &Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
