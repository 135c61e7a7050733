//! tpload - folder loader

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tpload_common::logging::{init_logging, LogConfig, LogLevel};
use tpload_ingest::{watch, LoaderConfig, TracingObserver};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tpload")]
#[command(author, version, about = "Load tenant-grouped CSV data from a watched folder")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process the folder once
    Run {
        /// Loader definition file
        #[arg(short, long, env = "TPLOAD_CONFIG", default_value = "tpload.toml")]
        config: PathBuf,

        /// Log commits instead of writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Process the folder every `run_interval_secs` until interrupted
    Watch {
        /// Loader definition file
        #[arg(short, long, env = "TPLOAD_CONFIG", default_value = "tpload.toml")]
        config: PathBuf,

        /// Override the interval from the definition file
        #[arg(short, long)]
        interval_secs: Option<u64>,

        /// Log commits instead of writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a loader definition and exit
    Check {
        /// Loader definition file
        #[arg(short, long, env = "TPLOAD_CONFIG", default_value = "tpload.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("tpload")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let result = match cli.command {
        Command::Run { config, dry_run } => run_once(config, dry_run).await,
        Command::Watch {
            config,
            interval_secs,
            dry_run,
        } => run_watch(config, interval_secs, dry_run).await,
        Command::Check { config } => check(config),
    };

    if let Err(ref e) = result {
        error!("Command failed: {:#}", e);
    }
    result
}

async fn run_once(config_path: PathBuf, dry_run: bool) -> Result<()> {
    let config = LoaderConfig::load(&config_path)?;
    let mut loader = config.build_loader(Arc::new(TracingObserver), dry_run)?;

    let report = tokio::task::spawn_blocking(move || loader.process_folder()).await??;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_clean() {
        anyhow::bail!("some loader types did not complete");
    }
    Ok(())
}

async fn run_watch(config_path: PathBuf, interval_secs: Option<u64>, dry_run: bool) -> Result<()> {
    let config = LoaderConfig::load(&config_path)?;
    let secs = interval_secs.unwrap_or(config.run_interval_secs);
    let loader = config.build_loader(Arc::new(TracingObserver), dry_run)?;
    let summary = watch::watch(loader, Duration::from_secs(secs), shutdown_signal()).await?;

    info!(runs = summary.runs, failed = summary.failed, "Watch finished");
    Ok(())
}

fn check(config_path: PathBuf) -> Result<()> {
    let config = LoaderConfig::load(&config_path)?;
    config.reader_options()?;
    for ty in &config.types {
        let files: Vec<&str> = ty.files.iter().map(|f| f.name.as_str()).collect();
        println!("{}: {}", ty.name, files.join(", "));
    }
    println!("{} is valid", config_path.display());
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, stopping"),
        _ = terminate => info!("Received terminate signal, stopping"),
    }
}
