//! settlewatch - report files once they stop changing
//!
//! This binary provides the command-line interface for the settlewatch watcher.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use settlewatch::WatchSession;
use settlewatch_core::config::Config;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "settlewatch")]
#[command(about = "Watch a directory and report files once they stop changing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the configured root until interrupted (default)
    Watch {
        /// Directory to watch, overriding watch.root
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command {
        Some(Commands::Watch { root }) => watch(cli.config.as_deref(), root).await,
        Some(Commands::ShowConfig) => show_config(cli.config.as_deref()),
        None => watch(cli.config.as_deref(), None).await,
    }
}

/// Initialize logging system
///
/// `RUST_LOG` takes precedence over the `--verbose` default.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            ["settlewatch", "settlewatch_core", "settlewatch_watcher", "settlewatch_notifier"]
                .map(|target| format!("{target}={level}"))
                .join(","),
        )
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(())
}

fn load_config(config_path: Option<&Path>, root: Option<PathBuf>) -> Config {
    let mut config = Config::load(config_path);
    if let Some(root) = root {
        config.watch.root = Some(root);
    }
    config
}

/// Run a watch session until Ctrl-C
async fn watch(config_path: Option<&Path>, root: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path, root);
    let session = WatchSession::start(&config).await?;

    info!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    session.shutdown().await
}

fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, None);
    print!("{}", config.to_toml_string()?);
    Ok(())
}
