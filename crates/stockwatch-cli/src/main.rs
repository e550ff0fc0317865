mod cycle;
mod notify;
mod state;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stockwatch")]
#[command(about = "Watch in-store pickup availability and alert on changes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one fetch, diff, notify and persist cycle
    Run,
    /// Run cycles on a fixed interval until interrupted
    Watch {
        /// Seconds between cycles (defaults to STOCKWATCH_WATCH_INTERVAL_SECS)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,
    },
    /// Show how old the stored snapshot is
    Age,
    /// Delete the stored snapshot
    Clear,
    /// Fetch and diff without notifying or persisting
    DryRun {
        /// Also write the fetched snapshot as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration with secrets redacted
    ShowConfig,
    /// Verify the bot token and send a test message to every chat
    TestNotify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = stockwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Run) | None => cycle::run_once(&config).await,
        Some(Commands::Watch { interval_secs }) => {
            cycle::run_watch(&config, interval_secs.unwrap_or(config.watch_interval_secs)).await
        }
        Some(Commands::Age) => state::run_age(&config).await,
        Some(Commands::Clear) => state::run_clear(&config).await,
        Some(Commands::DryRun { output }) => cycle::run_dry(&config, output.as_deref()).await,
        Some(Commands::ShowConfig) => {
            println!("{config:#?}");
            Ok(())
        }
        Some(Commands::TestNotify) => notify::run_test_notify(&config).await,
    }
}

/// Resolves when the process receives Ctrl-C or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping");
}
