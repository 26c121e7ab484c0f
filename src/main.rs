//! CLI entry point for the telescope control daemon.
//!
//! ```bash
//! srt-daemon run --config-dir ./config
//! ```

use clap::{Parser, Subcommand};
use srt_daemon::coordinator::run_daemon;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "srt-daemon")]
#[command(about = "Control daemon for a small radio telescope", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon: startup synchronization, then run until `quit`.
    Run {
        /// Directory containing config.yaml, sky_coords.csv, and calibration.json.
        #[arg(long, default_value = "./config")]
        config_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config_dir } => {
            run_daemon(&config_dir).await?;
        }
    }

    Ok(())
}
