//! DevTrack CLI - command-line client for the DevTrack academic tracker

mod commands;
mod logging;
mod watch;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use commands::Commands;
use devtrack_core::{ClientConfig, CredentialVault, FileStore};
use devtrack_http::DevTrackClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info};

#[derive(Parser)]
#[command(name = "devtrack")]
#[command(about = "Command-line client for the DevTrack academic tracker")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Configuration file (TOML). DEVTRACK_* environment variables override it.
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the stored session and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the DevTrack API
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Timeout for one-shot commands in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "120")]
    timeout: u64,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config =
            ClientConfig::load(self.config.as_deref()).context("Failed to load configuration")?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.client_config()?;

    let component = match &cli.command {
        Commands::Watch { .. } => "watch",
        _ => "cli",
    };
    logging::init_logging(
        cli.log_level.clone().into(),
        &config.data_dir,
        component,
        cli.no_file_log,
    )?;

    debug!(api = %config.api_base_url, data_dir = %config.data_dir.display(), "Starting DevTrack CLI");

    let store = Arc::new(FileStore::new(&config.data_dir));
    let vault = Arc::new(CredentialVault::open(store).context("Failed to read stored session")?);
    let client = DevTrackClient::from_config(&config, vault)?;

    let long_running = matches!(cli.command, Commands::Watch { .. });
    let run = cli.command.execute(client, &config, cli.json);

    if cli.timeout == 0 || long_running {
        match run.await {
            Ok(()) => {
                info!("Command completed successfully");
            }
            Err(e) => {
                error!("Command failed: {e:#}");
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, run).await {
            Ok(Ok(())) => {
                info!("Command completed successfully");
            }
            Ok(Err(e)) => {
                error!("Command failed: {e:#}");
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                eprintln!("Error: timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "devtrack",
            "notifications",
            "unread",
            "--json",
            "--api-url",
            "https://api.devtrack.test",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.api_url.as_deref(), Some("https://api.devtrack.test"));
    }

    #[test]
    fn watch_poll_interval_defaults_to_thirty_seconds() {
        let cli = Cli::try_parse_from(["devtrack", "watch"]).unwrap();
        match cli.command {
            Commands::Watch { poll_secs } => assert_eq!(poll_secs, 30),
            _ => panic!("expected watch"),
        }
    }
}
