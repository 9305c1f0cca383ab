//! fleetctl - Terminal Front End for the Fleet Console
//!
//! # Usage
//!
//! ```bash
//! # Follow a Docker script's build log (Ctrl+C aborts)
//! fleetctl build-logs 3f2a9c
//!
//! # Tail the simulated activity feed, errors only
//! fleetctl tail --level error --count 20
//!
//! # List resources
//! fleetctl list instances
//! fleetctl list scripts --json
//!
//! # Point at another API
//! fleetctl --api-base http://10.0.0.5:8000 list credentials
//!
//! # Verbose logging (to stderr)
//! RUST_LOG=debug fleetctl build-logs 3f2a9c
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fleet_core::config::{self, ConfigOverrides, FleetConfig};
use fleet_core::LogLevel;
use tracing::debug;

/// fleetctl - manage and observe a fleet of code-server instances
#[derive(Parser, Debug)]
#[command(name = "fleetctl")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "FLEET_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Fleet API base URL (overrides config and FLEET_API_BASE)
    #[arg(long, value_name = "URL", global = true)]
    api_base: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "FLEET_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the build log of a Docker script
    BuildLogs {
        /// Docker script ID
        script_id: String,
    },

    /// Tail the simulated activity feed
    Tail {
        /// Only show entries of this level
        #[arg(long, value_parser = parse_level)]
        level: Option<LogLevel>,

        /// Only show entries whose message or source contains this text
        #[arg(long, default_value = "")]
        search: String,

        /// Stop after this many emissions
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Milliseconds between emissions
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Write the visible feed to this directory on exit
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,

        /// Instance name used in the export file name
        #[arg(long, default_value = "local")]
        instance: String,
    },

    /// List resources
    List {
        /// What to list
        resource: Resource,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Resource {
    Instances,
    Credentials,
    Scripts,
    Templates,
}

fn parse_level(raw: &str) -> Result<LogLevel, String> {
    raw.parse().map_err(|e: fleet_core::feed::ParseLevelError| e.to_string())
}

/// Initialize logging with the specified level
///
/// Logs go to stderr; stdout carries only command output.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("fleetctl={level},fleet_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<FleetConfig> {
    let mut config = match &args.config {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file not found: {}", path.display());
            config::load_config_from_path(Some(path.as_path()))
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => config::load_config().context("Failed to load configuration")?,
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(base) = &args.api_base {
        overrides = overrides.with_api_base(base.clone());
    }
    if let Command::Tail {
        interval_ms: Some(ms),
        ..
    } = &args.command
    {
        overrides = overrides.with_feed_interval_ms(*ms);
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line option")?;

    for (key, source) in config.overridden() {
        debug!(key, %source, "config value");
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_config(&args)?;

    match args.command {
        Command::BuildLogs { script_id } => commands::build_logs(&config, &script_id).await,
        Command::Tail {
            level,
            search,
            count,
            seed,
            export,
            instance,
            ..
        } => {
            let options = commands::TailOptions {
                level,
                search,
                count,
                seed,
                export,
                instance,
            };
            commands::tail(&config, options).await
        }
        Command::List { resource, json } => {
            let resource = match resource {
                Resource::Instances => commands::ListResource::Instances,
                Resource::Credentials => commands::ListResource::Credentials,
                Resource::Scripts => commands::ListResource::Scripts,
                Resource::Templates => commands::ListResource::Templates,
            };
            commands::list(&config, resource, json).await
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_tail() {
        let args = Args::try_parse_from([
            "fleetctl", "tail", "--level", "warning", "--search", "memory", "-n", "5",
        ])
        .unwrap();
        match args.command {
            Command::Tail {
                level, search, count, ..
            } => {
                assert_eq!(level, Some(LogLevel::Warning));
                assert_eq!(search, "memory");
                assert_eq!(count, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_api_base_after_subcommand() {
        let args =
            Args::try_parse_from(["fleetctl", "list", "scripts", "--api-base", "http://x:1"]).unwrap();
        assert_eq!(args.api_base.as_deref(), Some("http://x:1"));
    }

    #[test]
    fn test_bad_level_is_rejected() {
        assert!(Args::try_parse_from(["fleetctl", "tail", "--level", "loud"]).is_err());
    }
}
