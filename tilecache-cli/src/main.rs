//! tilecache CLI - Command-line interface
//!
//! Runs the tile server and administers its cache.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tilecache::logging::{init_logging, LogConfig};

use commands::cache::CacheAction;
use commands::serve::ServeArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilecache", version, about = "Vector tile server with a persistent tile cache")]
struct Cli {
    /// Config file (default: <config dir>/tilecache/config.ini if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write daily-rolling log files to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the tile server
    Serve(ServeArgs),
    /// Inspect and maintain the tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn log_config(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::default();
    match cli.verbose {
        0 => {}
        1 => config = config.with_filter("tilecache=debug,tower_http=debug,info"),
        _ => config = config.with_filter("trace"),
    }
    if let Some(dir) = &cli.log_dir {
        config = config.with_directory(dir.clone());
    }
    config
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, config).await,
        Commands::Cache { action } => commands::cache::run(action, config).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(&log_config(&cli)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_cache_invalidate() {
        let cli = Cli::parse_from(["tilecache", "cache", "invalidate", "14", "8192", "8191"]);
        match cli.command {
            Commands::Cache {
                action: CacheAction::Invalidate { zoom, x, y },
            } => {
                assert_eq!(zoom, 14);
                assert_eq!(x, Some(8192));
                assert_eq!(y, Some(8191));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbosity_selects_filter() {
        let cli = Cli::parse_from(["tilecache", "-vv", "cache", "stats"]);
        assert_eq!(log_config(&cli).filter.as_deref(), Some("trace"));

        let cli = Cli::parse_from(["tilecache", "--log-dir", "/tmp/logs", "cache", "stats"]);
        let config = log_config(&cli);
        assert!(config.filter.is_none());
        assert_eq!(config.directory, Some(PathBuf::from("/tmp/logs")));
    }
}
