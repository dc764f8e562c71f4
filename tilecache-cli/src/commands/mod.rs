//! CLI subcommands.

pub mod cache;
pub mod serve;

use std::path::Path;

use tilecache::app::AppConfig;

use crate::error::CliError;

/// Resolve configuration from an explicit file or the default location,
/// then the environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    Ok(AppConfig::load(path)?)
}
