//! Application error types.

use std::fmt;

use crate::cache::StoreError;
use crate::db::DbError;
use crate::generator::GeneratorError;

use super::config::ConfigError;

/// Errors that can occur during application lifecycle.
#[derive(Debug)]
pub enum AppError {
    /// Configuration could not be resolved.
    Config(ConfigError),

    /// The connection pool could not be created.
    Database(DbError),

    /// The cache table could not be verified.
    Schema(StoreError),

    /// The tile generator could not be constructed.
    Generator(GeneratorError),

    /// The listening socket could not be bound.
    Bind(String),

    /// The HTTP server stopped with an error.
    Serve(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Schema(e) => write!(f, "Failed to prepare cache table: {}", e),
            AppError::Generator(e) => write!(f, "Failed to create tile generator: {}", e),
            AppError::Bind(msg) => write!(f, "Failed to bind listener: {}", msg),
            AppError::Serve(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Database(e) => Some(e),
            AppError::Schema(e) => Some(e),
            AppError::Generator(e) => Some(e),
            AppError::Bind(_) | AppError::Serve(_) => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        AppError::Database(e)
    }
}
