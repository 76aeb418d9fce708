//! Error types for the adapter crate.

use crate::handlers::database::types::DatabaseError;
use thiserror::Error;

/// Result type alias for crate-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level errors
#[derive(Debug, Error)]
pub enum Error {
    /// Storage adapter error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration source could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    /// Subscriber installation failed
    #[error("Logging error: {0}")]
    Logging(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
