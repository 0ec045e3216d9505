//! Error types for the mqueue command-line tool.

use thiserror::Error;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Queue engine or store error
    #[error(transparent)]
    Queue(#[from] mqueue::MqueueError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
