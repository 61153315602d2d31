//! Error types for budgetd

use budget_runtime::BudgetError;
use budget_types::MessageError;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Runtime collaborator error
    #[error("Runtime error: {0}")]
    Runtime(#[from] BudgetError),

    /// Rejected control message
    #[error("Invalid control message: {0}")]
    Message(#[from] MessageError),

    /// Snapshot rendering error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for DaemonError {
    fn from(err: config::ConfigError) -> Self {
        DaemonError::Config(err.to_string())
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
