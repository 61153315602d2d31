use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the runtime's collaborators.
///
/// Malformed control messages never surface here; the inbox drops them.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Persisted ledger exists but could not be parsed
    #[error("corrupt ledger state in {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("state store error: {0}")]
    Store(String),

    #[error("control inbox error: {0}")]
    Inbox(String),

    #[error("completion marker error: {0}")]
    Markers(String),

    #[error("wealth source error: {0}")]
    Wealth(String),

    #[error("status publish error: {0}")]
    Publish(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for runtime results.
pub type BudgetResult<T> = Result<T, BudgetError>;
