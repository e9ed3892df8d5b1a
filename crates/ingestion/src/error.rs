//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Bus client failed to connect or subscribe
    #[error("bus error: {0}")]
    Bus(#[from] contracts::ContractError),

    /// Worker was already started
    #[error("worker for subject {subject} is already running")]
    AlreadyRunning {
        /// Subscribed subject
        subject: String,
    },

    /// Worker was stopped and cannot be restarted
    #[error("worker for subject {subject} has been stopped")]
    Stopped {
        /// Subscribed subject
        subject: String,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
