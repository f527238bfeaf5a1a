//! Error types for the message board.

use crate::hub::SessionId;
use thiserror::Error;

/// Main error type for board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Snapshot is locked by another process")]
    Locked,

    #[error("Session dropped: {0}")]
    SessionDropped(SessionId),

    #[error("Snapshot writer has stopped")]
    WriterStopped,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for BoardError {
    fn from(e: serde_json::Error) -> Self {
        BoardError::Serialization(e.to_string())
    }
}

/// Result type for board operations.
pub type Result<T> = std::result::Result<T, BoardError>;
