use thiserror::Error;

/// Errors shared across the chat-ingestor domain crate.
#[derive(Error, Debug)]
pub enum IngestorError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid chat message: {0}")]
    InvalidMessage(String),
}

pub type Result<T> = std::result::Result<T, IngestorError>;
