use thiserror::Error;

/// Errors raised by the message-bus abstraction.
#[derive(Error, Debug)]
pub enum BusError {
    #[error("broker connection or channel error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("failed to serialize message for publish: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BusError>;
