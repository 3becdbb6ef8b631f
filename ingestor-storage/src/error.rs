use thiserror::Error;

/// Errors raised by the storage adapter (§4.6, §4.7 "on storage error
/// returns an RPC error with status code and a human-readable detail").
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("wide-column store error: {0}")]
    WideColumn(String),

    #[error("relational store error: {0}")]
    Relational(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
