//! Error types for drydock-store

use thiserror::Error;

/// Result type for ledger operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the build history layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No record exists with the given id
    #[error("build record not found: {0}")]
    NotFound(String),

    /// The record id is not a plain file name
    #[error("invalid build record id: {0}")]
    InvalidId(String),
}
