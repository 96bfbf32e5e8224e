//! Error types for storage operations.

use huelva_traits::HuelvaError;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by the SQLite layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A frame or query does not fit the table layout
    #[error("Schema error: {0}")]
    Schema(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl From<StoreError> for HuelvaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Polars(e) => Self::Polars(e),
            other => Self::Storage(other.to_string()),
        }
    }
}
