//! Error types for the Huelva pipeline.
//!
//! Configuration errors and data-contract violations are fatal for the unit of
//! work that raised them. Numerical degeneracies never surface here; the math
//! layer answers them with `NaN` or a documented fallback value.

use thiserror::Error;

/// The main error type for Huelva operations.
#[derive(Debug, Error)]
pub enum HuelvaError {
    /// Invalid or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A factor class that no algorithm is registered for.
    #[error("Unknown factor class: {0}")]
    UnknownFactorClass(String),

    /// Input panels do not honour their documented contract.
    #[error("Data contract violation: {0}")]
    DataContract(String),

    /// Error when a required column is missing from the data.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A join produced a different number of rows than one of its inputs.
    #[error("Row count mismatch in {context}: joined {joined} rows, input has {expected}")]
    RowCountMismatch {
        /// Where the join happened.
        context: String,
        /// Rows after the join.
        joined: usize,
        /// Rows of the input the join was checked against.
        expected: usize,
    },

    /// Error when a date is out of range or malformed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// An append whose first date does not follow the persisted data.
    #[error("Discontinuous append to {table}: expected {expected}, got {incoming}")]
    Discontinuity {
        /// Table name.
        table: String,
        /// The date the batch had to start at.
        expected: String,
        /// The date the batch started at.
        incoming: String,
    },

    /// A per-instrument computation failed.
    #[error("Instrument {instrument} failed: {source}")]
    Instrument {
        /// The failing instrument.
        instrument: String,
        /// The underlying error.
        #[source]
        source: Box<HuelvaError>,
    },

    /// Error when data is insufficient for the requested operation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Error from file IO.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reading CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error raised by a storage backend.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl HuelvaError {
    /// Wraps an error with the instrument it was raised for.
    pub fn for_instrument(instrument: impl Into<String>, source: Self) -> Self {
        Self::Instrument {
            instrument: instrument.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error stems from configuration rather than data.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::UnknownFactorClass(_))
    }
}

impl From<String> for HuelvaError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for HuelvaError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for Huelva operations.
pub type Result<T> = std::result::Result<T, HuelvaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HuelvaError::MissingColumn("close_major".to_string());
        assert_eq!(err.to_string(), "Missing required column: close_major");

        let err = HuelvaError::RowCountMismatch {
            context: "returns x factors".to_string(),
            joined: 8,
            expected: 10,
        };
        assert_eq!(
            err.to_string(),
            "Row count mismatch in returns x factors: joined 8 rows, input has 10"
        );
    }

    #[test]
    fn test_instrument_wrapping() {
        let err = HuelvaError::for_instrument("CU", HuelvaError::InvalidDate("2019".into()));
        assert!(err.to_string().starts_with("Instrument CU failed"));
        assert!(matches!(err, HuelvaError::Instrument { .. }));
    }

    #[test]
    fn test_config_classification() {
        assert!(HuelvaError::Config("bad".into()).is_config());
        assert!(HuelvaError::UnknownFactorClass("XYZ".into()).is_config());
        assert!(!HuelvaError::Other("x".into()).is_config());
    }

    #[test]
    fn test_from_string() {
        let err: HuelvaError = "fail".into();
        assert!(matches!(err, HuelvaError::Other(_)));
    }
}
