//! Error types for the synchronization engine
//!
//! Symbol-level errors never escape a run: the fetcher turns `FetchError`
//! into a `Failed` outcome and the coordinator turns `PersistenceError` on a
//! single record into a summary entry.

use std::time::Duration;
use thiserror::Error;

use crate::database::connection::DatabaseError;

/// Errors raised while obtaining a quote for one symbol
///
/// # Error Categories
///
/// - **Transient**: `Transport`, `Timeout`, `EmptyData` (retried)
/// - **Data quality**: `DataQuality` (failed immediately)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Network or provider-side failure
    #[error("Provider request failed: {0}")]
    Transport(String),

    /// The provider did not answer within the per-attempt timeout
    #[error("Provider request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered without enough price points
    #[error("Insufficient price data: {points} point(s) available")]
    EmptyData { points: usize },

    /// Values were present but unusable (non-finite, zero reference, missing field)
    #[error("Bad quote data: {0}")]
    DataQuality(String),
}

impl FetchError {
    /// Returns true if another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::DataQuality(_))
    }
}

/// Errors raised by the persistence gateway
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected a specific record
    #[error("Record {key} rejected: {reason}")]
    Rejected { key: String, reason: String },

    /// Underlying database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::EmptyData { points: 1 };
        assert_eq!(err.to_string(), "Insufficient price data: 1 point(s) available");

        let err = PersistenceError::Rejected {
            key: "TCS".to_string(),
            reason: "constraint".to_string(),
        };
        assert_eq!(err.to_string(), "Record TCS rejected: constraint");
    }

    #[test]
    fn test_retry_classification() {
        assert!(FetchError::Transport("reset".to_string()).is_retryable());
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(FetchError::EmptyData { points: 0 }.is_retryable());
        assert!(!FetchError::DataQuality("zero".to_string()).is_retryable());
    }
}
