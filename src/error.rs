//! Error types for the Tessera library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`TesseraError`] enum. Unknown vocabulary entries at inference time are not
//! errors; they are dropped silently by the encoder.
//!
//! # Examples
//!
//! ```
//! use tessera::error::{TesseraError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TesseraError::invalid_feature("weight is NaN"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Tessera operations.
#[derive(Error, Debug)]
pub enum TesseraError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A feature value that cannot be encoded (NaN, infinity, no matching encoder).
    #[error("Invalid feature value: {0}")]
    InvalidFeatureValue(String),

    /// An outcome string whose prefix is not one of B, I or O.
    #[error("Malformed chunk outcome: {0}")]
    MalformedChunkOutcome(String),

    /// Token and outcome sequences of different lengths.
    #[error("Instance shape mismatch: {tokens} tokens but {outcomes} outcomes")]
    InstanceShapeMismatch { tokens: usize, outcomes: usize },

    /// Reading or writing a persisted artifact failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Several persistence steps failed; every failure is reported.
    #[error("{} persistence failure(s): {}", .0.len(), .0.join("; "))]
    PersistenceFailures(Vec<String>),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with TesseraError.
pub type Result<T> = std::result::Result<T, TesseraError>;

impl TesseraError {
    /// Create a new invalid feature value error.
    pub fn invalid_feature<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidFeatureValue(msg.into())
    }

    /// Create a new malformed chunk outcome error.
    pub fn malformed_outcome<S: Into<String>>(msg: S) -> Self {
        TesseraError::MalformedChunkOutcome(msg.into())
    }

    /// Create a new persistence error.
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        TesseraError::Persistence(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        TesseraError::Storage(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TesseraError::Config(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        TesseraError::InvalidOperation(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        TesseraError::Other(msg.into())
    }

    /// Collapse a list of collected failures into a single result.
    ///
    /// An empty list is success, a single failure is returned as is, and
    /// several failures become [`TesseraError::PersistenceFailures`].
    pub fn aggregate(mut errors: Vec<TesseraError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(TesseraError::PersistenceFailures(
                errors.iter().map(|e| e.to_string()).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = TesseraError::invalid_feature("weight is NaN");
        assert_eq!(error.to_string(), "Invalid feature value: weight is NaN");

        let error = TesseraError::malformed_outcome("X-PER");
        assert_eq!(error.to_string(), "Malformed chunk outcome: X-PER");

        let error = TesseraError::InstanceShapeMismatch {
            tokens: 3,
            outcomes: 2,
        };
        assert_eq!(
            error.to_string(),
            "Instance shape mismatch: 3 tokens but 2 outcomes"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = TesseraError::from(io_error);

        match error {
            TesseraError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_aggregate() {
        assert!(TesseraError::aggregate(Vec::new()).is_ok());

        let single = TesseraError::aggregate(vec![TesseraError::persistence("a")]);
        assert!(matches!(single, Err(TesseraError::Persistence(_))));

        let many = TesseraError::aggregate(vec![
            TesseraError::persistence("a"),
            TesseraError::storage("b"),
        ]);
        match many {
            Err(TesseraError::PersistenceFailures(messages)) => {
                assert_eq!(messages.len(), 2);
                assert_eq!(messages[0], "Persistence error: a");
                assert_eq!(messages[1], "Storage error: b");
            }
            other => panic!("Expected aggregated failures, got {other:?}"),
        }
    }
}
