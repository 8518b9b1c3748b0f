//! Error handling for the batch coordinator
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for the batch coordinator
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for the batch coordinator
///
/// Batch-level failures (a processor error or a structural length mismatch)
/// are delivered to every pending submission as well as to the caller of
/// `run`, so this type is `Clone`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The processor returned a result sequence whose length does not
    /// match the number of queued submissions. Fatal for the whole batch.
    #[error("Processor returned {actual} results for a queue of {expected}")]
    LengthMismatch {
        /// Number of queued submissions
        expected: usize,
        /// Number of results the processor actually returned
        actual: usize,
    },

    /// The processor call itself failed. Fatal for the whole batch.
    #[error("Processor error: {0}")]
    Processor(String),

    /// A single submission was tagged as failed by the processor. Local to
    /// that submission; sibling submissions proceed normally.
    #[error("Submission failed: {0}")]
    Submission(serde_json::Value),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The batch was already run; no further submissions are accepted
    #[error("Batch already consumed")]
    Consumed,

    /// The batch was dropped before it was run, so this submission's
    /// outcome can never arrive
    #[error("Batch dropped before running")]
    Abandoned,
}

impl From<reqwest::Error> for BatchError {
    fn from(error: reqwest::Error) -> Self {
        BatchError::Http(error.to_string())
    }
}

impl From<serde_json::Error> for BatchError {
    fn from(error: serde_json::Error) -> Self {
        BatchError::Serialization(error.to_string())
    }
}
