//! Request batching
//!
//! This module provides the batch coordinator, which combines many logical
//! API operations into a single physical call and routes each individual
//! result back to the caller that submitted it.

mod coordinator;
mod processor;
mod sized;
mod types;

#[cfg(test)]
mod tests;

// Re-export all public types
pub use coordinator::{Batch, Enqueuer, PendingOutcome};
pub use processor::{BatchProcessor, HttpBatchProcessor};
pub use sized::{ProcessReport, SizedBatch};
pub use types::{ApiRequest, BatchOutcome};
