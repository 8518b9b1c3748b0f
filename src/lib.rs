//! # Coalesce-RS
//!
//! A request-batching coordinator: many independent callers each submit one
//! logical operation, all pending operations are combined into a single
//! physical call to a processor, and each individual result (success or
//! failure) is routed back to the specific caller that submitted it.
//!
//! ## Features
//!
//! - **One physical call**: the processor runs exactly once per batch, over
//!   every queued input in submission order
//! - **Per-caller outcomes**: every submission gets its own future that
//!   resolves or rejects independently of its siblings
//! - **Deferred submissions**: reserve a slot now, enqueue after awaiting
//!   other work; the batch never fires before every reservation is filled
//! - **Pluggable processors**: any async function over the input sequence,
//!   or the built-in HTTP processor that posts one envelope to a batch
//!   endpoint
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coalesce_rs::{ApiRequest, Batch, BatchEndpointConfig, HttpBatchProcessor};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchEndpointConfig::new("https://example.com");
//!     let batch = Batch::new(HttpBatchProcessor::new(config)?);
//!
//!     let dune = batch.add(ApiRequest::post("/v1/books").with_data(json!({ "title": "Dune" })));
//!     let lotr = batch
//!         .add(ApiRequest::post("/v1/books").with_data(json!({ "title": "Lord of the Rings" })));
//!
//!     // Sends one POST to /v1/batch.
//!     if batch.run().await? {
//!         println!("Saved two books: {} {}", dune.await?, lotr.await?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Processors
//!
//! ```rust
//! use coalesce_rs::{Batch, BatchOutcome, Result};
//!
//! async fn double(inputs: Vec<u32>) -> Result<Vec<BatchOutcome<u32>>> {
//!     Ok(inputs
//!         .into_iter()
//!         .map(|n| BatchOutcome::Output(n * 2))
//!         .collect())
//! }
//!
//! # tokio_test::block_on(async {
//! let batch: Batch<u32, u32> = Batch::new(double);
//! let pending = batch.add(21);
//! assert!(batch.run().await.unwrap());
//! assert_eq!(pending.await.unwrap(), 42);
//! # });
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export main types
pub use config::{BatchEndpointConfig, ValidationMode};
pub use crate::core::batch::{
    ApiRequest, Batch, BatchOutcome, BatchProcessor, Enqueuer, HttpBatchProcessor, PendingOutcome,
    ProcessReport, SizedBatch,
};
pub use utils::error::{BatchError, Result};
pub use utils::logging::init_logging;
