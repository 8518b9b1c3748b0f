//! Error types for the batch coordinator

mod error;

pub use error::{BatchError, Result};
