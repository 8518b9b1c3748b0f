//! Core batching functionality

pub mod batch;
