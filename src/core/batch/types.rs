//! Batch processing types and wire-level data structures

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ValidationMode;
use crate::utils::error::BatchError;

/// Outcome of a single submission as reported by a processor.
///
/// A processor returns one outcome per input, positionally aligned with the
/// input sequence it was given.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome<O> {
    /// The submission succeeded with this payload
    Output(O),
    /// The submission failed; only this submission is rejected
    Error(BatchError),
}

impl BatchOutcome<Value> {
    /// Interpret a loosely-tagged response record.
    ///
    /// Records carrying a non-null `"error"` member reject the submission
    /// with that error payload. Records carrying a non-null `"output"`
    /// member resolve with that payload. Anything else resolves with the
    /// raw value itself, so processors may return plain values instead of
    /// tagged result objects.
    pub fn from_response(value: Value) -> Self {
        if let Some(error) = value.get("error").filter(|v| !v.is_null()) {
            return BatchOutcome::Error(BatchError::Submission(error.clone()));
        }

        match value.get("output").filter(|v| !v.is_null()) {
            Some(output) => BatchOutcome::Output(output.clone()),
            None => BatchOutcome::Output(value),
        }
    }
}

/// One logical API operation submitted to a batch.
///
/// This is the input type understood by [`HttpBatchProcessor`], which folds
/// many of these into a single physical POST.
///
/// [`HttpBatchProcessor`]: crate::core::batch::HttpBatchProcessor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// API route the sub-request targets, e.g. `/v1/books`
    pub path: String,
    /// HTTP method, `POST` by default
    #[serde(default = "default_method")]
    pub method: String,
    /// Request payload; sent as the sub-request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Extra headers for this sub-request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

fn default_method() -> String {
    "POST".to_string()
}

impl ApiRequest {
    /// Create a POST request for the given path
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: default_method(),
            data: None,
            headers: None,
        }
    }

    /// Create a request with an explicit method
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            data: None,
            headers: None,
        }
    }

    /// Attach a payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Envelope posted to the batch endpoint
#[derive(Debug, Serialize)]
pub(crate) struct BatchRequestEnvelope {
    pub validation: ValidationMode,
    pub requests: Vec<WireRequest>,
}

/// Sub-request as it appears on the wire; `data` is renamed to `body`
#[derive(Debug, Serialize)]
pub(crate) struct WireRequest {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

impl From<ApiRequest> for WireRequest {
    fn from(request: ApiRequest) -> Self {
        Self {
            path: request.path,
            body: request.data,
            method: request.method,
            headers: request.headers,
        }
    }
}

/// Envelope returned by the batch endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct BatchResponseEnvelope {
    /// Whole-batch validation failure marker
    #[serde(default)]
    pub failed: bool,
    pub responses: Vec<WireResponse>,
}

/// One sub-response inside the envelope
#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}
