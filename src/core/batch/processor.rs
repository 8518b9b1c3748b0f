//! Batch processors
//!
//! A processor converts an ordered sequence of inputs into an ordered
//! sequence of per-input outcomes. The default [`HttpBatchProcessor`] folds
//! the whole sequence into one physical POST against a batch endpoint.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BatchEndpointConfig;
use crate::core::batch::types::{
    ApiRequest, BatchOutcome, BatchRequestEnvelope, BatchResponseEnvelope, WireRequest,
};
use crate::utils::error::{BatchError, Result};

/// Converts a batch of inputs into a batch of outcomes.
///
/// The returned sequence must align positionally with `inputs` and have the
/// same length; the coordinator treats any length mismatch as fatal for the
/// whole batch. Returning `Err` fails the whole batch as well.
#[async_trait]
pub trait BatchProcessor<I, O>: Send + Sync {
    /// Process every input, producing one outcome per input in order.
    async fn process(&self, inputs: Vec<I>) -> Result<Vec<BatchOutcome<O>>>;
}

#[async_trait]
impl<I, O, F, Fut> BatchProcessor<I, O> for F
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(Vec<I>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<BatchOutcome<O>>>> + Send + 'static,
{
    async fn process(&self, inputs: Vec<I>) -> Result<Vec<BatchOutcome<O>>> {
        (self)(inputs).await
    }
}

/// Default processor: one POST to a batch endpoint per run.
///
/// Sends `{ "validation": ..., "requests": [...] }` and decodes the
/// `{ "failed": ..., "responses": [...] }` envelope back into per-request
/// outcomes. Sub-responses with a 2xx status resolve with their body;
/// anything else rejects with the body as the error payload.
pub struct HttpBatchProcessor {
    client: reqwest::Client,
    config: BatchEndpointConfig,
}

impl HttpBatchProcessor {
    /// Create a processor with its own HTTP client, honoring the configured
    /// request timeout.
    pub fn new(config: BatchEndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a processor reusing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, config: BatchEndpointConfig) -> Self {
        Self { client, config }
    }

    /// The endpoint configuration in use.
    pub fn config(&self) -> &BatchEndpointConfig {
        &self.config
    }
}

#[async_trait]
impl BatchProcessor<ApiRequest, Value> for HttpBatchProcessor {
    async fn process(&self, inputs: Vec<ApiRequest>) -> Result<Vec<BatchOutcome<Value>>> {
        let url = self.config.endpoint_url()?;
        let envelope = BatchRequestEnvelope {
            validation: self.config.validation,
            requests: inputs.into_iter().map(WireRequest::from).collect(),
        };

        debug!(requests = envelope.requests.len(), %url, "dispatching batch request");

        let response = self.client.post(url).json(&envelope).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BatchError::Http(format!(
                "batch endpoint returned {status}"
            )));
        }

        let envelope: BatchResponseEnvelope = response.json().await?;

        if envelope.failed {
            warn!("batch endpoint reported whole-batch validation failure");
            return Ok(envelope
                .responses
                .into_iter()
                .map(|sub| BatchOutcome::Error(BatchError::Submission(sub.body)))
                .collect());
        }

        Ok(envelope
            .responses
            .into_iter()
            .map(|sub| {
                if (200..300).contains(&sub.status) {
                    BatchOutcome::Output(sub.body)
                } else {
                    BatchOutcome::Error(BatchError::Submission(sub.body))
                }
            })
            .collect())
    }
}
