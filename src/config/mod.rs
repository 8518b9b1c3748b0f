//! Configuration for the default batch endpoint processor

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::utils::error::{BatchError, Result};

/// How the batch endpoint should validate sub-requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Reject the whole batch unless every sub-request validates
    #[default]
    RequireAllValidate,
    /// Validate each sub-request independently
    Normal,
}

/// Where and how the default processor sends its one physical request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEndpointConfig {
    /// Base URL of the API, e.g. `https://example.com`
    pub api_base: String,
    /// Route of the batch endpoint relative to the base
    pub path: String,
    /// Validation mode announced to the endpoint
    pub validation: ValidationMode,
    /// Timeout for the whole physical request
    pub timeout: Duration,
}

impl Default for BatchEndpointConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            path: "/v1/batch".to_string(),
            validation: ValidationMode::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl BatchEndpointConfig {
    /// Create a config for the given API base with default endpoint path,
    /// validation mode, and timeout.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `BATCH_API_BASE` is required; `BATCH_API_PATH` and
    /// `BATCH_TIMEOUT_SECS` are optional overrides.
    pub fn from_env() -> Result<Self> {
        info!("Loading batch endpoint configuration from environment variables");

        let api_base = std::env::var("BATCH_API_BASE")
            .map_err(|_| BatchError::Config("BATCH_API_BASE is not set".to_string()))?;

        let mut config = Self::new(api_base);

        if let Ok(path) = std::env::var("BATCH_API_PATH") {
            config.path = path;
        }

        if let Ok(secs) = std::env::var("BATCH_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .map_err(|e| BatchError::Config(format!("invalid BATCH_TIMEOUT_SECS: {e}")))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the endpoint path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the validation mode
    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the batch endpoint.
    pub fn endpoint_url(&self) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );

        Url::parse(&joined)
            .map_err(|e| BatchError::Config(format!("invalid batch endpoint {joined}: {e}")))
    }
}
