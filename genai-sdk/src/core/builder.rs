//! Client builder implementation
//!
//! Provides a unified builder pattern for creating and configuring the HTTP
//! client and the retry executor used by service clients.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client as ReqwestClient;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, ServiceError};
use crate::resilience::{RetryConfig, RetryExecutor, Sleeper};

/// Unified client builder for all service clients
pub struct ClientBuilder {
    /// Header carrying the API key, and the key itself
    api_key: Option<(String, String)>,

    /// Custom headers to include with all requests
    custom_headers: HashMap<String, String>,

    /// Request timeout
    timeout: Option<Duration>,

    /// Retry configuration
    retry_config: Option<RetryConfig>,

    /// Sleeper used between retries
    sleeper: Option<Arc<dyn Sleeper>>,

    /// User agent
    user_agent: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            custom_headers: HashMap::new(),
            timeout: Some(Duration::from_secs(60)),
            retry_config: Some(RetryConfig::default()),
            sleeper: None,
            user_agent: Some(format!("genai-sdk/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `key` in the `header` header of every request
    pub fn api_key_header(mut self, header: impl Into<String>, key: impl Into<String>) -> Self {
        self.api_key = Some((header.into(), key.into()));
        self
    }

    /// Add a custom header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(key.into(), value.into());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Configure retry behavior
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Replace the sleeper used between retries
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build an HTTP client with the configured settings
    pub fn build_http_client(&self) -> Result<ReqwestClient> {
        let mut builder = ReqwestClient::builder();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        builder = builder.gzip(true);

        // Build default headers
        let mut headers = HeaderMap::new();
        for (key, value) in &self.custom_headers {
            let header_name = HeaderName::from_str(key)
                .map_err(|e| ServiceError::configuration(format!("Invalid header name: {}", e)))?;

            let header_value = HeaderValue::from_str(value)
                .map_err(|e| ServiceError::configuration(format!("Invalid header value: {}", e)))?;

            headers.insert(header_name, header_value);
        }

        if let Some((ref name, ref key)) = self.api_key {
            let header_name = HeaderName::from_str(name)
                .map_err(|e| ServiceError::configuration(format!("Invalid header name: {}", e)))?;
            let mut header_value = HeaderValue::from_str(key)
                .map_err(|_| ServiceError::configuration("API key contains invalid characters"))?;
            header_value.set_sensitive(true);
            headers.insert(header_name, header_value);
        }

        builder = builder.default_headers(headers);

        builder
            .build()
            .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
    }

    /// Build a retry executor with the configured settings
    pub fn build_retry_executor(&self) -> Result<RetryExecutor> {
        let retry_config = self.retry_config.clone().unwrap_or_default();
        retry_config.validate()?;

        let executor = RetryExecutor::new(retry_config);
        Ok(match self.sleeper {
            Some(ref sleeper) => executor.with_sleeper(Arc::clone(sleeper)),
            None => executor,
        })
    }
}
