//! Gemini API client implementation
//!
//! This module provides a strongly-typed client for the Gemini REST API
//! (`v1beta`), with support for model listing and content generation.
//! Each call performs exactly one HTTP request; retries belong to the caller.

mod models;
pub use models::*;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;

use crate::config::{ConfigProvider, GeminiConfig, ServiceConfig};
use crate::core::{ClientBuilder, GenerativeBackend, ModelDescriptor};
use crate::error::{Result, ServiceError};
use crate::services::common::{parse_error_response, UserAgent};
use crate::util::{measure_time_async, sanitize_for_logging, truncate_string};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Upper bound on `GET /models` pages followed
const MAX_MODEL_PAGES: usize = 20;

/// Gemini API client
pub struct GeminiClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: GeminiConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a new Gemini client with custom configuration
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;

        let user_agent = UserAgent {
            extra: Some("gemini".to_string()),
            ..UserAgent::default()
        };

        let http_client = ClientBuilder::new()
            .api_key_header(API_KEY_HEADER, config.api_key.clone())
            .timeout(config.timeout())
            .user_agent(user_agent.to_string())
            .build_http_client()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Create a client from a configuration provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        Self::new(GeminiConfig::from_provider(provider)?)
    }

    /// Create a new builder for the Gemini client
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::default()
    }

    /// Get the client configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url, endpoint)
    }

    /// Fetch one page of `GET /models`
    pub async fn list_models_page(&self, page_token: Option<&str>) -> Result<ListModelsResponse> {
        let endpoint = "models";
        let url = self.url(endpoint);
        debug!("Sending request to Gemini: GET {}", url);

        let mut request = self.http_client.get(&url);
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(parse_error_response("gemini", endpoint, response).await);
        }

        let body = response.text().await?;
        serde_json::from_str::<ListModelsResponse>(&body).map_err(|e| {
            ServiceError::malformed(format!("Failed to parse model list: {}", e))
                .with_context_value("endpoint", endpoint)
        })
    }

    /// Send a `generateContent` request and classify the reply
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerationReply> {
        let endpoint = format!("models/{}:generateContent", model);
        let url = self.url(&endpoint);

        let (result, elapsed) = measure_time_async(|| async {
            let response = self.http_client.post(&url).json(request).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, ServiceError>((status, body))
        })
        .await;
        let (status, body) = result?;

        debug!(
            "Gemini POST {} -> {} in {:.2}ms",
            endpoint,
            status,
            elapsed.as_secs_f64() * 1000.0
        );
        if !status.is_success() {
            warn!(
                "Gemini returned {}: {}",
                status,
                sanitize_for_logging(&truncate_string(&body, 200))
            );
        }

        Ok(GenerationReply::classify(status, &body))
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let mut descriptors = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let page = self.list_models_page(page_token.as_deref()).await?;
            descriptors.extend(page.models.into_iter().map(ModelDescriptor::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => {
                    info!("Gemini offers {} models", descriptors.len());
                    return Ok(descriptors);
                }
            }
        }

        warn!(
            "Stopped listing Gemini models after {} pages",
            MAX_MODEL_PAGES
        );
        Ok(descriptors)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        debug!(
            "Prompt for {} ({} chars): {}",
            model,
            prompt.chars().count(),
            truncate_string(prompt, 120)
        );
        let request = GenerateContentRequest::from_prompt(prompt);
        self.generate_content(model, &request).await?.into_text()
    }
}

/// Builder for Gemini client
#[derive(Default)]
pub struct GeminiClientBuilder {
    /// API key for authentication
    api_key: Option<String>,

    /// Base URL for the API
    base_url: Option<String>,

    /// Request timeout
    timeout_seconds: Option<u64>,

    /// Preferred models in order
    preferred_models: Option<Vec<String>>,

    /// Model used when no preferred one is available
    fallback_model: Option<String>,
}

impl GeminiClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Set the preferred models
    pub fn preferred_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    /// Set the fallback model
    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    /// Build the Gemini client
    pub fn build(self) -> Result<GeminiClient> {
        let mut config = GeminiConfig::default();

        if let Some(api_key) = self.api_key {
            config.api_key = api_key;
        }

        if let Some(base_url) = self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }

        if let Some(models) = self.preferred_models {
            config.preferred_models = models;
        }

        if let Some(model) = self.fallback_model {
            config.fallback_model = model;
        }

        GeminiClient::new(config)
    }
}
