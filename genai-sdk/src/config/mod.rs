//! Configuration management for service clients
//!
//! This module provides utilities for loading and validating configuration
//! for external service clients, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};
use crate::resilience::RetryConfig;

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Models tried in order when selecting one at startup
pub const DEFAULT_PREFERRED_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.0-pro"];

/// Model used when none of the preferred ones is offered
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-1.0-pro";

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

impl ConfigProvider for Box<dyn ConfigProvider> {
    fn get_string(&self, key: &str) -> Result<String> {
        self.as_ref().get_string(key)
    }
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.trim().parse::<i64>().map_err(|e| {
            ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e))
        })
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key)
            .unwrap_or_else(|_| default.to_string())
    }

    /// Get a boolean value, falling back to `default` only when the key is absent
    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get_string(key) {
            Ok(_) => self.get_bool(key),
            Err(_) => Ok(default),
        }
    }

    /// Get a typed value, falling back to `default` only when the key is absent
    ///
    /// A present but unparseable value is a configuration error.
    fn get_parsed_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        match self.get_string(key) {
            Ok(value) => value.trim().parse::<T>().map_err(|e| {
                ServiceError::configuration(format!("Invalid value for key {}: {}", key, e))
            }),
            Err(_) => Ok(default),
        }
    }

    /// Get a comma-separated list with a default
    fn get_list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.get_string(key) {
            Ok(value) => value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => default.iter().map(|item| item.to_string()).collect(),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        // Uppercase and replace non-alphanumeric with underscores
        env_key.push_str(
            &key.to_uppercase()
                .replace(|c: char| !c.is_ascii_alphanumeric(), "_"),
        );

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    /// Configuration values
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values.get(key).cloned().ok_or_else(|| {
            ServiceError::configuration(format!("Configuration key not found: {}", key))
        })
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Debug, Clone)]
pub struct CompositeConfigProvider<P: ConfigProvider> {
    /// Ordered list of config providers to try
    providers: Vec<P>,
}

impl<P: ConfigProvider> Default for CompositeConfigProvider<P> {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
        }
    }
}

impl<P: ConfigProvider> CompositeConfigProvider<P> {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the chain
    pub fn add_provider(&mut self, provider: P) {
        self.providers.push(provider);
    }

    /// Create a new provider with an initial list
    pub fn with_providers(providers: Vec<P>) -> Self {
        Self { providers }
    }
}

impl<P: ConfigProvider> ConfigProvider for CompositeConfigProvider<P> {
    fn get_string(&self, key: &str) -> Result<String> {
        for provider in &self.providers {
            if let Ok(value) = provider.get_string(key) {
                return Ok(value);
            }
        }

        Err(ServiceError::configuration(format!(
            "Configuration key not found in any provider: {}",
            key
        )))
    }
}

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Configuration for the Gemini REST API
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, sent in the `x-goog-api-key` header
    pub api_key: String,

    /// Base URL (can be changed for proxies and tests)
    pub base_url: String,

    /// Preferred models in order
    pub preferred_models: Vec<String>,

    /// Model used when no preferred one is available
    pub fallback_model: String,

    /// Timeout in seconds
    pub timeout_seconds: u64,
}

// Keep the key out of logs
impl Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("preferred_models", &self.preferred_models)
            .field("fallback_model", &self.fallback_model)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            preferred_models: DEFAULT_PREFERRED_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            timeout_seconds: 60,
        }
    }
}

impl GeminiConfig {
    /// Load configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let api_key = provider.get_string("google_api_key").map_err(|_| {
            ServiceError::configuration(
                "GOOGLE_API_KEY is not set; add it to the environment or a .env file",
            )
        })?;
        let base_url = provider.get_string_or("gemini_base_url", DEFAULT_GEMINI_BASE_URL);
        let preferred_models = provider.get_list_or("gemini_models", DEFAULT_PREFERRED_MODELS);
        let fallback_model = provider.get_string_or("gemini_fallback_model", DEFAULT_FALLBACK_MODEL);
        let timeout_seconds = provider.get_parsed_or("gemini_timeout_seconds", 60u64)?;

        let config = Self {
            api_key: api_key.trim().to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            preferred_models,
            fallback_model: fallback_model.trim().to_string(),
            timeout_seconds,
        };

        config.validate()?;
        Ok(config)
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ServiceConfig for GeminiConfig {
    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ServiceError::configuration("Gemini API key is required"));
        }

        url::Url::parse(&self.base_url).map_err(|e| {
            ServiceError::configuration(format!("Invalid Gemini base URL {}: {}", self.base_url, e))
        })?;

        if self.timeout_seconds == 0 {
            return Err(ServiceError::configuration(
                "Gemini timeout must be at least one second",
            ));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "gemini"
    }
}

/// Load a retry policy from `{prefix}_max_retries`, `{prefix}_base_delay_ms`,
/// `{prefix}_max_delay_ms`, `{prefix}_backoff_multiplier` and
/// `{prefix}_jitter_factor`
pub fn load_retry_config<P: ConfigProvider + ?Sized>(provider: &P, prefix: &str) -> Result<RetryConfig> {
    let defaults = RetryConfig::default();
    let key = |name: &str| format!("{}_{}", prefix, name);

    let config = RetryConfig {
        max_retries: provider.get_parsed_or(&key("max_retries"), defaults.max_retries)?,
        initial_interval: Duration::from_millis(provider.get_parsed_or(
            &key("base_delay_ms"),
            defaults.initial_interval.as_millis() as u64,
        )?),
        max_interval: Duration::from_millis(provider.get_parsed_or(
            &key("max_delay_ms"),
            defaults.max_interval.as_millis() as u64,
        )?),
        multiplier: provider.get_parsed_or(&key("backoff_multiplier"), defaults.multiplier)?,
        jitter_factor: provider.get_parsed_or(&key("jitter_factor"), defaults.jitter_factor)?,
    };

    config.validate()?;
    Ok(config)
}
