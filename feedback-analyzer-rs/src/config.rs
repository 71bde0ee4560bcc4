//! Analyzer configuration
//!
//! Values come from a [`ConfigProvider`]; the binary layers CLI overrides on
//! top of the process environment (after `dotenv` has loaded `.env`).

use genai_sdk::config::{
    load_retry_config, CompositeConfigProvider, EnvConfigProvider, MemoryConfigProvider,
};
use genai_sdk::{ConfigProvider, ConfigProviderExt, GeminiConfig, RetryConfig};

use crate::error::Result;

pub const DEFAULT_SUMMARY_SAMPLE_LIMIT: usize = 100;
pub const DEFAULT_CHAT_CONTEXT_LIMIT: usize = 50;

/// Key prefix of the retry settings (`FEEDBACK_MAX_RETRIES`, ...)
const RETRY_PREFIX: &str = "feedback";

/// Complete configuration of an analysis session
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub gemini: GeminiConfig,
    pub retry: RetryConfig,
    pub lemmatize: bool,
    /// Records included in the summary prompt
    pub summary_sample_limit: usize,
    /// Records included in the chat context
    pub chat_context_limit: usize,
}

impl AnalyzerConfig {
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let gemini = GeminiConfig::from_provider(provider)?;
        let retry = load_retry_config(provider, RETRY_PREFIX)?;

        let config = Self {
            gemini,
            retry,
            lemmatize: provider.get_bool_or("feedback_lemmatize", false)?,
            summary_sample_limit: provider
                .get_parsed_or("feedback_summary_sample_limit", DEFAULT_SUMMARY_SAMPLE_LIMIT)?,
            chat_context_limit: provider
                .get_parsed_or("feedback_chat_context_limit", DEFAULT_CHAT_CONTEXT_LIMIT)?,
        };

        log::debug!("Loaded analyzer configuration: {:?}", config);
        Ok(config)
    }

    /// Load from the environment, with `overrides` taking precedence
    pub fn load(overrides: MemoryConfigProvider) -> Result<Self> {
        let providers: Vec<Box<dyn ConfigProvider>> =
            vec![Box::new(overrides), Box::new(EnvConfigProvider::new())];
        Self::from_provider(&CompositeConfigProvider::with_providers(providers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzerError;
    use std::time::Duration;

    fn provider(pairs: &[(&str, &str)]) -> MemoryConfigProvider {
        let mut provider = MemoryConfigProvider::new();
        for (key, value) in pairs {
            provider.set(*key, *value);
        }
        provider
    }

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::from_provider(&provider(&[("google_api_key", "k")])).unwrap();
        assert_eq!(config.retry, RetryConfig::default());
        assert!(!config.lemmatize);
        assert_eq!(config.summary_sample_limit, 100);
        assert_eq!(config.chat_context_limit, 50);
        assert_eq!(config.gemini.preferred_models, ["gemini-1.5-flash", "gemini-1.0-pro"]);
    }

    #[test]
    fn test_overrides() {
        let config = AnalyzerConfig::from_provider(&provider(&[
            ("google_api_key", "k"),
            ("feedback_max_retries", "3"),
            ("feedback_base_delay_ms", "250"),
            ("feedback_lemmatize", "1"),
            ("feedback_chat_context_limit", "10"),
        ]))
        .unwrap();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_interval, Duration::from_millis(250));
        assert!(config.lemmatize);
        assert_eq!(config.chat_context_limit, 10);
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let err = AnalyzerConfig::from_provider(&provider(&[])).unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_value() {
        let err = AnalyzerConfig::from_provider(&provider(&[
            ("google_api_key", "k"),
            ("feedback_lemmatize", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Service(_)));
    }
}
