//! Core abstractions for the GenAI SDK
//!
//! - `GenerativeBackend`: the transport-level seam every model provider implements
//! - `ModelDescriptor` / `select_model`: model discovery and selection
//! - `ClientBuilder`: builder for the HTTP client and retry executor

pub mod builder;
pub use builder::ClientBuilder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Generation method a model must support to be selectable
pub const GENERATE_CONTENT: &str = "generateContent";

/// A generative model provider
///
/// Implementations perform exactly one request per call; retries are layered
/// on top by [`crate::resilience::RetryExecutor`].
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// The backend name/identifier
    fn name(&self) -> &str;

    /// List the models offered by the service
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>>;

    /// Send a single prompt to `model` and return the generated text
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;
}

/// A model offered by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model id without the `models/` resource prefix
    pub id: String,

    pub display_name: Option<String>,

    /// Methods the model accepts (e.g. `generateContent`)
    pub supported_methods: Vec<String>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, supported_methods: &[&str]) -> Self {
        Self {
            id: strip_model_prefix(&id.into()).to_string(),
            display_name: None,
            supported_methods: supported_methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Whether the model can be used for text generation
    pub fn supports_generation(&self) -> bool {
        self.supported_methods.iter().any(|m| m == GENERATE_CONTENT)
    }
}

/// Remove the `models/` resource prefix, if present
pub fn strip_model_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

/// Outcome of model selection, decided once per client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelection {
    Selected(String),
    Unavailable(String),
}

impl ModelSelection {
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Selected(model) => Some(model),
            Self::Unavailable(_) => None,
        }
    }
}

impl fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selected(model) => write!(f, "{}", model),
            Self::Unavailable(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

/// Pick the first preferred model that supports generation, then the fallback
pub fn select_model(
    available: &[ModelDescriptor],
    preferred: &[String],
    fallback: &str,
) -> Option<String> {
    let usable: Vec<&str> = available
        .iter()
        .filter(|m| m.supports_generation())
        .map(|m| m.id.as_str())
        .collect();

    preferred
        .iter()
        .map(|p| strip_model_prefix(p))
        .chain(std::iter::once(strip_model_prefix(fallback)))
        .find(|candidate| !candidate.is_empty() && usable.contains(candidate))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> Vec<String> {
        vec!["gemini-1.5-flash".to_string(), "gemini-1.0-pro".to_string()]
    }

    #[test]
    fn test_prefers_first_available() {
        let models = vec![
            ModelDescriptor::new("models/gemini-1.0-pro", &[GENERATE_CONTENT]),
            ModelDescriptor::new("models/gemini-1.5-flash", &[GENERATE_CONTENT, "countTokens"]),
        ];
        assert_eq!(
            select_model(&models, &prefs(), "gemini-1.0-pro").as_deref(),
            Some("gemini-1.5-flash")
        );
    }

    #[test]
    fn test_skips_models_without_generation() {
        let models = vec![
            ModelDescriptor::new("models/gemini-1.5-flash", &["embedContent"]),
            ModelDescriptor::new("models/gemini-1.0-pro", &[GENERATE_CONTENT]),
        ];
        assert_eq!(
            select_model(&models, &prefs(), "gemini-1.0-pro").as_deref(),
            Some("gemini-1.0-pro")
        );
    }

    #[test]
    fn test_fallback_and_none() {
        let models = vec![ModelDescriptor::new("gemini-pro", &[GENERATE_CONTENT])];
        assert_eq!(
            select_model(&models, &prefs(), "models/gemini-pro").as_deref(),
            Some("gemini-pro")
        );
        assert_eq!(select_model(&models, &prefs(), "gemini-1.0-pro"), None);
        assert_eq!(select_model(&[], &prefs(), "gemini-1.0-pro"), None);
    }
}
