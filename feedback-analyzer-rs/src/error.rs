//! Error types for the feedback analyzer

use genai_sdk::ServiceError;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors raised by the feedback pipeline
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Input that cannot be analyzed (empty text, empty batch, empty question)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by the generative service or its client
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    pub fn validation(message: impl Into<String>) -> Self {
        AnalyzerError::Validation(message.into())
    }

    /// Stable category label, shared with the service taxonomy
    pub fn category(&self) -> &'static str {
        match self {
            AnalyzerError::Validation(_) => "validation",
            AnalyzerError::Service(err) => err.category(),
            AnalyzerError::Csv(_) => "csv",
            AnalyzerError::Json(_) => "json",
            AnalyzerError::Io(_) => "io",
        }
    }

    /// Whether the error ends an analysis run
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalyzerError::Service(err) if err.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(AnalyzerError::validation("empty").category(), "validation");

        let quota: AnalyzerError = ServiceError::quota_exceeded("429").into();
        assert_eq!(quota.category(), "quota_exceeded");
        assert!(!quota.is_fatal());

        let auth: AnalyzerError = ServiceError::authentication("bad key").into();
        assert!(auth.is_fatal());
        assert_eq!(auth.to_string(), "Authentication error: bad key");
    }
}
