//! # GenAI SDK
//!
//! A small SDK for talking to hosted generative-AI services, used by the
//! feedback analyzer.
//!
//! This crate provides:
//!
//! - The `GenerativeBackend` seam and model selection
//! - A typed Gemini REST client
//! - Comprehensive error handling system
//! - Retry with exponential backoff as an explicit state machine
//! - Configuration management utilities
//!
//! ## Architecture
//!
//! - `GenerativeBackend`: one request per call, no retries
//! - `RetryExecutor`: retries a call according to a `RetryConfig`, sleeping
//!   through an injectable `Sleeper`
//! - `ServiceError`: normalized errors with retryable/fatal classification
//! - `ConfigProvider`: environment, in-memory and composite configuration

// Re-export core modules
pub mod core;
pub use core::{select_model, ClientBuilder, GenerativeBackend, ModelDescriptor, ModelSelection};

// Re-export service-specific modules
pub mod services;
pub use services::gemini;

// Re-export error handling
pub mod error;
pub use error::{ErrorContext, Result, ServiceError};

// Re-export resilience patterns
pub mod resilience;
pub use resilience::{
    AttemptOutcome, AttemptRecord, RecordingSleeper, RetryConfig, RetryExecutor, RetryReport,
    Sleeper, TokioSleeper,
};

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, ConfigProviderExt, GeminiConfig, ServiceConfig};

// Utility module for common functionality
pub mod util;

#[cfg(test)]
mod tests;
