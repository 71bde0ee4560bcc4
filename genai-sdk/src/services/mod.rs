//! Service-specific client implementations
//!
//! This module contains client implementations for specific external services.

pub mod gemini;
mod common;

pub use common::UserAgent;
