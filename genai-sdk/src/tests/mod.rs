//! Unit tests for the GenAI SDK
//!
//! This module contains tests for various components of the SDK.

pub mod error_tests;
pub mod gemini_mock_tests;
