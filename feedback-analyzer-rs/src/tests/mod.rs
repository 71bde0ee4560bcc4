//! Pipeline tests
//!
//! `support` provides a scripted in-memory backend; the other modules drive
//! the analyzer, chat and export against it, and against a mocked Gemini API.

mod support;

mod chat_tests;
