//! # Feedback Analyzer
//!
//! Sentiment and topic analysis of customer feedback through a generative
//! model, with aggregated reports and question answering.
//!
//! Pipeline:
//!
//! - `ingest` / `preprocess`: uploaded file to cleaned [`FeedbackRecord`]s
//! - `client`: the [`InsightClient`], the only component that calls the model
//! - `analyzer`: one sequential [`AnalysisRun`] over the records
//! - `report` / `archive`: distribution, topics and the `.tar.gz` export
//! - `chat`: questions answered from the run

pub mod analyzer;
pub mod archive;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod preprocess;
pub mod prompts;
pub mod report;
pub mod types;

#[cfg(test)]
mod tests;

pub use analyzer::{analyze_file, Analyzer, FileAnalysis};
pub use chat::{ChatSession, ChatTurn, Speaker};
pub use client::{Classification, InsightClient};
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use ingest::{IngestOutcome, InputFormat};
pub use preprocess::TextPreprocessor;
pub use report::{ExportBundle, SentimentDistribution};
pub use types::{
    AnalysisRun, FeedbackRecord, IssueScope, RecordOutcome, RejectedRecord, RunIssue, RunStatus,
    Sentiment,
};
