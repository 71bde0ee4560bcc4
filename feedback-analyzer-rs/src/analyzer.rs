//! Orchestration of one analysis run
//!
//! Records are classified one at a time, in input order. A failure on one
//! record degrades only that record; a fatal error stops the run and leaves
//! the remaining records pending. The summary is requested once, after every
//! record has settled.

use std::path::Path;

use chrono::Utc;
use genai_sdk::{GenerativeBackend, RetryExecutor};

use crate::client::InsightClient;
use crate::config::{AnalyzerConfig, DEFAULT_SUMMARY_SAMPLE_LIMIT};
use crate::error::{AnalyzerError, Result};
use crate::ingest::{ingest_file, InputFormat};
use crate::preprocess::TextPreprocessor;
use crate::types::{AnalysisRun, FeedbackRecord, IssueScope, RejectedRecord, RunIssue, RunStatus};

pub struct Analyzer<'a, B: GenerativeBackend> {
    client: &'a InsightClient<B>,
    summary_sample_limit: usize,
}

impl<'a, B: GenerativeBackend> Analyzer<'a, B> {
    pub fn new(client: &'a InsightClient<B>) -> Self {
        Self {
            client,
            summary_sample_limit: DEFAULT_SUMMARY_SAMPLE_LIMIT,
        }
    }

    pub fn with_summary_sample_limit(mut self, limit: usize) -> Self {
        self.summary_sample_limit = limit;
        self
    }

    /// Analyze a batch of records
    ///
    /// Only an empty batch is an error; service failures are reported as
    /// issues on the returned run.
    pub async fn run(&self, mut records: Vec<FeedbackRecord>) -> Result<AnalysisRun> {
        if records.is_empty() {
            return Err(AnalyzerError::validation("no feedback records to analyze"));
        }

        let total = records.len();
        let mut issues = Vec::new();

        let model = match self.client.model() {
            Some(model) => model.to_string(),
            None => {
                log::error!("Aborting run of {} records: no model selected", total);
                issues.push(RunIssue {
                    scope: IssueScope::Run,
                    category: "model_unavailable".to_string(),
                    message: format!("no generative model available ({})", self.client.selection()),
                });
                return Ok(finish(records, String::new(), RunStatus::Aborted, issues, None));
            }
        };

        log::info!("Analyzing {} records with {}", total, model);

        let mut aborted = false;
        for (position, record) in records.iter_mut().enumerate() {
            let id = record.id();
            match self
                .client
                .classify_sentiment_and_topics(record.cleaned_text())
                .await
            {
                Ok(classification) => {
                    log::info!(
                        "Record {}/{} (#{}): {} {:?}",
                        position + 1,
                        total,
                        id,
                        classification.sentiment,
                        classification.topics
                    );
                    record.mark_classified(classification.sentiment, classification.topics);
                }
                Err(err) if err.is_fatal() => {
                    log::error!("Aborting run at record #{}: {}", id, err);
                    record.mark_failed(err.category(), err.to_string());
                    issues.push(RunIssue {
                        scope: IssueScope::Run,
                        category: err.category().to_string(),
                        message: format!("run aborted at record #{}: {}", id, err),
                    });
                    aborted = true;
                    break;
                }
                Err(err) => {
                    log::warn!("Record #{} could not be classified: {}", id, err);
                    record.mark_failed(err.category(), err.to_string());
                    issues.push(RunIssue {
                        scope: IssueScope::Record(id),
                        category: err.category().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if aborted {
            return Ok(finish(records, String::new(), RunStatus::Aborted, issues, Some(model)));
        }

        let summary_text = match self
            .client
            .summarize(&records, self.summary_sample_limit)
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                log::warn!("Summary generation failed: {}", err);
                issues.push(RunIssue {
                    scope: IssueScope::Summary,
                    category: err.category().to_string(),
                    message: err.to_string(),
                });
                String::new()
            }
        };

        let status = if issues.is_empty() && !summary_text.trim().is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Degraded
        };

        Ok(finish(records, summary_text, status, issues, Some(model)))
    }
}

/// Result of analyzing one uploaded file
pub struct FileAnalysis<B: GenerativeBackend> {
    /// Entries turned away at ingestion
    pub rejected: Vec<RejectedRecord>,
    /// Client with the selected model, reused for questions
    pub client: InsightClient<B>,
    pub run: AnalysisRun,
}

/// Ingest `path`, then select a model and analyze the records
///
/// An unusable upload fails before any call reaches the service.
pub async fn analyze_file<B: GenerativeBackend>(
    path: &Path,
    format: Option<InputFormat>,
    config: &AnalyzerConfig,
    backend: B,
    retry: RetryExecutor,
) -> Result<FileAnalysis<B>> {
    let preprocessor = TextPreprocessor::new(config.lemmatize);
    let outcome = ingest_file(path, format, &preprocessor)?;

    let client = InsightClient::connect(
        backend,
        retry,
        &config.gemini.preferred_models,
        &config.gemini.fallback_model,
    )
    .await;

    let run = Analyzer::new(&client)
        .with_summary_sample_limit(config.summary_sample_limit)
        .run(outcome.records)
        .await?;

    Ok(FileAnalysis {
        rejected: outcome.rejected,
        client,
        run,
    })
}

fn finish(
    records: Vec<FeedbackRecord>,
    summary_text: String,
    status: RunStatus,
    issues: Vec<RunIssue>,
    model: Option<String>,
) -> AnalysisRun {
    let run = AnalysisRun {
        records,
        summary_text,
        generated_at: Utc::now(),
        status,
        issues,
        model,
    };
    log::info!(
        "Run {}: {} records, {} failed, {} issues",
        run.status,
        run.records.len(),
        run.failed_records().count(),
        run.issues.len()
    );
    run
}
