//! Domain types: feedback records, analysis runs and run issues

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalyzerError;

/// Sentiment label of a feedback record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    /// Not classified, or classification failed
    Unknown,
}

impl Sentiment {
    /// Every label, in report order
    pub const ALL: [Sentiment; 4] = [
        Sentiment::Positive,
        Sentiment::Negative,
        Sentiment::Neutral,
        Sentiment::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
            Sentiment::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "unknown" => Ok(Sentiment::Unknown),
            other => Err(AnalyzerError::validation(format!(
                "unknown sentiment label: {}",
                other
            ))),
        }
    }
}

/// Processing state of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordOutcome {
    Pending,
    Classified,
    Failed { category: String, message: String },
}

impl RecordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Pending => "pending",
            RecordOutcome::Classified => "classified",
            RecordOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, RecordOutcome::Pending)
    }
}

/// One piece of customer feedback
///
/// Sentiment, topics and outcome are written once by the analyzer and are
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    id: usize,
    raw_text: String,
    cleaned_text: String,
    sentiment: Sentiment,
    topics: Vec<String>,
    outcome: RecordOutcome,
}

impl FeedbackRecord {
    /// A pending record; `id` is the 1-based position in the source
    pub fn new(id: usize, raw_text: impl Into<String>, cleaned_text: impl Into<String>) -> Self {
        Self {
            id,
            raw_text: raw_text.into(),
            cleaned_text: cleaned_text.into(),
            sentiment: Sentiment::Unknown,
            topics: Vec::new(),
            outcome: RecordOutcome::Pending,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn cleaned_text(&self) -> &str {
        &self.cleaned_text
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn outcome(&self) -> &RecordOutcome {
        &self.outcome
    }

    pub(crate) fn mark_classified(&mut self, sentiment: Sentiment, topics: Vec<String>) -> bool {
        if self.outcome.is_settled() {
            log::warn!("record {} already settled, ignoring classification", self.id);
            return false;
        }
        self.sentiment = sentiment;
        self.topics = topics;
        self.outcome = RecordOutcome::Classified;
        true
    }

    pub(crate) fn mark_failed(&mut self, category: impl Into<String>, message: impl Into<String>) -> bool {
        if self.outcome.is_settled() {
            log::warn!("record {} already settled, ignoring failure", self.id);
            return false;
        }
        self.sentiment = Sentiment::Unknown;
        self.topics.clear();
        self.outcome = RecordOutcome::Failed {
            category: category.into(),
            message: message.into(),
        };
        true
    }
}

/// An input entry that did not become a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// 1-based position in the source
    pub index: usize,
    pub raw_text: String,
    pub reason: String,
}

/// Where a run issue applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueScope {
    Record(usize),
    Summary,
    Run,
}

impl fmt::Display for IssueScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueScope::Record(id) => write!(f, "record #{}", id),
            IssueScope::Summary => f.write_str("summary"),
            IssueScope::Run => f.write_str("run"),
        }
    }
}

/// A warning or failure raised during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIssue {
    pub scope: IssueScope,
    pub category: String,
    pub message: String,
}

impl fmt::Display for RunIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.scope, self.category, self.message)
    }
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every record classified and a summary produced
    Completed,
    /// Settled, but with failed records or a missing summary
    Degraded,
    /// Stopped early by a fatal error
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Degraded => f.write_str("degraded"),
            RunStatus::Aborted => f.write_str("aborted"),
        }
    }
}

/// Result of one pass over an uploaded batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub records: Vec<FeedbackRecord>,
    pub summary_text: String,
    pub generated_at: DateTime<Utc>,
    pub status: RunStatus,
    pub issues: Vec<RunIssue>,
    pub model: Option<String>,
}

impl AnalysisRun {
    /// Every record is classified or failed
    pub fn is_settled(&self) -> bool {
        self.records.iter().all(|r| r.outcome().is_settled())
    }

    pub fn has_summary(&self) -> bool {
        !self.summary_text.trim().is_empty()
    }

    pub fn failed_records(&self) -> impl Iterator<Item = &FeedbackRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome(), RecordOutcome::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_parsing() {
        assert_eq!(" positive ".parse::<Sentiment>().unwrap(), Sentiment::Positive);
        assert_eq!("NEGATIVE".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert!("mixed".parse::<Sentiment>().is_err());
    }

    #[test]
    fn test_record_is_written_once() {
        let mut record = FeedbackRecord::new(1, "Great!", "great");
        assert_eq!(record.sentiment(), Sentiment::Unknown);
        assert_eq!(record.outcome(), &RecordOutcome::Pending);

        assert!(record.mark_classified(Sentiment::Positive, vec!["support".into()]));
        assert!(!record.mark_failed("timeout", "late"));
        assert!(!record.mark_classified(Sentiment::Negative, vec![]));

        assert_eq!(record.sentiment(), Sentiment::Positive);
        assert_eq!(record.topics(), ["support".to_string()]);
        assert_eq!(record.outcome(), &RecordOutcome::Classified);
    }

    #[test]
    fn test_failed_record_stays_unknown() {
        let mut record = FeedbackRecord::new(4, "x", "x");
        assert!(record.mark_failed("malformed_response", "garbage"));
        assert_eq!(record.sentiment(), Sentiment::Unknown);
        assert_eq!(record.outcome().label(), "failed");
    }
}
