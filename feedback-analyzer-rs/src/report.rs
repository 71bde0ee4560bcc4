//! Aggregation and export of a finished run
//!
//! Everything here is a pure function of the run.

use std::collections::HashMap;
use std::fmt;

use crate::error::{AnalyzerError, Result};
use crate::types::{AnalysisRun, FeedbackRecord, Sentiment};

pub const SUMMARY_FILE_NAME: &str = "ai_summary.md";
pub const TABLE_FILE_NAME: &str = "analyzed_feedback_data.csv";

const TABLE_HEADER: [&str; 5] = ["id", "feedback_text_cleaned", "sentiment", "topics", "status"];
const TOPIC_SEPARATOR: &str = ", ";
const RULE: &str = "---------------------------------------------";
const MISSING_SUMMARY: &str = "No AI summary was generated for this run.";

/// Record counts per sentiment label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub unknown: usize,
}

impl SentimentDistribution {
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let mut distribution = Self::default();
        for record in records {
            *distribution.slot(record.sentiment()) += 1;
        }
        distribution
    }

    fn slot(&mut self, sentiment: Sentiment) -> &mut usize {
        match sentiment {
            Sentiment::Positive => &mut self.positive,
            Sentiment::Negative => &mut self.negative,
            Sentiment::Neutral => &mut self.neutral,
            Sentiment::Unknown => &mut self.unknown,
        }
    }

    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral + self.unknown
    }

    /// Counts in report order
    pub fn entries(&self) -> [(Sentiment, usize); 4] {
        Sentiment::ALL.map(|sentiment| (sentiment, self.get(sentiment)))
    }
}

impl fmt::Display for SentimentDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (sentiment, count) in self.entries() {
            writeln!(f, "- {}: {}", sentiment, count)?;
        }
        Ok(())
    }
}

pub fn sentiment_distribution(run: &AnalysisRun) -> SentimentDistribution {
    SentimentDistribution::from_records(&run.records)
}

/// Every topic of every record, in record order
pub fn flatten_topics(records: &[FeedbackRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|record| record.topics().iter().cloned())
        .collect()
}

/// Most frequent topics, case-insensitive, ties broken alphabetically
pub fn top_topics(records: &[FeedbackRecord], n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for topic in flatten_topics(records) {
        *counts.entry(topic.to_lowercase()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Files written to the export archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    pub summary_markdown: String,
    pub table_csv: String,
}

pub fn build_export_bundle(run: &AnalysisRun) -> Result<ExportBundle> {
    Ok(ExportBundle {
        summary_markdown: render_summary_markdown(run),
        table_csv: render_table_csv(&run.records)?,
    })
}

pub fn render_summary_markdown(run: &AnalysisRun) -> String {
    let summary = if run.has_summary() {
        run.summary_text.trim()
    } else {
        MISSING_SUMMARY
    };

    let mut doc = String::new();
    doc.push_str("AI Customer Feedback Analysis Report Summary\n");
    doc.push_str(RULE);
    doc.push_str("\n\n");
    doc.push_str(&format!("Total Feedbacks Analyzed: {}\n", run.records.len()));
    doc.push_str(&format!(
        "Generated At: {}\n",
        run.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    doc.push_str(&format!("Run Status: {}\n\n", run.status));
    doc.push_str("Sentiment Distribution:\n");
    doc.push_str(&sentiment_distribution(run).to_string());
    doc.push('\n');
    doc.push_str(summary);
    doc.push_str("\n\n");
    doc.push_str(RULE);
    doc.push_str("\nGenerated by AI Customer Feedback Analyzer\n");
    doc
}

pub fn render_table_csv(records: &[FeedbackRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TABLE_HEADER)?;

    for record in records {
        writer.write_record([
            record.id().to_string().as_str(),
            record.cleaned_text(),
            record.sentiment().as_str(),
            record.topics().join(TOPIC_SEPARATOR).as_str(),
            record.outcome().label(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AnalyzerError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| AnalyzerError::validation(format!("table is not UTF-8: {}", e)))
}

/// One row of the exported table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub id: usize,
    pub feedback_text_cleaned: String,
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    pub status: String,
}

/// Parse a table written by [`render_table_csv`]
pub fn parse_table_csv(content: &str) -> Result<Vec<TableRow>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().ne(TABLE_HEADER.iter().copied()) {
        return Err(AnalyzerError::validation(format!(
            "unexpected table header: {:?}",
            headers
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = record[0]
            .parse::<usize>()
            .map_err(|e| AnalyzerError::validation(format!("invalid id {:?}: {}", &record[0], e)))?;
        let topics = if record[3].is_empty() {
            Vec::new()
        } else {
            record[3]
                .split(TOPIC_SEPARATOR)
                .map(str::to_string)
                .collect()
        };

        rows.push(TableRow {
            id,
            feedback_text_cleaned: record[1].to_string(),
            sentiment: record[2].parse()?,
            topics,
            status: record[4].to_string(),
        });
    }
    Ok(rows)
}
