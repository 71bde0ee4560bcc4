//! Ingestion of uploaded feedback files
//!
//! Supported formats:
//! - CSV with a header row, preferably naming the text column
//! - JSON array of strings or of objects with a text field
//! - Plain text, one entry per line
//!
//! Every accepted entry is cleaned; entries that cannot be used are returned
//! as [`RejectedRecord`]s instead of failing the whole batch.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{AnalyzerError, Result};
use crate::preprocess::TextPreprocessor;
use crate::types::{FeedbackRecord, RejectedRecord};

/// Header names recognized as the feedback text column
const CSV_TEXT_COLUMNS: &[&str] = &["feedback_text", "feedback", "text", "review", "comment"];

/// Object fields recognized as the feedback text in JSON input
const JSON_TEXT_FIELDS: &[&str] = &["feedback", "feedback_text", "text"];

/// Format of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
    Txt,
}

impl InputFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl FromStr for InputFormat {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "json" => Ok(InputFormat::Json),
            "txt" | "text" => Ok(InputFormat::Txt),
            other => Err(AnalyzerError::validation(format!(
                "unsupported file type: {} (expected csv, json or txt)",
                other
            ))),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Csv => f.write_str("csv"),
            InputFormat::Json => f.write_str("json"),
            InputFormat::Txt => f.write_str("txt"),
        }
    }
}

/// Records ready for analysis plus the entries that were turned away
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub records: Vec<FeedbackRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// A raw entry before cleaning; `None` text means the entry had no usable text
struct RawEntry {
    index: usize,
    text: Option<String>,
    reason: &'static str,
}

impl RawEntry {
    fn text(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: Some(text.into()),
            reason: "",
        }
    }

    fn unusable(index: usize, reason: &'static str) -> Self {
        Self {
            index,
            text: None,
            reason,
        }
    }
}

/// Read and ingest a file, detecting its format from the extension unless given
pub fn ingest_file(
    path: &Path,
    format: Option<InputFormat>,
    preprocessor: &TextPreprocessor,
) -> Result<IngestOutcome> {
    let format = match format.or_else(|| InputFormat::from_path(path)) {
        Some(format) => format,
        None => {
            return Err(AnalyzerError::validation(format!(
                "cannot infer file type of {}; pass --format",
                path.display()
            )))
        }
    };

    let content = fs::read_to_string(path)?;
    log::info!("Ingesting {} as {}", path.display(), format);
    ingest_str(&content, format, preprocessor)
}

/// Ingest in-memory content of the given format
pub fn ingest_str(
    content: &str,
    format: InputFormat,
    preprocessor: &TextPreprocessor,
) -> Result<IngestOutcome> {
    let entries = match format {
        InputFormat::Csv => parse_csv(content)?,
        InputFormat::Json => parse_json(content)?,
        InputFormat::Txt => parse_txt(content),
    };
    build_records(entries, preprocessor)
}

/// Build records from a list of raw texts; position `i` gets id `i + 1`
pub fn records_from_texts<S: AsRef<str>>(
    texts: &[S],
    preprocessor: &TextPreprocessor,
) -> Result<IngestOutcome> {
    let entries = texts
        .iter()
        .enumerate()
        .map(|(i, text)| RawEntry::text(i + 1, text.as_ref()))
        .collect();
    build_records(entries, preprocessor)
}

fn build_records(entries: Vec<RawEntry>, preprocessor: &TextPreprocessor) -> Result<IngestOutcome> {
    let mut outcome = IngestOutcome::default();

    for entry in entries {
        let raw = match entry.text {
            Some(raw) => raw,
            None => {
                outcome.rejected.push(RejectedRecord {
                    index: entry.index,
                    raw_text: String::new(),
                    reason: entry.reason.to_string(),
                });
                continue;
            }
        };

        match preprocessor.clean(&raw) {
            Ok(cleaned) => outcome
                .records
                .push(FeedbackRecord::new(entry.index, raw, cleaned)),
            Err(err) => {
                log::debug!("Rejected entry {}: {}", entry.index, err);
                outcome.rejected.push(RejectedRecord {
                    index: entry.index,
                    raw_text: raw,
                    reason: err.to_string(),
                });
            }
        }
    }

    if outcome.records.is_empty() {
        return Err(AnalyzerError::validation(
            "no valid feedback text found after cleaning",
        ));
    }

    log::info!(
        "Ingested {} records ({} rejected)",
        outcome.records.len(),
        outcome.rejected.len()
    );
    Ok(outcome)
}

fn parse_csv(content: &str) -> Result<Vec<RawEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let rows = reader
        .records()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()
        .map_err(|e| AnalyzerError::validation(format!("invalid CSV file: {}", e)))?;

    let (header, data_rows) = match rows.split_first() {
        Some(split) => split,
        None => return Ok(Vec::new()),
    };

    let column = match header
        .iter()
        .position(|cell| CSV_TEXT_COLUMNS.contains(&cell.to_lowercase().as_str()))
    {
        Some(column) => column,
        None => {
            log::warn!(
                "CSV header {:?} names no feedback column ({}); using the first column",
                header.iter().collect::<Vec<_>>(),
                CSV_TEXT_COLUMNS.join(", ")
            );
            0
        }
    };

    Ok(data_rows
        .iter()
        .enumerate()
        .map(|(i, row)| match row.get(column) {
            Some(cell) if !cell.is_empty() => RawEntry::text(i + 1, cell),
            _ => RawEntry::unusable(i + 1, "missing feedback text"),
        })
        .collect())
}

fn parse_json(content: &str) -> Result<Vec<RawEntry>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| AnalyzerError::validation(format!("invalid JSON file: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        _ => {
            return Err(AnalyzerError::validation(
                "JSON file must be a list of strings or of objects with a 'feedback' field",
            ))
        }
    };

    Ok(items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(text) => RawEntry::text(i + 1, text.as_str()),
            Value::Object(fields) => JSON_TEXT_FIELDS
                .iter()
                .find_map(|field| fields.get(*field).and_then(Value::as_str))
                .map(|text| RawEntry::text(i + 1, text))
                .unwrap_or_else(|| RawEntry::unusable(i + 1, "object has no feedback text field")),
            _ => RawEntry::unusable(i + 1, "unsupported entry shape"),
        })
        .collect())
}

fn parse_txt(content: &str) -> Vec<RawEntry> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| RawEntry::text(i + 1, line.trim()))
        .collect()
}
