// Prompt templates sent to the generative model

use crate::types::{FeedbackRecord, RecordOutcome};

/// Reply the model gives when it finds nothing to extract
pub const NO_TOPICS: &str = "no topics";

pub const MIN_TOPICS: usize = 2;
pub const MAX_TOPICS: usize = 5;

pub fn classification_prompt(cleaned_text: &str) -> String {
    format!(
        "Analyze the following customer feedback: '{text}'.\n\
         Classify its sentiment as exactly one of Positive, Negative or Neutral, \
         and extract {min} to {max} main topics or keywords \
         (for example: delivery, speed, tracking, app issues). \
         Topics must not contain commas.\n\
         Respond with only a JSON object of the form \
         {{\"sentiment\": \"Positive\", \"topics\": [\"delivery\", \"speed\"]}}. \
         If no topics are found, use \"topics\": \"{none}\".",
        text = cleaned_text,
        min = MIN_TOPICS,
        max = MAX_TOPICS,
        none = NO_TOPICS,
    )
}

/// One line per record: `- [Sentiment] text (topics: a, b)`
pub fn summary_entry(record: &FeedbackRecord) -> String {
    let mut line = format!("- [{}] {}", record.sentiment(), record.cleaned_text());
    if !record.topics().is_empty() {
        line.push_str(&format!(" (topics: {})", record.topics().join(", ")));
    }
    if let RecordOutcome::Failed { .. } = record.outcome() {
        line.push_str(" (not classified)");
    }
    line
}

pub fn summary_prompt(records: &[FeedbackRecord]) -> String {
    let entries = records
        .iter()
        .map(summary_entry)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an AI assistant specialized in analyzing customer feedback.
Generate a comprehensive summary of the following customer feedback entries.
Provide the summary in the following structured Markdown format:

## Overall Feedback Summary

### 1. General Sentiment Distribution
- Briefly describe the overall sentiment (e.g., predominantly positive, mixed, largely negative).

### 2. Key Positive Themes and Highlights
- Identify and summarize recurring positive aspects.
- Provide 1-2 example quotes or themes if possible.

### 3. Key Negative Issues and Areas for Improvement
- Identify and summarize recurring negative issues or complaints.
- Provide 1-2 example quotes or themes if possible.

### 4. Actionable Suggestions and Recommendations
- Based on the feedback, provide 2-3 concrete, actionable suggestions for the business to improve.

### Customer Feedback Entries:
{}
",
        entries
    )
}

pub fn chat_prompt(question: &str, context: &[&str], summary: &str) -> String {
    let summary = if summary.trim().is_empty() {
        "No summary available."
    } else {
        summary
    };

    format!(
        "You are an AI assistant analyzing customer feedback. \
         Based on the following feedback snippets and the overall AI summary:\n\n\
         Feedback Snippets:\n{}\n\n\
         Overall AI Summary:\n{}\n\n\
         User's Question: {}\n\n\
         Please provide a concise and helpful answer.",
        context.join("\n"),
        summary,
        question
    )
}
