//! Insight client: the single choke point for calls to the generative model
//!
//! Wraps a [`GenerativeBackend`] with the retry executor and the model chosen
//! once at construction. If no model could be chosen, every call fails fast
//! with `ModelUnavailable` without sending a request.

use genai_sdk::util::truncate_string;
use genai_sdk::{select_model, GenerativeBackend, ModelSelection, RetryExecutor, ServiceError};
use serde_json::Value;

use crate::error::{AnalyzerError, Result};
use crate::prompts::{self, MAX_TOPICS, NO_TOPICS};
use crate::types::{FeedbackRecord, Sentiment};

/// Sentiment and topics extracted from one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
}

pub struct InsightClient<B: GenerativeBackend> {
    backend: B,
    retry: RetryExecutor,
    selection: ModelSelection,
}

impl<B: GenerativeBackend> std::fmt::Debug for InsightClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightClient")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .field("selection", &self.selection)
            .finish()
    }
}

impl<B: GenerativeBackend> InsightClient<B> {
    /// List the service's models once and pick one
    pub async fn connect(
        backend: B,
        retry: RetryExecutor,
        preferred: &[String],
        fallback: &str,
    ) -> Self {
        let listing = retry.run("list_models", || backend.list_models()).await;

        let selection = match listing {
            Ok(models) => {
                log::debug!("{} offers {} models", backend.name(), models.len());
                match select_model(&models, preferred, fallback) {
                    Some(model) => ModelSelection::Selected(model),
                    None => ModelSelection::Unavailable(format!(
                        "none of {:?} or fallback {} supports generateContent",
                        preferred, fallback
                    )),
                }
            }
            Err(err) => ModelSelection::Unavailable(format!("model listing failed: {}", err)),
        };

        match &selection {
            ModelSelection::Selected(model) => log::info!("Selected model: {}", model),
            ModelSelection::Unavailable(reason) => {
                log::error!("No generative model available: {}", reason)
            }
        }

        Self {
            backend,
            retry,
            selection,
        }
    }

    /// Use a known model without listing
    pub fn with_model(backend: B, retry: RetryExecutor, model: impl Into<String>) -> Self {
        Self {
            backend,
            retry,
            selection: ModelSelection::Selected(model.into()),
        }
    }

    pub fn selection(&self) -> &ModelSelection {
        &self.selection
    }

    pub fn model(&self) -> Option<&str> {
        self.selection.model()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn require_model(&self) -> std::result::Result<&str, ServiceError> {
        match &self.selection {
            ModelSelection::Selected(model) => Ok(model),
            ModelSelection::Unavailable(reason) => Err(ServiceError::model_unavailable(format!(
                "no generative model available: {}",
                reason
            ))),
        }
    }

    async fn generate(&self, operation: &str, prompt: &str) -> Result<String> {
        let model = self.require_model()?;
        log::debug!("{} prompt: {}", operation, truncate_string(prompt, 200));

        let reply = self
            .retry
            .run(operation, || self.backend.generate(model, prompt))
            .await?;
        Ok(reply)
    }

    pub async fn classify_sentiment_and_topics(&self, cleaned_text: &str) -> Result<Classification> {
        let reply = self
            .generate("classify", &prompts::classification_prompt(cleaned_text))
            .await?;
        Ok(parse_classification(&reply)?)
    }

    /// Summarize the first `limit` records in one call
    pub async fn summarize(&self, records: &[FeedbackRecord], limit: usize) -> Result<String> {
        if records.is_empty() {
            return Err(AnalyzerError::validation("no feedback provided to summarize"));
        }
        let sample = &records[..records.len().min(limit.max(1))];
        if sample.len() < records.len() {
            log::info!("Summarizing the first {} of {} records", sample.len(), records.len());
        }

        let reply = self
            .generate("summarize", &prompts::summary_prompt(sample))
            .await?;
        Ok(reply.trim().to_string())
    }

    /// Answer a question; the reply is returned verbatim
    pub async fn answer_query(&self, question: &str, context: &[&str], summary: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(AnalyzerError::validation("question is empty"));
        }
        self.generate(
            "answer_query",
            &prompts::chat_prompt(question.trim(), context, summary),
        )
        .await
    }
}

/// Parse the model's classification reply
///
/// Tolerates Markdown code fences and text around the JSON object.
pub fn parse_classification(reply: &str) -> std::result::Result<Classification, ServiceError> {
    let json = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(ServiceError::malformed(format!(
                "classification reply is not a JSON object: {}",
                truncate_string(reply.trim(), 100)
            )))
        }
    };

    let value: Value = serde_json::from_str(json)
        .map_err(|e| ServiceError::malformed(format!("invalid classification JSON: {}", e)))?;

    let label = value
        .get("sentiment")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::malformed("classification reply has no sentiment"))?;
    let sentiment = match label.parse::<Sentiment>() {
        Ok(Sentiment::Unknown) | Err(_) => {
            return Err(ServiceError::malformed(format!(
                "unknown sentiment label: {}",
                label
            )))
        }
        Ok(sentiment) => sentiment,
    };

    let topics = match value.get("topics") {
        Some(Value::String(list)) => split_topics(std::iter::once(list.as_str())),
        Some(Value::Array(items)) => split_topics(items.iter().filter_map(Value::as_str)),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(ServiceError::malformed(format!(
                "unexpected topics value: {}",
                other
            )))
        }
    };

    Ok(Classification { sentiment, topics })
}

fn split_topics<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for topic in items.flat_map(|item| item.split(',')) {
        let topic = topic.trim().trim_matches(|c| c == '\'' || c == '"').trim();
        if topic.is_empty() || topic.eq_ignore_ascii_case(NO_TOPICS) {
            continue;
        }
        if !topics.iter().any(|t| t.eq_ignore_ascii_case(topic)) {
            topics.push(topic.to_string());
        }
    }
    topics.truncate(MAX_TOPICS);
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let parsed =
            parse_classification(r#"{"sentiment": "Negative", "topics": ["wait times", "support"]}"#)
                .unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Negative);
        assert_eq!(parsed.topics, ["wait times", "support"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"sentiment\": \"positive\", \"topics\": \"delivery, speed\"}\n```";
        let parsed = parse_classification(reply).unwrap();
        assert_eq!(parsed.sentiment, Sentiment::Positive);
        assert_eq!(parsed.topics, ["delivery", "speed"]);
    }

    #[test]
    fn test_no_topics() {
        let parsed =
            parse_classification(r#"{"sentiment": "Neutral", "topics": "no topics"}"#).unwrap();
        assert!(parsed.topics.is_empty());
    }

    #[test]
    fn test_topics_are_capped_and_comma_free() {
        let parsed = parse_classification(
            r#"{"sentiment": "Positive", "topics": ["a, b", "c", "C", "d", "e", "f"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.topics, ["a", "b", "c", "d", "e"]);
        assert!(parsed.topics.iter().all(|t| !t.contains(',')));
    }

    #[test]
    fn test_malformed_replies() {
        for reply in [
            "Positive",
            "{not json}",
            r#"{"topics": ["x"]}"#,
            r#"{"sentiment": "Mixed", "topics": []}"#,
            r#"{"sentiment": "Unknown", "topics": []}"#,
            r#"{"sentiment": "Positive", "topics": 3}"#,
        ] {
            let err = parse_classification(reply).unwrap_err();
            assert_eq!(err.category(), "malformed_response", "{}", reply);
            assert!(!err.is_retryable());
        }
    }
}
