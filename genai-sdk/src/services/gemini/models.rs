//! Gemini API data models
//!
//! This module contains type definitions for Gemini REST requests and
//! responses, and [`GenerationReply`], the validated form of a
//! `generateContent` response.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{strip_model_prefix, ModelDescriptor};
use crate::error::mapping::{map_gemini_error, map_http_error};
use crate::error::{ErrorContext, Result, ServiceError};

/// Harm categories relaxed on every request
pub const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// A model entry from `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Resource name, e.g. `models/gemini-1.5-flash`
    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub input_token_limit: Option<u64>,

    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl From<Model> for ModelDescriptor {
    fn from(model: Model) -> Self {
        ModelDescriptor {
            id: strip_model_prefix(&model.name).to_string(),
            display_name: model.display_name,
            supported_methods: model.supported_generation_methods,
        }
    }
}

/// One page of `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<Model>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A piece of content
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A turn of content
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// A single user turn holding `text`
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

/// Safety threshold for one harm category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Sampling parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Body of `POST /models/{model}:generateContent`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_settings: Vec<SafetySetting>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single-prompt request with every harm category set to `BLOCK_NONE`
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user_text(prompt)],
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect(),
            generation_config: None,
        }
    }
}

/// A generated candidate
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Feedback about the prompt itself
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Response of `generateContent`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, with its parts concatenated
    pub fn text(&self) -> Result<String> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(ServiceError::malformed(format!(
                "Prompt was blocked: {}",
                reason
            )));
        }

        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| ServiceError::malformed("Response contained no candidates"))?;

        let text: String = candidate
            .content
            .as_ref()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("UNKNOWN");
            return Err(ServiceError::malformed(format!(
                "Candidate contained no text (finish reason: {})",
                reason
            )));
        }

        Ok(text)
    }
}

/// Error details inside an error envelope
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub status: Option<String>,
}

/// `{"error": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

/// A `generateContent` response validated at the boundary
#[derive(Debug, Clone)]
pub enum GenerationReply {
    /// A well-formed success body
    Structured(GenerateContentResponse),

    /// The service reported an error
    Error {
        status: StatusCode,
        envelope: Option<ErrorEnvelope>,
        body: String,
    },

    /// A success status whose body could not be understood
    Malformed(String),
}

impl GenerationReply {
    /// Classify a raw HTTP status and body
    pub fn classify(status: StatusCode, body: &str) -> Self {
        let json = serde_json::from_str::<Value>(body).ok();
        let envelope = json
            .as_ref()
            .filter(|value| value.get("error").is_some())
            .and_then(|value| serde_json::from_value::<ErrorEnvelope>(value.clone()).ok());

        if !status.is_success() || envelope.is_some() {
            return GenerationReply::Error {
                status,
                envelope,
                body: body.to_string(),
            };
        }

        match json {
            Some(value) => match serde_json::from_value::<GenerateContentResponse>(value) {
                Ok(response) => GenerationReply::Structured(response),
                Err(e) => GenerationReply::Malformed(format!("Unexpected response shape: {}", e)),
            },
            None => GenerationReply::Malformed(format!(
                "Response is not JSON: {}",
                crate::util::truncate_string(body, 100)
            )),
        }
    }

    /// Generated text, or the normalized error
    pub fn into_text(self) -> Result<String> {
        match self {
            GenerationReply::Structured(response) => response.text(),
            GenerationReply::Malformed(reason) => Err(ServiceError::malformed(reason)),
            GenerationReply::Error {
                status,
                envelope,
                body,
            } => {
                let mut context = ErrorContext::for_service("gemini");
                let error = match envelope {
                    Some(envelope) => {
                        let value = serde_json::to_value(&envelope).unwrap_or(Value::Null);
                        // A 200 carrying an envelope still needs a meaningful status
                        let status = match (status.is_success(), envelope.error.code) {
                            (true, Some(code)) => StatusCode::from_u16(code).unwrap_or(status),
                            _ => status,
                        };
                        map_gemini_error(status, &value, &mut context)
                    }
                    None => map_http_error(status, &body, &mut context),
                };
                Err(error.with_context(context))
            }
        }
    }
}
