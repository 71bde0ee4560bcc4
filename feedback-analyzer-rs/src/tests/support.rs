// Scripted backend and helpers shared by the pipeline tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use genai_sdk::core::GENERATE_CONTENT;
use genai_sdk::{
    GenerativeBackend, ModelDescriptor, RecordingSleeper, RetryConfig, RetryExecutor, ServiceError,
};
use serde_json::json;

type Responder = Box<dyn Fn(&str) -> genai_sdk::Result<String> + Send + Sync>;

/// Backend answering every prompt through a closure and recording the prompts
pub struct ScriptedBackend {
    models: Option<Vec<ModelDescriptor>>,
    responder: Responder,
    prompts: Mutex<Vec<String>>,
    listings: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> genai_sdk::Result<String> + Send + Sync + 'static,
    {
        Self {
            models: Some(vec![ModelDescriptor::new(
                "models/gemini-1.5-flash",
                &[GENERATE_CONTENT],
            )]),
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
            listings: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_models(mut self, models: Vec<ModelDescriptor>) -> Self {
        self.models = Some(models);
        self
    }

    /// Model listing fails with an authentication error
    pub fn with_listing_failure(mut self) -> Self {
        self.models = None;
        self
    }

    /// Shared count of model listings, readable after the backend is moved
    pub fn listing_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.listings)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn count_prompts(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }

    pub fn summary_prompts(&self) -> Vec<String> {
        self.prompts().into_iter().filter(|p| is_summary(p)).collect()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_models(&self) -> genai_sdk::Result<Vec<ModelDescriptor>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        match &self.models {
            Some(models) => Ok(models.clone()),
            None => Err(ServiceError::authentication("API key not valid")),
        }
    }

    async fn generate(&self, _model: &str, prompt: &str) -> genai_sdk::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.responder)(prompt)
    }
}

pub fn is_summary(prompt: &str) -> bool {
    prompt.contains("## Overall Feedback Summary")
}

pub fn is_chat(prompt: &str) -> bool {
    prompt.contains("User's Question:")
}

/// Whether a classification prompt is about `cleaned_text`
pub fn classifies(prompt: &str, cleaned_text: &str) -> bool {
    prompt.contains(&format!("'{}'", cleaned_text))
}

pub fn classification(sentiment: &str, topics: &[&str]) -> String {
    json!({"sentiment": sentiment, "topics": topics}).to_string()
}

/// Executor with a recording sleeper, no jitter and `max_retries` attempts
pub fn test_retry(max_retries: u32) -> (RetryExecutor, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    let config = RetryConfig {
        max_retries,
        initial_interval: Duration::from_secs(1),
        max_interval: Duration::from_secs(30),
        multiplier: 2.0,
        jitter_factor: 0.0,
    };
    let executor = RetryExecutor::new(config).with_sleeper(sleeper.clone());
    (executor, sleeper)
}
