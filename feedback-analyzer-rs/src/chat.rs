//! Questions about an analyzed batch
//!
//! Each question is answered from the run alone: the first cleaned texts plus
//! the run summary. Earlier turns are kept for display only and are never sent
//! back to the model.

use genai_sdk::GenerativeBackend;

use crate::client::InsightClient;
use crate::config::DEFAULT_CHAT_CONTEXT_LIMIT;
use crate::error::{AnalyzerError, Result};
use crate::types::AnalysisRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

pub struct ChatSession<'a, B: GenerativeBackend> {
    client: &'a InsightClient<B>,
    run: &'a AnalysisRun,
    context_limit: usize,
    transcript: Vec<ChatTurn>,
}

impl<'a, B: GenerativeBackend> ChatSession<'a, B> {
    pub fn new(client: &'a InsightClient<B>, run: &'a AnalysisRun) -> Self {
        Self {
            client,
            run,
            context_limit: DEFAULT_CHAT_CONTEXT_LIMIT,
            transcript: Vec::new(),
        }
    }

    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Cleaned texts sent along with every question
    pub fn context(&self) -> Vec<&str> {
        self.run
            .records
            .iter()
            .take(self.context_limit)
            .map(|record| record.cleaned_text())
            .collect()
    }

    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnalyzerError::validation("question is empty"));
        }

        let answer = self
            .client
            .answer_query(question, &self.context(), &self.run.summary_text)
            .await?;

        self.transcript.push(ChatTurn {
            speaker: Speaker::User,
            text: question.to_string(),
        });
        self.transcript.push(ChatTurn {
            speaker: Speaker::Assistant,
            text: answer.clone(),
        });
        Ok(answer)
    }
}
