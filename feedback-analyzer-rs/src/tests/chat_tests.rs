//! Conversational queries over a finished run

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::chat::{ChatSession, Speaker};
    use crate::client::InsightClient;
    use crate::tests::support::*;
    use crate::types::{AnalysisRun, FeedbackRecord, RunStatus};
    use crate::AnalyzerError;

    fn run_with(texts: &[&str], summary: &str) -> AnalysisRun {
        AnalysisRun {
            records: texts
                .iter()
                .enumerate()
                .map(|(i, text)| FeedbackRecord::new(i + 1, *text, *text))
                .collect(),
            summary_text: summary.to_string(),
            generated_at: Utc::now(),
            status: RunStatus::Completed,
            issues: Vec::new(),
            model: Some("gemini-1.5-flash".to_string()),
        }
    }

    fn answering_client(answer: &'static str) -> InsightClient<ScriptedBackend> {
        let backend = ScriptedBackend::new(move |_| Ok(answer.to_string()));
        let (retry, _) = test_retry(2);
        InsightClient::with_model(backend, retry, "gemini-1.5-flash")
    }

    #[tokio::test]
    async fn test_answer_is_returned_verbatim() {
        let client = answering_client("  Customers mostly complain about **delivery**.\n");
        let run = run_with(&["late parcel", "great staff"], "## Overall Feedback Summary\nMixed.");
        let mut session = ChatSession::new(&client, &run);

        let answer = session.ask("What do customers dislike?").await.unwrap();
        assert_eq!(answer, "  Customers mostly complain about **delivery**.\n");

        let prompt = &client.backend().prompts()[0];
        assert!(is_chat(prompt));
        assert!(prompt.contains("Feedback Snippets:\nlate parcel\ngreat staff\n"));
        assert!(prompt.contains("Overall AI Summary:\n## Overall Feedback Summary\nMixed."));
        assert!(prompt.contains("User's Question: What do customers dislike?"));
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let client = answering_client("unused");
        let run = run_with(&["late parcel"], "");
        let mut session = ChatSession::new(&client, &run);

        let result = session.ask("   ").await;
        assert!(matches!(result, Err(AnalyzerError::Validation(_))));
        assert!(client.backend().prompts().is_empty());
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_context_is_limited_and_history_not_sent() {
        let client = answering_client("FIRST ANSWER");
        let run = run_with(&["one", "two", "three", "four"], "summary");
        let mut session = ChatSession::new(&client, &run).with_context_limit(2);
        assert_eq!(session.context(), vec!["one", "two"]);

        session.ask("first question").await.unwrap();
        session.ask("second question").await.unwrap();

        let prompts = client.backend().prompts();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("three"));
        assert!(!prompts[1].contains("first question"));
        assert!(!prompts[1].contains("FIRST ANSWER"));

        let speakers: Vec<Speaker> = session.transcript().iter().map(|t| t.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::User, Speaker::Assistant, Speaker::User, Speaker::Assistant]
        );
        assert_eq!(session.transcript()[0].text, "first question");
    }

    #[tokio::test]
    async fn test_failed_answer_leaves_transcript_untouched() {
        let backend = ScriptedBackend::new(|_| {
            Err(genai_sdk::ServiceError::invalid_request("prompt too long"))
        });
        let (retry, _) = test_retry(3);
        let client = InsightClient::with_model(backend, retry, "gemini-1.5-flash");
        let run = run_with(&["one"], "summary");
        let mut session = ChatSession::new(&client, &run);

        let err = session.ask("why?").await.unwrap_err();
        assert_eq!(err.category(), "invalid_request");
        assert!(session.transcript().is_empty());
        assert_eq!(client.backend().prompts().len(), 1);
    }
}
