//! Mock tests for the Gemini service
//!
//! These tests use WireMock to simulate the Gemini API and verify that the
//! Gemini client correctly interacts with the API.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::{select_model, GenerativeBackend};
    use crate::error::ServiceError;
    use crate::resilience::{RecordingSleeper, RetryConfig, RetryExecutor};
    use crate::services::gemini::{GeminiClient, GeminiClientBuilder};

    const MODEL_PATH: &str = "/models/gemini-1.5-flash:generateContent";

    /// Creates a test Gemini client configured to use the mock server
    fn create_test_client(mock_server: &MockServer) -> GeminiClient {
        GeminiClientBuilder::new()
            .api_key("mock_api_key_for_testing")
            .base_url(mock_server.uri())
            .timeout(1)
            .build()
            .expect("Failed to build Gemini client")
    }

    fn text_response(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP",
                "index": 0
            }]
        })
    }

    fn error_response(code: u16, status: &str, message: &str) -> serde_json::Value {
        json!({"error": {"code": code, "message": message, "status": status}})
    }

    #[tokio::test]
    async fn test_generate_sends_key_and_prompt() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "mock_api_key_for_testing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Positive")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let text = client
            .generate("gemini-1.5-flash", "How does this sound?")
            .await
            .unwrap();
        assert_eq!(text, "Positive");

        let requests = mock_server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "How does this sound?");
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[tokio::test]
    async fn test_list_models_follows_pages() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{
                    "name": "models/gemini-1.0-pro",
                    "displayName": "Gemini 1.0 Pro",
                    "supportedGenerationMethods": ["generateContent", "countTokens"]
                }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{
                    "name": "models/embedding-001",
                    "supportedGenerationMethods": ["embedContent"]
                }],
                "nextPageToken": "page-2"
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let models = client.list_models().await.unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "embedding-001");
        assert_eq!(models[1].id, "gemini-1.0-pro");
        assert!(!models[0].supports_generation());

        let preferred = vec!["gemini-1.5-flash".to_string(), "gemini-1.0-pro".to_string()];
        assert_eq!(
            select_model(&models, &preferred, "gemini-1.0-pro").as_deref(),
            Some("gemini-1.0-pro")
        );
    }

    #[tokio::test]
    async fn test_error_envelopes_are_classified() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/quota:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_json(error_response(
                429,
                "RESOURCE_EXHAUSTED",
                "Resource has been exhausted (e.g. check quota).",
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/models/missing:generateContent"))
            .respond_with(ResponseTemplate::new(404).set_body_json(error_response(
                404,
                "NOT_FOUND",
                "models/missing is not found for API version v1beta",
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/models/badkey:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_json(error_response(
                400,
                "INVALID_ARGUMENT",
                "API key not valid. Please pass a valid API key.",
            )))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/models/busy:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);

        let err = client.generate("quota", "p").await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::QuotaExceeded(_)));
        assert_eq!(err.status_code(), Some(429));

        let err = client.generate("missing", "p").await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::ModelUnavailable(_)));
        assert!(err.is_fatal());

        let err = client.generate("badkey", "p").await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::Authentication(_)));

        let err = client.generate("busy", "p").await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::Service(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client.generate("gemini-1.5-flash", "p").await.unwrap_err();
        assert!(matches!(err, ServiceError::MalformedResponse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(text_response("late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let err = client.generate("gemini-1.5-flash", "p").await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(error_response(
                503,
                "UNAVAILABLE",
                "The model is overloaded. Please try again later.",
            )))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server);
        let sleeper = Arc::new(RecordingSleeper::new());
        let retry = RetryExecutor::new(RetryConfig {
            max_retries: 5,
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.0,
        })
        .with_sleeper(sleeper.clone());

        let report = retry
            .execute("generate", || client.generate("gemini-1.5-flash", "p"))
            .await;

        assert_eq!(report.attempt_count(), 3);
        assert_eq!(report.outcome.unwrap(), "ok");
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
    }

    #[test]
    fn test_builder_requires_api_key() {
        let result = GeminiClientBuilder::new().build();
        assert!(matches!(result, Err(ServiceError::Configuration(_))));
    }
}
