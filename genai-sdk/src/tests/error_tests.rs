//! Tests for error handling functionality
//!
//! These tests verify that the error system in the SDK works correctly.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::error::{mapping, ErrorContext, ServiceError};

    #[test]
    fn test_service_error_creation() {
        let network_err = ServiceError::network("Connection failed");
        let auth_err = ServiceError::authentication("Invalid credentials");
        let quota_err = ServiceError::quota_exceeded("Too many requests");

        assert_eq!(network_err.to_string(), "Network error: Connection failed");
        assert_eq!(
            auth_err.to_string(),
            "Authentication error: Invalid credentials"
        );
        assert_eq!(quota_err.to_string(), "Quota exceeded: Too many requests");

        assert!(network_err.is_retryable());
        assert!(!auth_err.is_retryable());
        assert!(quota_err.is_retryable());

        assert!(!network_err.is_permanent());
        assert!(auth_err.is_permanent());
    }

    #[test]
    fn test_classification_table() {
        let retryable = [
            ServiceError::network("x"),
            ServiceError::timeout("x"),
            ServiceError::quota_exceeded("x"),
            ServiceError::service("x"),
        ];
        for err in &retryable {
            assert!(err.is_retryable(), "{} should be retryable", err);
            assert!(!err.is_fatal(), "{} should not be fatal", err);
        }

        let fatal = [
            ServiceError::model_unavailable("x"),
            ServiceError::authentication("x"),
            ServiceError::configuration("x"),
        ];
        for err in &fatal {
            assert!(!err.is_retryable(), "{} should not be retryable", err);
            assert!(err.is_fatal(), "{} should be fatal", err);
        }

        // Fail a single record only
        let record_level = [ServiceError::malformed("x"), ServiceError::invalid_request("x")];
        for err in &record_level {
            assert!(!err.is_retryable(), "{} should not be retryable", err);
            assert!(!err.is_fatal(), "{} should not be fatal", err);
        }
        assert_eq!(record_level[0].category(), "malformed_response");
        assert_eq!(record_level[1].category(), "invalid_request");
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::for_service("gemini")
            .status_code(408)
            .error_code("DEADLINE_EXCEEDED")
            .endpoint("models/gemini-1.5-flash:generateContent")
            .with("attempt", 3);

        let err = ServiceError::timeout("Request timed out").with_context(context);

        assert_eq!(err.status_code(), Some(408));
        assert_eq!(err.error_code(), Some("DEADLINE_EXCEEDED"));
        assert!(err.to_string().contains("Request timed out"));
        assert!(err.is_retryable());
        assert_eq!(err.category(), "timeout");
        assert!(matches!(err.root(), ServiceError::Timeout(_)));
    }

    #[test]
    fn test_with_context_value_does_not_nest() {
        let err = ServiceError::service("busy")
            .with_context_value("attempt", 1)
            .with_context_value("attempts", 5);

        match &err {
            ServiceError::WithContext { inner, context } => {
                assert!(matches!(**inner, ServiceError::Service(_)));
                assert_eq!(context.data.get("attempt").map(String::as_str), Some("1"));
                assert_eq!(context.data.get("attempts").map(String::as_str), Some("5"));
            }
            other => panic!("expected context wrapper, got {:?}", other),
        }
    }

    #[test]
    fn test_http_error_mapping() {
        let mut context = ErrorContext::for_service("gemini");

        let cases = [
            (StatusCode::UNAUTHORIZED, "authentication"),
            (StatusCode::FORBIDDEN, "authentication"),
            (StatusCode::NOT_FOUND, "model_unavailable"),
            (StatusCode::REQUEST_TIMEOUT, "timeout"),
            (StatusCode::TOO_MANY_REQUESTS, "quota_exceeded"),
            (StatusCode::BAD_REQUEST, "invalid_request"),
            (StatusCode::BAD_GATEWAY, "service"),
        ];
        for (status, category) in cases {
            let err = mapping::map_http_error(status, "", &mut context);
            assert_eq!(err.category(), category, "status {}", status);
        }
    }

    #[test]
    fn test_long_body_is_truncated() {
        let mut context = ErrorContext::for_service("gemini");
        let body = "x".repeat(500);
        let err = mapping::map_http_error(StatusCode::BAD_GATEWAY, &body, &mut context);
        assert!(err.to_string().len() < 200);
    }
}
