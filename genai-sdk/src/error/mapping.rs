//! Error mapping for service-specific APIs
//!
//! This module provides mapping functions to convert the Gemini error
//! envelope (`{"error": {"code", "message", "status"}}`) and bare HTTP
//! failures to our normalized ServiceError type.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Map a Gemini API error to a ServiceError
///
/// The RPC status string wins over the HTTP status when both are present,
/// since Gemini reports e.g. `RESOURCE_EXHAUSTED` with a 429 but also uses
/// `INVALID_ARGUMENT` for bad API keys with a plain 400.
pub fn map_gemini_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> ServiceError {
    context.service = "gemini".to_string();
    context.status_code = Some(status.as_u16());

    let error = json.get("error").unwrap_or(json);

    let rpc_status = error.get("status").and_then(|s| s.as_str());
    if let Some(code) = rpc_status {
        context.error_code = Some(code.to_string());
    }

    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown Gemini error");

    if let Some(rpc_status) = rpc_status {
        if let Some(mapped) = map_rpc_status(rpc_status, message) {
            return mapped;
        }
    }

    map_status(status, message)
}

/// Map a generic HTTP error to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> ServiceError {
    // Try to parse as JSON first
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if json.get("error").is_some() {
            return map_gemini_error(status, &json, context);
        }
    }

    context.status_code = Some(status.as_u16());

    // Fallback to status-based mapping
    let message = if body.is_empty() {
        status.to_string()
    } else if body.len() > 100 {
        format!("{}: {}...", status, crate::util::truncate_string(body, 100))
    } else {
        format!("{}: {}", status, body)
    };

    map_status(status, &message)
}

fn map_rpc_status(rpc_status: &str, message: &str) -> Option<ServiceError> {
    let mapped = match rpc_status {
        "RESOURCE_EXHAUSTED" => ServiceError::quota_exceeded(message),
        "NOT_FOUND" => ServiceError::model_unavailable(message),
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => ServiceError::authentication(message),
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" => {
            if is_api_key_message(message) {
                ServiceError::authentication(message)
            } else {
                ServiceError::invalid_request(message)
            }
        }
        "DEADLINE_EXCEEDED" => ServiceError::timeout(message),
        "UNAVAILABLE" | "INTERNAL" | "ABORTED" => ServiceError::service(message),
        _ => return None,
    };
    Some(mapped)
}

fn map_status(status: StatusCode, message: &str) -> ServiceError {
    match status.as_u16() {
        400 => {
            if is_api_key_message(message) {
                ServiceError::authentication(message)
            } else {
                ServiceError::invalid_request(message)
            }
        }
        401 | 403 => ServiceError::authentication(message),
        404 => ServiceError::model_unavailable(message),
        408 | 504 => ServiceError::timeout(message),
        429 => ServiceError::quota_exceeded(message),
        500..=599 => ServiceError::service(message),
        _ => ServiceError::unknown(message),
    }
}

fn is_api_key_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("api key") || lowered.contains("api_key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(status: u16, body: Value) -> ServiceError {
        let mut ctx = ErrorContext::for_service("gemini");
        map_gemini_error(
            StatusCode::from_u16(status).unwrap(),
            &body,
            &mut ctx,
        )
    }

    #[test]
    fn test_resource_exhausted_is_quota() {
        let err = map(
            429,
            json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}),
        );
        assert!(matches!(err, ServiceError::QuotaExceeded(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_bad_api_key_is_authentication() {
        let err = map(
            400,
            json!({"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}),
        );
        assert!(matches!(err, ServiceError::Authentication(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_argument_is_invalid_request() {
        let err = map(
            400,
            json!({"error": {"code": 400, "message": "Invalid JSON payload", "status": "INVALID_ARGUMENT"}}),
        );
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
        assert!(!err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_not_found_is_model_unavailable() {
        let err = map(
            404,
            json!({"error": {"code": 404, "message": "models/foo is not found", "status": "NOT_FOUND"}}),
        );
        assert!(matches!(err, ServiceError::ModelUnavailable(_)));
    }

    #[test]
    fn test_plain_status_fallback() {
        let mut ctx = ErrorContext::for_service("gemini");
        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded", &mut ctx);
        assert!(matches!(err, ServiceError::Service(_)));
        assert_eq!(ctx.status_code, Some(503));

        let err = map_http_error(StatusCode::GATEWAY_TIMEOUT, "", &mut ctx);
        assert!(matches!(err, ServiceError::Timeout(_)));
    }
}
