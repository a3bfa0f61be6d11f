//! API error type and the uniform error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::CredentialError;
use crate::gateway::InferenceError;

/// Errors surfaced to API callers.
///
/// Every variant renders as `{"error": {"message": ..., "code": ...}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    #[error("{0}")]
    Validation(String),

    #[error("Rate limit exceeded. Try again later.")]
    RateLimited,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidApiKey => "invalid_api_key",
            ApiError::Validation(_) => "validation_error",
            ApiError::RateLimited => "rate_limit_exceeded",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "code": self.code()
            }
        }));

        (self.status(), body).into_response()
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::EmptyMessages => ApiError::Validation(err.to_string()),
            other => {
                tracing::error!("Inference error: {}", other);
                ApiError::Internal("Inference failed".to_string())
            }
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        tracing::error!("Credential error: {}", err);
        ApiError::Internal("Internal server error".to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ExecutorError;

    #[test]
    fn test_status_and_code_mapping() {
        let cases = [
            (ApiError::InvalidApiKey, StatusCode::UNAUTHORIZED, "invalid_api_key"),
            (ApiError::Validation("bad".into()), StatusCode::BAD_REQUEST, "validation_error"),
            (ApiError::RateLimited, StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND, "not_found"),
            (ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_inference_error_mapping() {
        let err: ApiError = InferenceError::EmptyMessages.into();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.to_string(), "messages array is required");

        let err: ApiError = InferenceError::Execution(ExecutorError::Failed("boom".into())).into();
        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.to_string(), "Inference failed");

        let err: ApiError = InferenceError::Dropped.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_envelope_body() {
        let response = ApiError::NotFound("API key not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"error": {"message": "API key not found", "code": "not_found"}})
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
