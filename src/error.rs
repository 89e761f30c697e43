//! Crate-wide error type and its HTTP representation.
//!
//! Library code returns `Result<T, PipelineError>`; the API layer turns
//! these into the JSON error envelope via `IntoResponse`, centralizing the
//! status-code mapping in one place instead of scattering it across
//! handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The caller is authenticated but is acting on someone else's
    /// resource — e.g. an interaction body whose `user_id` doesn't match
    /// the bearer token's identity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("duplicate submission")]
    Duplicate,

    #[error("not found: {0}")]
    NotFound(String),

    /// Storage or downstream I/O hiccup that a retry could plausibly fix.
    #[error("transient failure: {0}")]
    Transient(String),

    /// A trace id was missing or malformed where the pipeline expected one.
    /// Never surfaced to a client — logged and the request proceeds with a
    /// minted id. Kept as a variant so callers that want to record it in a
    /// background counter have a typed value to match on.
    #[error("traceability defect: {0}")]
    TraceabilityDefect(String),

    #[error("fatal error: {0}")]
    Fatal(String),
}

impl From<sled::Error> for PipelineError {
    fn from(err: sled::Error) -> Self {
        PipelineError::Transient(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Transient(format!("serialization error: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Serialize)]
struct ApiErrorBody {
    error: ErrorDetail,
}

impl PipelineError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            PipelineError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth_error"),
            PipelineError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            PipelineError::Duplicate => (StatusCode::CONFLICT, "duplicate"),
            PipelineError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            PipelineError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, "transient_error"),
            PipelineError::TraceabilityDefect(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "traceability_defect")
            }
            PipelineError::Fatal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "fatal_error"),
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::warn!(error = %self, code, "request rejected");
        }
        let body = ApiErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn duplicate_maps_to_409_conflict() {
        let response = PipelineError::Duplicate.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"]["code"], "duplicate");
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let response = PipelineError::NotFound("user".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn transient_maps_to_503() {
        let response = PipelineError::Transient("warehouse unavailable".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
