//! Error types for skaz-gen
//!
//! Every failure reaches the client as `{error, details, stderr?, stdout?}`.
//! Whether a pipeline failure also changes the HTTP status depends on the
//! configured [`ErrorStatusPolicy`].

use crate::pipeline::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use skaz_common::config::ErrorStatusPolicy;
use thiserror::Error;

/// Failure body returned by the API
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or unusable request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Pipeline stage failure; status chosen by policy
    #[error("{error}")]
    Pipeline {
        error: PipelineError,
        policy: ErrorStatusPolicy,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn pipeline(error: PipelineError, policy: ErrorStatusPolicy) -> Self {
        ApiError::Pipeline { error, policy }
    }
}

/// HTTP status for a pipeline failure under `policy`
pub fn pipeline_status(error: &PipelineError, policy: ErrorStatusPolicy) -> StatusCode {
    match policy {
        ErrorStatusPolicy::Legacy => StatusCode::OK,
        ErrorStatusPolicy::Mapped if error.is_persistence() => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorStatusPolicy::Mapped => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(details) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Invalid request".to_string(),
                    details,
                    stderr: None,
                    stdout: None,
                },
            ),
            ApiError::Pipeline { error, policy } => {
                let captured = error.captured();
                (
                    pipeline_status(&error, policy),
                    ErrorBody {
                        error: error.kind().to_string(),
                        details: error.details(),
                        stderr: captured.as_ref().map(|c| c.stderr.clone()),
                        stdout: captured.map(|c| c.stdout),
                    },
                )
            }
            ApiError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal error".to_string(),
                    details,
                    stderr: None,
                    stdout: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::GenerationError;
    use crate::store::StoreError;
    use std::path::PathBuf;

    fn disk_error() -> PipelineError {
        PipelineError::SaveText(StoreError::Write {
            path: PathBuf::from("/out/x.md"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }

    #[test]
    fn test_legacy_policy_is_always_ok() {
        let error = PipelineError::Generation(GenerationError::Timeout);
        assert_eq!(pipeline_status(&error, ErrorStatusPolicy::Legacy), StatusCode::OK);
        assert_eq!(pipeline_status(&disk_error(), ErrorStatusPolicy::Legacy), StatusCode::OK);
    }

    #[test]
    fn test_mapped_policy_statuses() {
        let error = PipelineError::Generation(GenerationError::Timeout);
        assert_eq!(pipeline_status(&error, ErrorStatusPolicy::Mapped), StatusCode::BAD_GATEWAY);
        assert_eq!(
            pipeline_status(&disk_error(), ErrorStatusPolicy::Mapped),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_bad_request_status() {
        let response = ApiError::BadRequest("topic must not be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
