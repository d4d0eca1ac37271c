//! API error types and HTTP mappings

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use domain_claims::ClaimError;
use domain_governance::GovernanceError;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::Validation(msg) => ApiError::Validation(msg),
            ClaimError::Money(e) => ApiError::Validation(e.to_string()),
            ClaimError::DuplicateClaim(key) => {
                ApiError::Conflict(format!("idempotency key '{key}' already used"))
            }
            ClaimError::NotFound(msg) => ApiError::NotFound(msg),
            ClaimError::Conflict(msg) => ApiError::Conflict(msg),
            ClaimError::InvalidStatusTransition { from, to } => {
                ApiError::Conflict(format!("cannot move claim from {from} to {to}"))
            }
            ClaimError::Store(e) if e.is_transient() => {
                ApiError::ServiceUnavailable(e.to_string())
            }
            ClaimError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<GovernanceError> for ApiError {
    fn from(err: GovernanceError) -> Self {
        match err {
            GovernanceError::NotFound(id) => ApiError::NotFound(format!("proposal {id}")),
            GovernanceError::InvalidPower(_) => ApiError::Validation(err.to_string()),
            GovernanceError::VotingClosed(_)
            | GovernanceError::ProposalNotActive(_)
            | GovernanceError::DuplicateVote { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}
