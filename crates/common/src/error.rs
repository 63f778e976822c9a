//! Error types for ballotbox.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Election Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    PhaseError(String),

    #[error("You have already applied as a candidate for this position")]
    DuplicateCandidacy,

    #[error("You have already voted for this position")]
    AlreadyVoted,

    #[error("Candidate is not standing for this position: {0}")]
    UnknownCandidate(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Position selected more than once in the same ballot: {0}")]
    DuplicateInBatch(String),

    // === Client Errors ===
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PhaseError(_)
            | Self::DuplicateCandidacy
            | Self::AlreadyVoted
            | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::UnknownCandidate(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) | Self::DuplicateInBatch(_) => {
                StatusCode::BAD_REQUEST
            }

            // 5xx Server Errors
            Self::Database(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::PhaseError(_) => "PHASE_ERROR",
            Self::DuplicateCandidacy => "DUPLICATE_CANDIDACY",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::UnknownCandidate(_) => "UNKNOWN_CANDIDATE",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::DuplicateInBatch(_) => "DUPLICATE_IN_BATCH",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log server errors
        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_client_errors() {
        let errors = [
            AppError::PhaseError("Voting is not open".to_string()),
            AppError::DuplicateCandidacy,
            AppError::AlreadyVoted,
            AppError::UnknownCandidate("c1".to_string()),
            AppError::InvalidTransition("completed -> active".to_string()),
            AppError::DuplicateInBatch("p1".to_string()),
        ];

        for err in errors {
            assert!(!err.is_server_error(), "{err} should be a client error");
        }
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            AppError::NotFound(String::new()).error_code(),
            AppError::PhaseError(String::new()).error_code(),
            AppError::DuplicateCandidacy.error_code(),
            AppError::AlreadyVoted.error_code(),
            AppError::UnknownCandidate(String::new()).error_code(),
            AppError::InvalidTransition(String::new()).error_code(),
            AppError::Validation(String::new()).error_code(),
            AppError::DuplicateInBatch(String::new()).error_code(),
        ];

        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::AlreadyVoted.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::UnknownCandidate(String::new()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Database(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_already_voted_message() {
        assert_eq!(
            AppError::AlreadyVoted.to_string(),
            "You have already voted for this position"
        );
    }
}
