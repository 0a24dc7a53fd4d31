//! Error types for PatentDesk services
//!
//! Every domain failure is an [`AppError`] carrying its HTTP status.
//! Handlers return `Result<T>` and axum turns the error into the
//! `{ "error": ..., "code": ... }` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    PayloadTooLarge,
    UnsupportedFileType,
    Unauthorized,
    InvalidToken,
    ExpiredToken,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    DatabaseError,
    InternalError,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType { extension: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("{resource_type} not found: {id}")]
    NotFound { resource_type: &'static str, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::UnsupportedFileType { .. } => ErrorCode::UnsupportedFileType,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Conflict { .. } => ErrorCode::Conflict,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) | AppError::Migration(_) => ErrorCode::DatabaseError,
            AppError::Csv(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::Internal { .. }
            | AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            AppError::Unauthorized { .. } | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }

            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,

            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            AppError::Conflict { .. } => StatusCode::CONFLICT,

            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            AppError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,

            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Csv(_)
            | AppError::Io(_)
            | AppError::Serialization(_)
            | AppError::Internal { .. }
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to hand back to the caller. Internal causes stay in the log.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|k| k.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.public_message(),
            code,
            field,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::not_found("Title", "abc");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Title not found: abc");
    }

    #[test]
    fn test_conflict_is_client_error() {
        let err = AppError::conflict("duplicate evaluation");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_error_hides_details() {
        let err = AppError::Internal {
            message: "connection reset by peer".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_forbidden_keeps_message() {
        let err = AppError::forbidden("cannot edit title");
        assert_eq!(err.public_message(), "Forbidden: cannot edit title");
    }
}
