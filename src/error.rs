/// Unified error types for the Interns360 backend
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing, invalid or expired credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Valid identity lacking role, approval or active state
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Schema or business-rule violations
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identity provider or mail sender unreachable or unconfigured
    #[error("Dependency unavailable: {0}")]
    Dependency(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short human-readable reason the front end branches on
    pub fn reason(&self) -> String {
        match self {
            ApiError::Authentication(reason)
            | ApiError::Authorization(reason)
            | ApiError::Validation(reason)
            | ApiError::NotFound(reason)
            | ApiError::Dependency(reason) => reason.clone(),
            // Don't leak details
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// Map a unique-constraint violation to a validation error, pass anything else through
    pub fn unique_or(err: sqlx::Error, message: &str) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                ApiError::Validation(message.to_string())
            }
            _ => ApiError::Database(err),
        }
    }
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = match self {
            ApiError::Authentication(_) => "AuthenticationRequired",
            ApiError::Authorization(_) => "Forbidden",
            ApiError::Validation(_) => "ValidationError",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Dependency(_) => "ServiceUnavailable",
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                tracing::error!("request failed: {}", self);
                "InternalServerError"
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message: self.reason(),
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;
