/// Unified error types for the wiki service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the wiki
#[derive(Error, Debug)]
pub enum WikiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Cache backend errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<axum::extract::rejection::JsonRejection> for WikiError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        WikiError::Validation(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for WikiError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        WikiError::Validation(rejection.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for WikiError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        WikiError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for WikiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect::<Vec<_>>();
        WikiError::Validation(format!("Invalid fields: {}", fields.join(", ")))
    }
}

/// JSON error body returned by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl WikiError {
    /// HTTP status and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            WikiError::Authentication(_) => (StatusCode::UNAUTHORIZED, "AuthenticationRequired"),
            WikiError::Authorization(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            WikiError::Validation(_) => (StatusCode::BAD_REQUEST, "InvalidRequest"),
            WikiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            WikiError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            WikiError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RateLimitExceeded")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        }
    }
}

/// Convert WikiError to HTTP response
impl IntoResponse for WikiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let message = match self {
            WikiError::Database(_)
            | WikiError::Migration(_)
            | WikiError::Cache(_)
            | WikiError::Internal(_)
            | WikiError::Io(_) => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string() // Don't leak details
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for wiki operations
pub type WikiResult<T> = Result<T, WikiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            WikiError::NotFound("doc".into()).status_and_code().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WikiError::Authorization("no".into()).status_and_code().0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            WikiError::Internal("boom".into()).status_and_code().1,
            "InternalServerError"
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let response = WikiError::Internal("secret path /etc".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
