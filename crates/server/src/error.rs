//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Share link failures are reported with fixed messages so a visitor cannot
//! tell an unknown link from a disabled one.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::CrmError;

/// Application-level error type for the share site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Service operation failed.
    #[error("{0}")]
    Crm(#[from] CrmError),

    /// Session could not be loaded or saved.
    #[error("Session error: {0}")]
    Session(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Session(err.to_string())
    }
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Crm(err) => match err {
                CrmError::ShareNotFound | CrmError::CustomerNotFound => StatusCode::NOT_FOUND,
                CrmError::PasswordRequired
                | CrmError::PasswordIncorrect
                | CrmError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                CrmError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                CrmError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CrmError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CrmError::AllocationConflict => StatusCode::CONFLICT,
                CrmError::AllocationExhausted
                | CrmError::StoreDenied(_)
                | CrmError::PasswordHash
                | CrmError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code and the message shown to the client.
    fn public_parts(&self) -> (&'static str, String) {
        match self {
            Self::Crm(err) => match err {
                CrmError::ShareNotFound => ("link_invalid", "This link is invalid".to_string()),
                CrmError::PasswordRequired => {
                    ("password_required", "Enter the password for this link".to_string())
                }
                CrmError::PasswordIncorrect => {
                    ("password_incorrect", "Password incorrect".to_string())
                }
                CrmError::TooManyAttempts => (
                    "too_many_attempts",
                    "Too many attempts, try again later".to_string(),
                ),
                CrmError::StoreUnavailable(_) => {
                    ("load_failed", "Could not load, please try again".to_string())
                }
                CrmError::CustomerNotFound => ("not_found", "Not found".to_string()),
                CrmError::NotAuthenticated => ("unauthorized", "Not authenticated".to_string()),
                CrmError::InvalidInput(msg) => ("invalid_input", msg.clone()),
                CrmError::AllocationConflict => ("conflict", "Please try again".to_string()),
                CrmError::AllocationExhausted
                | CrmError::StoreDenied(_)
                | CrmError::PasswordHash
                | CrmError::Internal(_) => ("internal", "Internal server error".to_string()),
            },
            Self::Session(_) => ("internal", "Internal server error".to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let (code, message) = self.public_parts();
        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
