//! Service error types.

use thiserror::Error;

use crate::db::StoreError;

/// Errors surfaced by the customer, share and gateway services.
///
/// Variants are returned untranslated; the HTTP layer decides what a caller
/// is allowed to learn from each one.
#[derive(Debug, Error)]
pub enum CrmError {
    /// The tenant already uses customer number 9999.
    #[error("customer identifier space exhausted")]
    AllocationExhausted,

    /// Another writer took the chosen identifier first.
    #[error("customer identifier already taken")]
    AllocationConflict,

    /// No tenant identity was supplied.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The share link is unknown, disabled or malformed.
    #[error("share link not found")]
    ShareNotFound,

    /// The share link needs a password that has not been verified.
    #[error("password required")]
    PasswordRequired,

    /// The supplied share password is wrong.
    #[error("password incorrect")]
    PasswordIncorrect,

    /// Too many failed unlock attempts for this link.
    #[error("too many attempts")]
    TooManyAttempts,

    /// The store could not be reached. Retryable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store refused the operation.
    #[error("store denied: {0}")]
    StoreDenied(String),

    /// No customer with this identifier in the tenant.
    #[error("customer not found")]
    CustomerNotFound,

    /// Input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CrmError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::Denied(msg) => Self::StoreDenied(msg),
            StoreError::DataCorruption(msg) => Self::StoreDenied(format!("data corruption: {msg}")),
            StoreError::NotFound => Self::CustomerNotFound,
            StoreError::Conflict(msg) => Self::StoreDenied(format!("unexpected conflict: {msg}")),
        }
    }
}
