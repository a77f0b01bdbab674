//! Engine error taxonomy.

use thiserror::Error;

use qaflow_core::DomainError;

use crate::{Permission, SessionError, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identifier or wrong password; deliberately does not say which.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("session rejected: {0}")]
    Session(#[from] SessionError),

    #[error("forbidden: missing permission '{permission}'")]
    PermissionDenied { permission: Permission },

    /// The actor may not perform this change (e.g. acting on a higher role).
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

impl From<DomainError> for AuthError {
    fn from(err: DomainError) -> Self {
        AuthError::Validation(err.to_string())
    }
}
