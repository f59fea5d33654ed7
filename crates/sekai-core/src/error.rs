//! Error types shared by the identity service and the access-control layer.

use thiserror::Error;
use tonic::{Code, Status};

use crate::db::DatabaseError;

/// Result type alias using [`AuthError`].
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures of the authentication and access-control core.
///
/// Every variant crosses service boundaries as a [`Status`]; the mapping is
/// lossless for the variants callers branch on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    Expired,

    #[error("token revoked or not found")]
    RevokedOrNotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("profile lookup failed: {0}")]
    ProfileLookup(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("token issuance failed: {0}")]
    TokenIssuance(String),

    #[error("remote call timed out")]
    RpcTimeout,

    #[error("remote call failed: {0}")]
    Rpc(String),

    #[error("missing service token")]
    MissingServiceToken,
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        let msg = err.to_string();
        match err {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::Expired
            | AuthError::RevokedOrNotFound
            | AuthError::MissingServiceToken => Self::unauthenticated(msg),
            AuthError::PermissionDenied => Self::permission_denied(msg),
            AuthError::ProfileLookup(_) => Self::not_found(msg),
            AuthError::RpcTimeout => Self::deadline_exceeded(msg),
            AuthError::Rpc(_) => Self::unavailable(msg),
            AuthError::Store(_) | AuthError::TokenIssuance(_) => Self::internal(msg),
        }
    }
}

impl From<Status> for AuthError {
    fn from(status: Status) -> Self {
        let msg = status.message();
        match status.code() {
            Code::Unauthenticated => unauthenticated_reason(msg),
            Code::PermissionDenied => Self::PermissionDenied,
            Code::NotFound => Self::ProfileLookup(strip(msg, "profile lookup failed: ")),
            Code::DeadlineExceeded => Self::RpcTimeout,
            Code::Internal => Self::Store(strip(msg, "store error: ")),
            _ => Self::Rpc(strip(msg, "remote call failed: ")),
        }
    }
}

impl From<DatabaseError> for AuthError {
    fn from(e: DatabaseError) -> Self {
        Self::Store(e.to_string())
    }
}

fn unauthenticated_reason(msg: &str) -> AuthError {
    [
        AuthError::InvalidCredentials,
        AuthError::Expired,
        AuthError::RevokedOrNotFound,
        AuthError::MissingServiceToken,
    ]
    .into_iter()
    .find(|candidate| candidate.to_string() == msg)
    .unwrap_or(AuthError::InvalidToken)
}

fn strip(msg: &str, prefix: &str) -> String {
    msg.strip_prefix(prefix).unwrap_or(msg).to_string()
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
