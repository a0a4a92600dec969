//! Authentication error types.

use farmdesk_core::error::FarmdeskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{}", banned_message(.reason))]
    Banned { reason: Option<String> },

    #[error("session has been revoked")]
    SessionRevoked,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("password policy: {0}")]
    WeakPassword(String),

    #[error("session is not an impersonation session")]
    NotImpersonating,

    #[error("not permitted: {0}")]
    NotPermitted(&'static str),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

fn banned_message(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!("account is banned: {reason}"),
        None => "account is banned".into(),
    }
}

impl From<AuthError> for FarmdeskError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::Banned { .. }
            | AuthError::SessionRevoked
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => FarmdeskError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::WeakPassword(_) | AuthError::NotImpersonating => FarmdeskError::Validation {
                message: err.to_string(),
            },
            AuthError::NotPermitted(_) => FarmdeskError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => FarmdeskError::Crypto(msg),
        }
    }
}
