//! Auth failure taxonomy.

use thiserror::Error;

use crate::{Permission, TokenError};

/// Typed auth failure surfaced to callers.
///
/// The terminal layer decides user-facing wording; nothing here reaches the
/// user verbatim. `InvalidCredentials` deliberately covers unknown user,
/// inactive account and wrong password alike, so login responses cannot be
/// used to enumerate usernames.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is invalid")]
    TokenInvalid,

    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Credential or session storage failed; not an authorization decision.
    #[error("auth storage failure")]
    Storage(#[source] anyhow::Error),
}

impl AuthError {
    pub fn missing_permission(permission: Permission) -> Self {
        Self::Forbidden(format!("missing permission '{permission}'"))
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::Invalid => Self::TokenInvalid,
        }
    }
}
