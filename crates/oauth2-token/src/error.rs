//! Token error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while loading keys, signing, or verifying tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Malformed token, bad signature, wrong algorithm or issuer
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Signature is valid but the `exp` claim has passed
    #[error("Token expired at {0}")]
    ExpiredToken(DateTime<Utc>),

    #[error("Key error: {0}")]
    Key(String),

    #[error("Signing error: {0}")]
    Signing(String),
}

impl TokenError {
    /// OAuth2 error code reported to the caller for verification failures.
    pub fn error_code(&self) -> &'static str {
        match self {
            TokenError::ExpiredToken(_) => "expired_token",
            TokenError::InvalidToken(_) => "invalid_token",
            TokenError::Key(_) | TokenError::Signing(_) => "server_error",
        }
    }
}
