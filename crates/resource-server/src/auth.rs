//! Bearer authentication middleware
//!
//! [`require_bearer`] verifies the token locally and stores the
//! [`VerifiedToken`] in the request extensions; [`require_scope`] runs after
//! it on individual routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use oauth2_token::{TokenError, VerifiedToken};

use crate::AppState;
use crate::error::AuthError;

/// Extract the token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers.get(header::AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid Authorization header encoding".to_string()))?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingToken);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Verify the bearer token and attach it to the request.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;

    let verified = state.verifier.verify(token).map_err(|e| {
        tracing::debug!("Rejected bearer token ({}): {}", e.error_code(), e);
        match e {
            TokenError::ExpiredToken(_) => AuthError::ExpiredToken(e.to_string()),
            _ => AuthError::InvalidToken(e.to_string()),
        }
    })?;

    tracing::debug!(
        "Request authenticated for subject {} via client {}",
        verified.subject(),
        verified.client_id()
    );
    request.extensions_mut().insert(verified);
    Ok(next.run(request).await)
}

/// Reject requests whose token lacks `scope`. Must run after [`require_bearer`].
pub async fn require_scope(
    State(scope): State<&'static str>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(token) = request.extensions().get::<VerifiedToken>() else {
        return Err(AuthError::MissingToken);
    };

    if !token.has_scope(scope) {
        tracing::info!(
            "Subject {} (scopes '{}') lacks required scope '{}'",
            token.subject(),
            token.scopes(),
            scope
        );
        return Err(AuthError::InsufficientScope(scope.to_string()));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_or_wrong_scheme() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(&headers("Basic ZGVtbzpkZW1v")), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(&headers("Bearer ")), Err(AuthError::MissingToken)));
    }
}
