//! Bearer token failures (RFC 6750 §3)

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    /// Malformed, forged or otherwise unusable token
    #[error("{0}")]
    InvalidToken(String),

    /// Authentic token past its `exp`. The challenge still says
    /// `invalid_token`; the JSON body says `expired_token`.
    #[error("{0}")]
    ExpiredToken(String),

    /// Valid token lacking the scope the route requires
    #[error("Insufficient scope: '{0}' required")]
    InsufficientScope(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::ExpiredToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InsufficientScope(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken(_) => "invalid_token",
            AuthError::ExpiredToken(_) => "expired_token",
            AuthError::InsufficientScope(_) => "insufficient_scope",
        }
    }

    /// `WWW-Authenticate` challenge for this failure.
    pub fn challenge(&self) -> String {
        let description = self.to_string().replace('"', "'");
        match self {
            AuthError::InsufficientScope(scope) => format!(
                r#"Bearer error="insufficient_scope", error_description="{}", scope="{}""#,
                description, scope
            ),
            _ => format!(
                r#"Bearer error="invalid_token", error_description="{}""#,
                description
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "error_description": self.to_string(),
        }));
        let mut response = (self.status(), body).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.challenge()) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_token_challenge() {
        let response = AuthError::InvalidToken("Token expired".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.starts_with(r#"Bearer error="invalid_token""#));
    }

    #[tokio::test]
    async fn test_expired_token_body_names_expiry() {
        let response = AuthError::ExpiredToken("Token expired".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.starts_with(r#"Bearer error="invalid_token""#));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "expired_token");
    }

    #[test]
    fn test_insufficient_scope_names_required_scope() {
        let response = AuthError::InsufficientScope("write".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.contains(r#"error="insufficient_scope""#));
        assert!(challenge.contains(r#"scope="write""#));
    }
}
