//! OAuth2 Token Endpoint
//!
//! Handles:
//! - Authorization code exchange
//! - Refresh token grants
//!
//! Clients authenticate with HTTP Basic or `client_id`/`client_secret` form
//! fields before any grant is processed.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::AppState;
use crate::error::OAuthError;
use crate::tokens::TokenResponse;

use super::authenticate_client;

/// Token request (form-encoded)
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    /// "authorization_code" or "refresh_token"
    pub grant_type: Option<String>,

    /// Authorization code (for authorization_code grant)
    pub code: Option<String>,

    /// Must match the redirect URI the code was issued for
    pub redirect_uri: Option<String>,

    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    /// Refresh token (for refresh_token grant)
    pub refresh_token: Option<String>,

    /// Optional narrower scope (for refresh_token grant)
    pub scope: Option<String>,
}

/// Handler for `POST /oauth/token`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    let mut response = match handle(&state, &headers, &request).await {
        Ok(tokens) => Json(tokens).into_response(),
        Err(e) => {
            tracing::info!(
                "Token request ({}) failed with {}: {}",
                request.grant_type.as_deref().unwrap_or("none"),
                e.code(),
                e
            );
            e.into_response()
        }
    };

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

async fn handle(
    state: &AppState,
    headers: &HeaderMap,
    request: &TokenRequest,
) -> Result<TokenResponse, OAuthError> {
    let grant_type = request
        .grant_type
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidRequest("Missing grant_type".to_string()))?;

    let client = authenticate_client(
        state,
        headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )
    .await?;

    match grant_type {
        "authorization_code" => {
            let code = request
                .code
                .as_deref()
                .ok_or_else(|| OAuthError::InvalidRequest("Missing code".to_string()))?;
            state
                .tokens
                .exchange_code(&state.codes, &client, code, request.redirect_uri.as_deref())
                .await
        }
        "refresh_token" => {
            let refresh_token = request
                .refresh_token
                .as_deref()
                .ok_or_else(|| OAuthError::InvalidRequest("Missing refresh_token".to_string()))?;
            state
                .tokens
                .refresh(&client, refresh_token, request.scope.as_deref())
                .await
        }
        other => Err(OAuthError::UnsupportedGrantType(format!(
            "Unsupported grant type: {other}"
        ))),
    }
}
