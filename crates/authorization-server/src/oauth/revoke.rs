//! Token revocation (RFC 7009)
//!
//! Only refresh tokens are revocable; access tokens are self-contained JWTs
//! and stay valid until they expire.

use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::AppState;
use crate::error::OAuthError;

use super::authenticate_client;

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Handler for `POST /oauth/revoke`
///
/// Unknown tokens still get a 200, as RFC 7009 requires.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(request): Form<RevokeRequest>,
) -> Response {
    let client = match authenticate_client(
        &state,
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )
    .await
    {
        Ok(client) => client,
        Err(e) => return e.into_response(),
    };

    let Some(token) = request.token.as_deref() else {
        return OAuthError::InvalidRequest("Missing token".to_string()).into_response();
    };

    match state.tokens.revoke(&client, token).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}
