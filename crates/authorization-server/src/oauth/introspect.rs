//! Token introspection (`/oauth/check_token`)
//!
//! Returns the verified claim set with `active: true`. Callers must
//! authenticate as a registered client unless `introspection.permit_all` is
//! set in the configuration.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::AppState;
use crate::error::OAuthError;

use super::authenticate_client;

/// First value of `name` in the form body, then in the query string.
pub fn param(query: Option<&str>, body: &[u8], name: &str) -> Option<String> {
    let from_body = url::form_urlencoded::parse(body)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned());
    from_body.or_else(|| {
        url::form_urlencoded::parse(query?.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    })
}

/// Handler for `POST /oauth/check_token`
pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    match introspect(&state, &headers, query.as_deref(), &body).await {
        Ok(claims) => Json(claims).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn introspect(
    state: &AppState,
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<Value, OAuthError> {
    if !state.config.introspection.permit_all {
        let client_id = param(query, body, "client_id");
        let client_secret = param(query, body, "client_secret");
        let client = authenticate_client(state, headers, client_id.as_deref(), client_secret.as_deref()).await?;
        tracing::debug!("Introspection request from client {}", client.client_id);
    }

    let token = param(query, body, "token")
        .ok_or_else(|| OAuthError::InvalidRequest("Missing token".to_string()))?;

    let claims = state.tokens.introspect(&token).map_err(|e| {
        tracing::debug!("Introspected token rejected: {}", e);
        OAuthError::from(e)
    })?;

    let mut value = serde_json::to_value(&claims)
        .map_err(|e| OAuthError::ServerError(format!("Failed to encode claims: {e}")))?;
    if let Value::Object(map) = &mut value {
        map.insert("active".to_string(), Value::Bool(true));
    }
    Ok(value)
}
