//! Discovery and key publication
//!
//! - `/.well-known/oauth-authorization-server` (RFC 8414)
//! - `/.well-known/jwks.json`: the verification key as a JWK set
//! - `/oauth/token_key`: the verification key as a PEM, for resource servers
//!   configured with a key file

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{Json, extract::State, response::{IntoResponse, Response}};
use oauth2_token::JwkSet;
use serde::Serialize;

use crate::AppState;
use crate::error::OAuthError;

/// OAuth 2.0 Authorization Server Metadata (RFC 8414)
#[derive(Debug, Serialize)]
pub struct AuthorizationServerMetadata {
    /// The authorization server's issuer identifier (URL)
    pub issuer: String,

    pub authorization_endpoint: String,

    pub token_endpoint: String,

    pub introspection_endpoint: String,

    pub revocation_endpoint: String,

    /// URL of the JWK set used to verify access tokens
    pub jwks_uri: String,

    pub response_types_supported: Vec<String>,

    pub grant_types_supported: Vec<String>,

    /// Union of the scopes registered clients may request
    pub scopes_supported: Vec<String>,

    pub token_endpoint_auth_methods_supported: Vec<String>,
}

/// Handler for `GET /.well-known/oauth-authorization-server`
pub async fn handler(State(state): State<Arc<AppState>>) -> Json<AuthorizationServerMetadata> {
    let base_url = state.public_url.trim_end_matches('/');

    let scopes: BTreeSet<String> = state
        .config
        .clients
        .iter()
        .flat_map(|client| client.scopes.iter().cloned())
        .collect();

    let metadata = AuthorizationServerMetadata {
        issuer: state.issuer.clone(),
        authorization_endpoint: format!("{}/oauth/authorize", base_url),
        token_endpoint: format!("{}/oauth/token", base_url),
        introspection_endpoint: format!("{}/oauth/check_token", base_url),
        revocation_endpoint: format!("{}/oauth/revoke", base_url),
        jwks_uri: format!("{}/.well-known/jwks.json", base_url),
        response_types_supported: vec!["code".to_string()],
        grant_types_supported: vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
        ],
        scopes_supported: scopes.into_iter().collect(),
        token_endpoint_auth_methods_supported: vec![
            "client_secret_basic".to_string(),
            "client_secret_post".to_string(),
        ],
    };

    tracing::debug!("Serving authorization server metadata");
    Json(metadata)
}

/// Handler for `GET /.well-known/jwks.json`
pub async fn jwks(State(state): State<Arc<AppState>>) -> Json<JwkSet> {
    Json(JwkSet {
        keys: vec![state.public_key.to_jwk()],
    })
}

#[derive(Debug, Serialize)]
pub struct TokenKey {
    pub alg: String,
    pub value: String,
}

/// Handler for `GET /oauth/token_key`
pub async fn token_key(State(state): State<Arc<AppState>>) -> Response {
    match state.public_key.to_pem() {
        Ok(value) => Json(TokenKey {
            alg: "RS256".to_string(),
            value,
        })
        .into_response(),
        Err(e) => OAuthError::from(e).into_response(),
    }
}
