//! OAuth2 resource server
//!
//! Verifies RS256 bearer tokens locally against the authorization server's
//! public key (no introspection round trip) and enforces per-route scopes.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::get,
};
use oauth2_token::{PublicKey, TokenVerifier};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// Load the public key named in the configuration and build the verifier.
    pub fn from_config(config_path: &str, config: &Config) -> Result<Self> {
        let key_path = config.public_key_path(config_path);
        let pem = std::fs::read_to_string(&key_path).with_context(|| {
            format!(
                "Failed to read public key {:?} (copy jwt_public.pem from the authorization server or fetch /oauth/token_key)",
                key_path
            )
        })?;
        let key = PublicKey::from_pem(&pem, config.key_id.clone())
            .with_context(|| format!("Failed to load public key {:?}", key_path))?;

        let mut verifier = TokenVerifier::new(key).with_leeway(config.leeway_secs);
        if let Some(issuer) = &config.issuer {
            verifier = verifier.with_issuer(issuer.clone());
        }

        tracing::info!("Loaded verification key from {:?}", key_path);
        Ok(Self::new(verifier))
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route(
            "/v1/protected",
            get(routes::protected).route_layer(middleware::from_fn_with_state("read", auth::require_scope)),
        )
        .route(
            "/v1/me",
            get(routes::me).route_layer(middleware::from_fn_with_state("read", auth::require_scope)),
        )
        .route(
            "/v1/admin",
            get(routes::admin).route_layer(middleware::from_fn_with_state("write", auth::require_scope)),
        )
        .route_layer(middleware::from_fn_with_state(state, auth::require_bearer));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::AUTHORIZATION]);

    Router::new()
        .route("/v1/hello", get(routes::hello))
        .route("/health", get(routes::health))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
