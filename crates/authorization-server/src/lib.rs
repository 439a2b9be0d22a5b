//! OAuth2 authorization server
//!
//! Provides:
//! - Authorization code flow with login, consent and remembered approvals
//! - Token exchange issuing RS256 JWT access tokens and opaque refresh tokens
//! - Token introspection (`/oauth/check_token`) and revocation
//! - RFC 8414 metadata and public key publication (JWKS and PEM)

pub mod approvals;
pub mod clients;
pub mod codes;
pub mod config;
pub mod enhancer;
pub mod error;
pub mod html;
pub mod login;
pub mod oauth;
pub mod session;
pub mod signing;
pub mod storage;
pub mod tokens;
pub mod users;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use oauth2_token::{KeyPair, PublicKey};
use tower_http::trace::TraceLayer;

use crate::approvals::ApprovalStore;
use crate::clients::ClientRegistry;
use crate::codes::AuthorizationCodeService;
use crate::config::Config;
use crate::enhancer::{EnhancerChain, StaticClaimsEnhancer, UserDetailsEnhancer};
use crate::session::SessionManager;
use crate::storage::Storage;
use crate::tokens::TokenService;
use crate::users::UserDirectory;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub public_url: String,

    /// Value of the `iss` claim
    pub issuer: String,

    pub clients: ClientRegistry,
    pub users: Arc<UserDirectory>,
    pub approvals: ApprovalStore,
    pub codes: AuthorizationCodeService,
    pub tokens: TokenService,
    pub sessions: SessionManager,
    pub public_key: PublicKey,
}

impl AppState {
    /// Wire the services together and provision configured clients.
    pub async fn new(
        config: Config,
        storage: Storage,
        key_pair: &KeyPair,
        sessions: SessionManager,
        public_url: &str,
    ) -> Result<Self> {
        let public_url = public_url.trim_end_matches('/').to_string();
        let issuer = config.issuer.clone().unwrap_or_else(|| public_url.clone());

        let clients = ClientRegistry::new(storage.clients.clone());
        for client in &config.clients {
            clients.provision(client.clone()).await?;
        }

        let users = Arc::new(UserDirectory::new(config.users.clone()));
        let enhancers = EnhancerChain::new()
            .with(UserDetailsEnhancer::new(users.clone()))
            .with(StaticClaimsEnhancer::new(config.tokens.extra_claims.clone()));

        let tokens = TokenService::new(
            key_pair,
            storage.refresh_tokens.clone(),
            enhancers,
            &config.tokens,
            Some(issuer.clone()),
        )?;
        let code_lifetime = crate::config::lifetime(config.tokens.authorization_code_lifetime_secs)
            .context("tokens.authorization_code_lifetime_secs is out of range")?;
        let codes = AuthorizationCodeService::new(storage.codes.clone(), code_lifetime);

        tracing::info!(
            "Authorization server ready: issuer {}, {} client(s), {} user(s)",
            issuer,
            config.clients.len(),
            config.users.len()
        );

        Ok(Self {
            public_url,
            issuer,
            clients,
            users,
            approvals: ApprovalStore::new(storage.approvals.clone()),
            codes,
            tokens,
            sessions,
            public_key: key_pair.public_key()?,
            config,
        })
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(login::home))
        // OAuth metadata (RFC 8414) and verification keys
        .route(
            "/.well-known/oauth-authorization-server",
            get(oauth::metadata::handler),
        )
        .route("/.well-known/jwks.json", get(oauth::metadata::jwks))
        .route("/oauth/token_key", get(oauth::metadata::token_key))
        // Login
        .route("/login", get(login::get_login).post(login::post_login))
        .route("/logout", post(login::logout))
        // Authorization endpoint
        .route(
            "/oauth/authorize",
            get(oauth::authorize::get_handler).post(oauth::authorize::post_handler),
        )
        // Token endpoint
        .route("/oauth/token", post(oauth::token::handler))
        .route("/oauth/check_token", post(oauth::introspect::handler))
        .route("/oauth/revoke", post(oauth::revoke::handler))
        .route("/health", get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
