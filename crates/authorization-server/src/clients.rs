//! Client registry
//!
//! Clients are provisioned administratively (from `config.json` at startup)
//! and looked up read-only on every authorization and token request.

use std::sync::Arc;

use oauth2_token::Scopes;
use serde::{Deserialize, Serialize};

use crate::error::OAuthError;
use crate::storage::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// A registered OAuth client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,

    /// bcrypt hash of the client secret
    pub client_secret_hash: String,

    #[serde(default = "default_grant_types")]
    pub authorized_grant_types: Vec<GrantType>,

    /// Redirect URIs, matched exactly
    pub redirect_uris: Vec<String>,

    /// Scopes this client may request
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Skip the consent page for this client
    #[serde(default)]
    pub auto_approve: bool,

    /// Per-client override of the access token lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_lifetime_secs: Option<u64>,

    /// Per-client override of the refresh token lifetime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_lifetime_secs: Option<u64>,
}

fn default_grant_types() -> Vec<GrantType> {
    vec![GrantType::AuthorizationCode]
}

impl ClientRegistration {
    pub fn allows_grant(&self, grant: GrantType) -> bool {
        self.authorized_grant_types.contains(&grant)
    }

    /// Exact string comparison; no prefix or pattern matching.
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    pub fn allowed_scopes(&self) -> Scopes {
        self.scopes.iter().map(String::as_str).collect()
    }
}

pub struct ClientRegistry {
    store: Arc<dyn Store<ClientRegistration>>,
}

impl ClientRegistry {
    pub fn new(store: Arc<dyn Store<ClientRegistration>>) -> Self {
        Self { store }
    }

    /// Administrative write path.
    pub async fn provision(&self, client: ClientRegistration) -> Result<(), OAuthError> {
        tracing::info!(
            "Provisioning client {} (grants: {:?}, scopes: {:?})",
            client.client_id,
            client.authorized_grant_types,
            client.scopes
        );
        let client_id = client.client_id.clone();
        self.store.put(&client_id, client).await?;
        Ok(())
    }

    /// Look up a client; unknown IDs are `invalid_client`.
    pub async fn lookup(&self, client_id: &str) -> Result<ClientRegistration, OAuthError> {
        self.store.get(client_id).await?.ok_or_else(|| {
            tracing::debug!("Unknown client_id {}", client_id);
            OAuthError::InvalidClient(format!("Unknown client: {}", client_id))
        })
    }

    /// Check `secret` against the stored hash. Unknown clients yield `false`.
    pub async fn verify_secret(&self, client_id: &str, secret: &str) -> Result<bool, OAuthError> {
        let Some(client) = self.store.get(client_id).await? else {
            return Ok(false);
        };

        let secret = secret.to_string();
        let hash = client.client_secret_hash;
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash))
            .await
            .map_err(|e| OAuthError::ServerError(format!("Secret verification task failed: {e}")))?;

        match verified {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::warn!("Stored secret hash for client {} is unusable: {}", client_id, e);
                Ok(false)
            }
        }
    }

    /// Lookup plus secret check; any failure is `invalid_client`.
    pub async fn authenticate(
        &self,
        client_id: &str,
        secret: &str,
    ) -> Result<ClientRegistration, OAuthError> {
        let client = self.lookup(client_id).await?;
        if !self.verify_secret(client_id, secret).await? {
            tracing::warn!("Client authentication failed for {}", client_id);
            return Err(OAuthError::InvalidClient(
                "Client authentication failed".to_string(),
            ));
        }
        Ok(client)
    }
}
