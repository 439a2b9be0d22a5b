//! Authorization codes
//!
//! Codes are opaque 32-character strings handed to the user agent. Only the
//! SHA-256 hash is stored. Redemption is compare-and-delete on the store, so a
//! code can be exchanged at most once even under concurrent requests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use oauth2_token::Scopes;
use serde::{Deserialize, Serialize};

use crate::error::OAuthError;
use crate::storage::{Store, generate_random_string, hash_token};

pub const CODE_LENGTH: usize = 32;

/// Stored authorization code (keyed by the hash of the code)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub client_id: String,
    pub user_id: String,
    pub scopes: Scopes,
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn new(
        client_id: &str,
        user_id: &str,
        scopes: Scopes,
        redirect_uri: &str,
        lifetime: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            scopes,
            redirect_uri: redirect_uri.to_string(),
            created_at: now,
            expires_at: now + lifetime,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

pub struct AuthorizationCodeService {
    store: Arc<dyn Store<AuthorizationCode>>,
    lifetime: Duration,
}

impl AuthorizationCodeService {
    pub fn new(store: Arc<dyn Store<AuthorizationCode>>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    /// Create and store a fresh code, returning the raw value.
    pub async fn issue(
        &self,
        client_id: &str,
        user_id: &str,
        scopes: Scopes,
        redirect_uri: &str,
    ) -> Result<String, OAuthError> {
        let code = generate_random_string(CODE_LENGTH);
        let record = AuthorizationCode::new(client_id, user_id, scopes, redirect_uri, self.lifetime);
        self.store(&code, record).await?;

        tracing::info!("Issued authorization code for client {} / user {}", client_id, user_id);
        Ok(code)
    }

    /// Store a record under a caller-chosen code.
    pub async fn store(&self, code: &str, record: AuthorizationCode) -> Result<(), OAuthError> {
        self.store.put(&hash_token(code), record).await?;
        Ok(())
    }

    /// Redeem a code for `client_id` / `redirect_uri`.
    ///
    /// Expired codes are purged. A code bound to another client or redirect
    /// URI is left in place so the legitimate client can still redeem it.
    pub async fn redeem(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: Option<&str>,
    ) -> Result<AuthorizationCode, OAuthError> {
        let key = hash_token(code);

        let Some(record) = self.store.get(&key).await? else {
            tracing::debug!("Unknown authorization code presented by client {}", client_id);
            return Err(invalid_code());
        };

        if record.is_expired(Utc::now()) {
            self.store.delete(&key).await?;
            tracing::info!("Purged expired authorization code for client {}", record.client_id);
            return Err(OAuthError::InvalidGrant("Authorization code expired".to_string()));
        }

        if record.client_id != client_id {
            tracing::warn!(
                "Client {} presented a code issued to {}",
                client_id,
                record.client_id
            );
            return Err(invalid_code());
        }

        if redirect_uri != Some(record.redirect_uri.as_str()) {
            return Err(OAuthError::InvalidGrant(
                "Redirect URI mismatch".to_string(),
            ));
        }

        // Only the caller whose delete returns the record wins the redemption.
        match self.store.delete(&key).await? {
            Some(record) => Ok(record),
            None => {
                tracing::warn!("Authorization code for client {} was redeemed concurrently", client_id);
                Err(invalid_code())
            }
        }
    }
}

fn invalid_code() -> OAuthError {
    OAuthError::InvalidGrant("Invalid authorization code".to_string())
}
