//! Token minting, refresh, introspection and revocation
//!
//! Access tokens are RS256 JWTs and are never stored. Refresh tokens are
//! opaque random strings persisted by hash so they can be revoked.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use oauth2_token::{Claims, KeyPair, Scopes, TokenError, TokenSigner, TokenVerifier};
use serde::{Deserialize, Serialize};

use crate::clients::{ClientRegistration, GrantType};
use crate::codes::AuthorizationCodeService;
use crate::config::{self, TokenConfig};
use crate::enhancer::{EnhancerChain, TokenEnhancer};
use crate::error::OAuthError;
use crate::storage::{Store, generate_random_string, hash_token};

const REFRESH_TOKEN_LENGTH: usize = 48;

/// Stored refresh token (keyed by the hash of the token)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub client_id: String,
    pub user_id: String,
    pub scopes: Scopes,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Successful token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scope: Scopes,
    pub jti: String,
}

pub struct TokenService {
    signer: TokenSigner,
    verifier: TokenVerifier,
    enhancers: EnhancerChain,
    refresh_tokens: Arc<dyn Store<RefreshTokenRecord>>,
    issuer: Option<String>,
    access_token_lifetime: u64,
    refresh_token_lifetime: u64,
}

impl TokenService {
    pub fn new(
        key_pair: &KeyPair,
        refresh_tokens: Arc<dyn Store<RefreshTokenRecord>>,
        enhancers: EnhancerChain,
        config: &TokenConfig,
        issuer: Option<String>,
    ) -> Result<Self, TokenError> {
        let mut verifier = TokenVerifier::new(key_pair.public_key()?);
        if let Some(issuer) = &issuer {
            verifier = verifier.with_issuer(issuer.clone());
        }

        Ok(Self {
            signer: TokenSigner::new(key_pair)?,
            verifier,
            enhancers,
            refresh_tokens,
            issuer,
            access_token_lifetime: config.access_token_lifetime_secs,
            refresh_token_lifetime: config.refresh_token_lifetime_secs,
        })
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Build, enhance and sign an access token.
    pub fn mint_access_token(
        &self,
        client: &ClientRegistration,
        user_id: &str,
        scopes: &Scopes,
    ) -> Result<(String, Claims), OAuthError> {
        let lifetime = token_lifetime(
            client
                .access_token_lifetime_secs
                .unwrap_or(self.access_token_lifetime),
        )?;

        let mut claims = Claims::new(user_id, &client.client_id, scopes.clone(), Utc::now(), lifetime);
        if let Some(issuer) = &self.issuer {
            claims = claims.with_issuer(issuer.clone());
        }
        self.enhancers.enhance(&mut claims);

        let token = self.signer.sign(&claims)?;
        Ok((token, claims))
    }

    /// Mint an access token and, if the client may refresh, a new refresh token.
    pub async fn issue(
        &self,
        client: &ClientRegistration,
        user_id: &str,
        scopes: &Scopes,
    ) -> Result<TokenResponse, OAuthError> {
        let refresh_token = if client.allows_grant(GrantType::RefreshToken) {
            Some(self.create_refresh_token(client, user_id, scopes).await?)
        } else {
            None
        };

        let response = self.respond(client, user_id, scopes, refresh_token)?;
        tracing::info!(
            "Issued access token {} for client {} / user {} (scope '{}')",
            response.jti,
            client.client_id,
            user_id,
            scopes
        );
        Ok(response)
    }

    fn respond(
        &self,
        client: &ClientRegistration,
        user_id: &str,
        scopes: &Scopes,
        refresh_token: Option<String>,
    ) -> Result<TokenResponse, OAuthError> {
        let (access_token, claims) = self.mint_access_token(client, user_id, scopes)?;
        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: (claims.exp - claims.iat).max(0) as u64,
            refresh_token,
            scope: claims.scope,
            jti: claims.jti,
        })
    }

    async fn create_refresh_token(
        &self,
        client: &ClientRegistration,
        user_id: &str,
        scopes: &Scopes,
    ) -> Result<String, OAuthError> {
        let lifetime = token_lifetime(
            client
                .refresh_token_lifetime_secs
                .unwrap_or(self.refresh_token_lifetime),
        )?;
        let now = Utc::now();

        let token = generate_random_string(REFRESH_TOKEN_LENGTH);
        let record = RefreshTokenRecord {
            client_id: client.client_id.clone(),
            user_id: user_id.to_string(),
            scopes: scopes.clone(),
            created_at: now,
            expires_at: now + lifetime,
        };
        self.refresh_tokens.put(&hash_token(&token), record).await?;
        Ok(token)
    }

    /// `authorization_code` grant: redeem the code, then mint.
    pub async fn exchange_code(
        &self,
        codes: &AuthorizationCodeService,
        client: &ClientRegistration,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenResponse, OAuthError> {
        if !client.allows_grant(GrantType::AuthorizationCode) {
            return Err(OAuthError::UnauthorizedClient(format!(
                "Client {} may not use the authorization_code grant",
                client.client_id
            )));
        }

        let record = codes.redeem(code, &client.client_id, redirect_uri).await?;
        self.issue(client, &record.user_id, &record.scopes).await
    }

    /// `refresh_token` grant. The refresh token is reused, and `scope` may
    /// narrow the new access token but never widen it.
    pub async fn refresh(
        &self,
        client: &ClientRegistration,
        refresh_token: &str,
        scope: Option<&str>,
    ) -> Result<TokenResponse, OAuthError> {
        if !client.allows_grant(GrantType::RefreshToken) {
            return Err(OAuthError::UnauthorizedClient(format!(
                "Client {} may not use the refresh_token grant",
                client.client_id
            )));
        }

        let key = hash_token(refresh_token);
        let Some(record) = self.refresh_tokens.get(&key).await? else {
            return Err(OAuthError::InvalidGrant("Invalid refresh token".to_string()));
        };

        if record.expires_at <= Utc::now() {
            self.refresh_tokens.delete(&key).await?;
            return Err(OAuthError::InvalidGrant("Refresh token expired".to_string()));
        }

        if record.client_id != client.client_id {
            tracing::warn!(
                "Client {} presented a refresh token issued to {}",
                client.client_id,
                record.client_id
            );
            return Err(OAuthError::InvalidGrant("Invalid refresh token".to_string()));
        }

        let scopes = match scope {
            Some(requested) => {
                let requested = Scopes::parse(requested);
                if requested.is_empty() || !requested.is_subset(&record.scopes) {
                    return Err(OAuthError::InvalidScope(format!(
                        "Requested scope '{}' exceeds the original grant '{}'",
                        requested, record.scopes
                    )));
                }
                requested
            }
            None => record.scopes.clone(),
        };

        let response = self.respond(client, &record.user_id, &scopes, Some(refresh_token.to_string()))?;
        tracing::info!(
            "Refreshed access token for client {} / user {} (scope '{}')",
            client.client_id,
            record.user_id,
            scopes
        );
        Ok(response)
    }

    /// Verify an access token and return its claims.
    pub fn introspect(&self, token: &str) -> Result<Claims, TokenError> {
        Ok(self.verifier.verify(token)?.claims)
    }

    /// Revoke a refresh token owned by `client`.
    ///
    /// Returns whether a token was removed. Unknown tokens and tokens owned by
    /// other clients are left untouched.
    pub async fn revoke(&self, client: &ClientRegistration, token: &str) -> Result<bool, OAuthError> {
        let key = hash_token(token);
        match self.refresh_tokens.get(&key).await? {
            Some(record) if record.client_id == client.client_id => {
                let removed = self.refresh_tokens.delete(&key).await?.is_some();
                tracing::info!("Revoked refresh token for client {}", client.client_id);
                Ok(removed)
            }
            Some(record) => {
                tracing::warn!(
                    "Client {} tried to revoke a refresh token owned by {}",
                    client.client_id,
                    record.client_id
                );
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

fn token_lifetime(secs: u64) -> Result<Duration, OAuthError> {
    config::lifetime(secs).ok_or_else(|| {
        tracing::error!("Token lifetime of {} seconds is out of range", secs);
        OAuthError::ServerError("Token lifetime is out of range".to_string())
    })
}
