//! Local RS256 token verification.
//!
//! Verification never calls back to the authorization server: a token is
//! accepted when its signature checks out against the configured public key
//! and its `exp` has not passed. There is no revocation lookup, so access
//! token lifetimes should stay short.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};

use crate::claims::Claims;
use crate::error::TokenError;
use crate::keys::PublicKey;
use crate::scope::Scopes;

/// A token whose signature and expiry have been checked.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub claims: Claims,
}

impl VerifiedToken {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn client_id(&self) -> &str {
        &self.claims.client_id
    }

    pub fn scopes(&self) -> &Scopes {
        &self.claims.scope
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.claims.scope.contains(scope)
    }
}

/// Verifies access tokens against a single public key.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: PublicKey,
    issuer: Option<String>,
    leeway_secs: i64,
}

impl TokenVerifier {
    pub fn new(key: PublicKey) -> Self {
        Self {
            key,
            issuer: None,
            leeway_secs: 0,
        }
    }

    /// Require the `iss` claim to equal `issuer`.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Tolerate clock skew of up to `secs` past `exp`.
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = i64::try_from(secs).unwrap_or(i64::MAX);
        self
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as of `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::InvalidToken(format!("Malformed token header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(TokenError::InvalidToken(format!(
                "Unexpected algorithm {:?}",
                header.alg
            )));
        }

        match (self.key.kid(), header.kid.as_deref()) {
            (Some(expected), Some(kid)) if expected != kid => {
                return Err(TokenError::InvalidToken(format!("Unknown key id '{kid}'")));
            }
            (Some(_), None) => {
                return Err(TokenError::InvalidToken("Missing key id".to_string()));
            }
            _ => {}
        }

        // Expiry is checked below against `now` so callers control the clock.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        let mut required: HashSet<String> = ["exp", "sub"].iter().map(|c| c.to_string()).collect();
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
            required.insert("iss".to_string());
        }
        validation.required_spec_claims = required;

        let data = jsonwebtoken::decode::<Claims>(token, self.key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => {
                    TokenError::InvalidToken("Signature verification failed".to_string())
                }
                ErrorKind::InvalidIssuer => {
                    TokenError::InvalidToken("Issuer mismatch".to_string())
                }
                _ => TokenError::InvalidToken(e.to_string()),
            })?;

        let claims = data.claims;
        if now.timestamp() > claims.exp.saturating_add(self.leeway_secs) {
            tracing::debug!(
                "Rejecting expired token {} for subject {}",
                claims.jti,
                claims.sub
            );
            return Err(TokenError::ExpiredToken(claims.expires_at()));
        }

        Ok(VerifiedToken { claims })
    }
}
