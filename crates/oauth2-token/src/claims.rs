//! The claim set carried by access tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::scope::Scopes;

/// Claim names owned by [`Claims`] itself. Custom claims may not shadow them.
pub const REGISTERED_CLAIMS: &[&str] = &["iss", "sub", "client_id", "scope", "iat", "exp", "jti"];

/// JWT access token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer (the authorization server's public URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject: the user who authorized the grant
    pub sub: String,

    /// Client the token was issued to
    pub client_id: String,

    /// Granted scopes, space-delimited on the wire
    #[serde(default)]
    pub scope: Scopes,

    /// Issued-at (seconds since the epoch)
    pub iat: i64,

    /// Expiry (seconds since the epoch)
    pub exp: i64,

    /// Unique token identifier
    pub jti: String,

    /// Custom claims injected by token enhancers
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(
        subject: impl Into<String>,
        client_id: impl Into<String>,
        scope: Scopes,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            iss: None,
            sub: subject.into(),
            client_id: client_id.into(),
            scope,
            iat: issued_at.timestamp(),
            exp: (issued_at + lifetime).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            extra: Map::new(),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    /// Add a custom claim. Returns `false` (and leaves the claims untouched)
    /// when `name` is one of the registered claims.
    pub fn set_custom(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if REGISTERED_CLAIMS.contains(&name.as_str()) {
            tracing::warn!("Refusing to overwrite registered claim '{}'", name);
            return false;
        }
        self.extra.insert(name, value);
        true
    }

    pub fn custom(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Seconds of validity remaining at `now` (zero once expired).
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.exp - now.timestamp()).max(0)
    }
}
