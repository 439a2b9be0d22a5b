//! Login sessions
//!
//! A session is a signed cookie carrying the username and an expiry. Nothing
//! is stored server-side, so a session survives restarts as long as the
//! cookie secret is configured.

use anyhow::{Context, Result, bail};
use axum::http::{HeaderMap, header};
use chrono::{DateTime, Utc};
use cookie::{Cookie, CookieJar, Key, SameSite};

use crate::config::{MAX_LIFETIME_SECS, SessionConfig};

pub const SESSION_COOKIE_NAME: &str = "oauth_session";

/// Minimum key material accepted by [`Key::from`].
const MIN_SECRET_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionManager {
    key: Key,
    lifetime_secs: i64,
}

impl SessionManager {
    /// Lifetimes past [`MAX_LIFETIME_SECS`] are clamped to it.
    pub fn new(key: Key, lifetime_secs: u64) -> Self {
        let lifetime_secs = i64::try_from(lifetime_secs.min(MAX_LIFETIME_SECS)).unwrap_or(i64::MAX);
        Self { key, lifetime_secs }
    }

    /// Build the cookie key from configuration, or generate one.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let key = match &config.cookie_secret {
            Some(secret) => {
                let bytes = hex::decode(secret.trim()).context("session.cookie_secret is not valid hex")?;
                if bytes.len() < MIN_SECRET_BYTES {
                    bail!(
                        "session.cookie_secret must be at least {} bytes (got {})",
                        MIN_SECRET_BYTES,
                        bytes.len()
                    );
                }
                Key::from(&bytes)
            }
            None => {
                tracing::warn!("No session.cookie_secret configured; sessions will not survive a restart");
                Key::generate()
            }
        };
        Ok(Self::new(key, config.session_lifetime_secs))
    }

    /// Signed cookie for a freshly authenticated user.
    pub fn start(&self, username: &str) -> Cookie<'static> {
        let expires_at = Utc::now().timestamp().saturating_add(self.lifetime_secs);
        let cookie = Cookie::build((SESSION_COOKIE_NAME, format!("{username}|{expires_at}")))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.lifetime_secs))
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(cookie.clone());
        // An unsigned fallback never passes `current`.
        jar.get(SESSION_COOKIE_NAME).cloned().unwrap_or(cookie)
    }

    /// Expired cookie that clears the session.
    pub fn clear(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, ""))
            .path("/")
            .max_age(time::Duration::ZERO)
            .build()
    }

    /// Session carried by the request, if it is authentic and unexpired.
    pub fn current(&self, headers: &HeaderMap) -> Option<Session> {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(cookie_str) = value.to_str() else {
                continue;
            };
            for cookie_part in cookie_str.split(';') {
                if let Ok(cookie) = Cookie::parse_encoded(cookie_part.trim().to_string()) {
                    jar.add_original(cookie);
                }
            }
        }

        let cookie = jar.signed(&self.key).get(SESSION_COOKIE_NAME)?;
        let (username, expires_at) = cookie.value().rsplit_once('|')?;
        let expires_at = DateTime::from_timestamp(expires_at.parse().ok()?, 0)?;
        if expires_at <= Utc::now() {
            tracing::debug!("Session for {} expired at {}", username, expires_at);
            return None;
        }

        Some(Session {
            username: username.to_string(),
            expires_at,
        })
    }
}
