//! Configuration loading and management

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clients::{ClientRegistration, GrantType};
use crate::users::User;

/// Upper bound for any configured lifetime (100 years).
pub const MAX_LIFETIME_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Convert a lifetime in seconds to a [`Duration`], or `None` past
/// [`MAX_LIFETIME_SECS`].
pub fn lifetime(secs: u64) -> Option<Duration> {
    if secs > MAX_LIFETIME_SECS {
        return None;
    }
    i64::try_from(secs).ok().and_then(Duration::try_seconds)
}

fn check_lifetime(name: &str, secs: u64) -> Result<()> {
    if secs == 0 || secs > MAX_LIFETIME_SECS {
        bail!("{name} must be between 1 and {MAX_LIFETIME_SECS} seconds (got {secs})");
    }
    Ok(())
}

/// Main configuration for the authorization server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Value of the `iss` claim (defaults to the public URL)
    #[serde(default)]
    pub issuer: Option<String>,

    /// Registered OAuth clients (administrative provisioning)
    #[serde(default)]
    pub clients: Vec<ClientRegistration>,

    /// Users who can log in and approve clients
    #[serde(default)]
    pub users: Vec<User>,

    /// Token and code lifetimes
    #[serde(default)]
    pub tokens: TokenConfig,

    /// JWT signing key configuration
    #[serde(default)]
    pub signing: SigningConfig,

    /// Login session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Token introspection (`/oauth/check_token`) access
    #[serde(default)]
    pub introspection: IntrospectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Access token lifetime in seconds (default: 1 hour)
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime_secs: u64,

    /// Refresh token lifetime in seconds (default: 30 days)
    #[serde(default = "default_refresh_token_lifetime")]
    pub refresh_token_lifetime_secs: u64,

    /// Authorization code lifetime in seconds (default: 5 minutes)
    #[serde(default = "default_code_lifetime")]
    pub authorization_code_lifetime_secs: u64,

    /// How long a user's consent is remembered (default: 30 days)
    #[serde(default = "default_approval_lifetime")]
    pub approval_lifetime_secs: u64,

    /// Static claims added to every access token
    #[serde(default)]
    pub extra_claims: Map<String, Value>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime_secs: default_access_token_lifetime(),
            refresh_token_lifetime_secs: default_refresh_token_lifetime(),
            authorization_code_lifetime_secs: default_code_lifetime(),
            approval_lifetime_secs: default_approval_lifetime(),
            extra_claims: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Key ID placed in the JWT header
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// PKCS#8 private key PEM, relative to the config directory.
    /// Generated on first start if missing.
    #[serde(default = "default_private_key_file")]
    pub private_key_file: String,

    /// Where the matching public key PEM is written for resource servers
    #[serde(default = "default_public_key_file")]
    pub public_key_file: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key_id: default_key_id(),
            private_key_file: default_private_key_file(),
            public_key_file: default_public_key_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds (default: 12 hours)
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_secs: u64,

    /// Cookie signing secret (64+ bytes, hex-encoded)
    /// If not set, a random key is generated at startup (sessions won't survive restarts)
    pub cookie_secret: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_lifetime_secs: default_session_lifetime(),
            cookie_secret: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntrospectionConfig {
    /// Allow unauthenticated callers to introspect tokens.
    /// Off by default; only meant for local demos.
    #[serde(default)]
    pub permit_all: bool,
}

fn default_access_token_lifetime() -> u64 {
    3600 // 1 hour
}

fn default_refresh_token_lifetime() -> u64 {
    30 * 24 * 3600 // 30 days
}

fn default_code_lifetime() -> u64 {
    300 // 5 minutes
}

fn default_approval_lifetime() -> u64 {
    30 * 24 * 3600 // 30 days
}

fn default_session_lifetime() -> u64 {
    12 * 3600 // 12 hours
}

fn default_key_id() -> String {
    "oauth2-jwt".to_string()
}

fn default_private_key_file() -> String {
    "jwt_private.pem".to_string()
}

fn default_public_key_file() -> String {
    "jwt_public.pem".to_string()
}

impl Config {
    /// Load configuration from the config directory
    pub fn load(config_path: &str) -> Result<Self> {
        let config_file = Path::new(config_path).join("config.json");

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)
                .with_context(|| format!("Failed to read config file: {:?}", config_file))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| "Failed to parse config.json")?;
            config.validate()?;
            tracing::info!("Loaded configuration from {:?}", config_file);
            Ok(config)
        } else {
            tracing::info!(
                "No config file found at {:?}, provisioning demo configuration",
                config_file
            );
            let config = Config::demo()?;

            // Create config directory if it doesn't exist
            std::fs::create_dir_all(config_path)
                .with_context(|| format!("Failed to create config directory: {}", config_path))?;

            // Write default config for reference
            let content = serde_json::to_string_pretty(&config)?;
            std::fs::write(&config_file, content)
                .with_context(|| format!("Failed to write default config: {:?}", config_file))?;
            tracing::warn!(
                "Created demo config at {:?} with client 'demo' (secret 'demo-secret') and user 'user' (password 'password'); replace these credentials before exposing the server",
                config_file
            );

            Ok(config)
        }
    }

    /// Demo configuration: one confidential client and one user.
    pub fn demo() -> Result<Self> {
        Self::demo_with_cost(bcrypt::DEFAULT_COST)
    }

    /// Same as [`Config::demo`] with an explicit bcrypt cost.
    pub fn demo_with_cost(cost: u32) -> Result<Self> {
        let client_secret_hash = bcrypt::hash("demo-secret", cost)
            .context("Failed to hash demo client secret")?;
        let password_hash =
            bcrypt::hash("password", cost).context("Failed to hash demo user password")?;

        Ok(Self {
            clients: vec![ClientRegistration {
                client_id: "demo".to_string(),
                client_secret_hash,
                authorized_grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
                redirect_uris: vec!["https://app/cb".to_string()],
                scopes: vec!["read".to_string(), "write".to_string()],
                auto_approve: false,
                access_token_lifetime_secs: None,
                refresh_token_lifetime_secs: None,
            }],
            users: vec![User {
                username: "user".to_string(),
                password_hash,
                name: Some("Demo User".to_string()),
                email: None,
            }],
            ..Self::default()
        })
    }

    /// Reject configurations that would make client or user lookup ambiguous
    /// or carry a lifetime outside 1..=[`MAX_LIFETIME_SECS`].
    pub fn validate(&self) -> Result<()> {
        let mut client_ids = HashSet::new();
        for client in &self.clients {
            if !client_ids.insert(client.client_id.as_str()) {
                bail!("Duplicate client_id in config: {}", client.client_id);
            }
            if client.redirect_uris.is_empty() {
                bail!("Client {} has no redirect_uris", client.client_id);
            }
            if let Some(secs) = client.access_token_lifetime_secs {
                check_lifetime(&format!("{}.access_token_lifetime_secs", client.client_id), secs)?;
            }
            if let Some(secs) = client.refresh_token_lifetime_secs {
                check_lifetime(&format!("{}.refresh_token_lifetime_secs", client.client_id), secs)?;
            }
        }

        check_lifetime("tokens.access_token_lifetime_secs", self.tokens.access_token_lifetime_secs)?;
        check_lifetime("tokens.refresh_token_lifetime_secs", self.tokens.refresh_token_lifetime_secs)?;
        check_lifetime(
            "tokens.authorization_code_lifetime_secs",
            self.tokens.authorization_code_lifetime_secs,
        )?;
        check_lifetime("tokens.approval_lifetime_secs", self.tokens.approval_lifetime_secs)?;
        check_lifetime("session.session_lifetime_secs", self.session.session_lifetime_secs)?;

        let mut usernames = HashSet::new();
        for user in &self.users {
            if !usernames.insert(user.username.as_str()) {
                bail!("Duplicate username in config: {}", user.username);
            }
        }

        if self.introspection.permit_all {
            tracing::warn!(
                "Token introspection is open to unauthenticated callers (introspection.permit_all)"
            );
        }
        Ok(())
    }

    /// Resolve a file name from the config against the config directory.
    pub fn resolve(config_path: &str, file: &str) -> PathBuf {
        Path::new(config_path).join(file)
    }
}
