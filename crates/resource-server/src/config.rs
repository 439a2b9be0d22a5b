//! Configuration loading and management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration for the resource server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Required `iss` claim; unset accepts any issuer
    #[serde(default)]
    pub issuer: Option<String>,

    /// SPKI public key PEM written by the authorization server,
    /// relative to the config directory
    #[serde(default = "default_public_key_file")]
    pub public_key_file: String,

    /// Expected `kid` header; unset accepts any key ID
    #[serde(default)]
    pub key_id: Option<String>,

    /// Clock skew tolerated on `exp`, in seconds (default: 0)
    #[serde(default)]
    pub leeway_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issuer: None,
            public_key_file: default_public_key_file(),
            key_id: None,
            leeway_secs: 0,
        }
    }
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
            tracing::info!("Loaded configuration from {:?}", config_file);
            Ok(config)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_file);
            let config = Config::default();

            // Create config directory if it doesn't exist
            std::fs::create_dir_all(config_path)
                .with_context(|| format!("Failed to create config directory: {}", config_path))?;

            // Write default config for reference
            let content = serde_json::to_string_pretty(&config)?;
            std::fs::write(&config_file, content)
                .with_context(|| format!("Failed to write default config: {:?}", config_file))?;
            tracing::info!("Created default config at {:?}", config_file);

            Ok(config)
        }
    }

    pub fn public_key_path(&self, config_path: &str) -> PathBuf {
        Path::new(config_path).join(&self.public_key_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_written_on_first_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();

        let config = Config::load(path).unwrap();
        assert_eq!(config.public_key_file, "jwt_public.pem");
        assert_eq!(config.leeway_secs, 0);
        assert!(dir.path().join("config.json").exists());
        assert_eq!(config.public_key_path(path), dir.path().join("jwt_public.pem"));
    }

    #[test]
    fn test_partial_config() {
        let config: Config =
            serde_json::from_str(r#"{"issuer": "http://localhost:8080", "leeway_secs": 30}"#).unwrap();
        assert_eq!(config.issuer.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.leeway_secs, 30);
        assert_eq!(config.public_key_file, "jwt_public.pem");
    }
}
