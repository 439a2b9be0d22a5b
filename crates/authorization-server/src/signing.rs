//! Signing key loading
//!
//! The key pair is read from the configured PKCS#8 PEM. On first start, when
//! the file does not exist, a 2048-bit key is generated and written next to
//! the configuration together with its public half, so resource servers can
//! be pointed at the public key file.

use std::path::Path;

use anyhow::{Context, Result};
use oauth2_token::KeyPair;
use oauth2_token::keys::DEFAULT_KEY_BITS;

use crate::config::{Config, SigningConfig};

pub fn load_or_generate(config_path: &str, signing: &SigningConfig) -> Result<KeyPair> {
    let private_path = Config::resolve(config_path, &signing.private_key_file);
    let public_path = Config::resolve(config_path, &signing.public_key_file);

    if private_path.exists() {
        let pem = std::fs::read_to_string(&private_path)
            .with_context(|| format!("Failed to read signing key: {:?}", private_path))?;
        let key_pair = KeyPair::from_pem(&signing.key_id, &pem)
            .with_context(|| format!("Failed to load signing key: {:?}", private_path))?;
        tracing::info!("Loaded signing key '{}' from {:?}", signing.key_id, private_path);

        if !public_path.exists() {
            write_file(&public_path, &key_pair.public_key_pem()?)?;
        }
        return Ok(key_pair);
    }

    tracing::warn!(
        "No signing key at {:?}, generating a new {}-bit key pair",
        private_path,
        DEFAULT_KEY_BITS
    );
    let key_pair = KeyPair::generate(&signing.key_id, DEFAULT_KEY_BITS)?;
    write_file(&private_path, &key_pair.private_key_pem()?)?;
    write_file(&public_path, &key_pair.public_key_pem()?)?;
    tracing::info!("Wrote public key for resource servers to {:?}", public_path);

    Ok(key_pair)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PRIVATE_KEY: &str = include_str!("../../oauth2-token/tests/fixtures/private_key.pem");

    #[test]
    fn test_existing_key_is_loaded_and_public_half_written() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("jwt_private.pem"), PRIVATE_KEY).unwrap();

        let path = dir.path().to_str().unwrap();
        let key_pair = load_or_generate(path, &SigningConfig::default()).unwrap();
        assert_eq!(key_pair.kid(), "oauth2-jwt");

        let public_pem = std::fs::read_to_string(dir.path().join("jwt_public.pem")).unwrap();
        assert_eq!(public_pem, key_pair.public_key_pem().unwrap());
    }

    #[test]
    fn test_unreadable_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("jwt_private.pem"), "not a key").unwrap();

        let path = dir.path().to_str().unwrap();
        assert!(load_or_generate(path, &SigningConfig::default()).is_err());
    }
}
