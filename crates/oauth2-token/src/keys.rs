//! RSA key handling for RS256 tokens.
//!
//! The authorization server holds a [`KeyPair`] (private key signs); resource
//! servers only ever see the [`PublicKey`] (public key verifies). Keys are
//! exchanged as PEM: PKCS#8 for the private half, SPKI for the public half.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Key size used when no key is configured and one has to be generated.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// JWK (JSON Web Key) representation of an RS256 public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub kid: String,
    pub alg: String,
    /// RSA modulus (base64url)
    pub n: String,
    /// RSA exponent (base64url)
    pub e: String,
}

/// JWKS document served at `/.well-known/jwks.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Private/public RSA key pair identified by a key ID.
#[derive(Clone)]
pub struct KeyPair {
    kid: String,
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").field("kid", &self.kid).finish()
    }
}

impl KeyPair {
    /// Generate a fresh key pair.
    pub fn generate(kid: &str, bits: usize) -> Result<Self, TokenError> {
        let mut rng = rsa::rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| TokenError::Key(format!("Failed to generate RSA key: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);

        tracing::info!("Generated {}-bit RSA key pair '{}'", bits, kid);
        Ok(Self {
            kid: kid.to_string(),
            private_key,
            public_key,
        })
    }

    /// Load a private key from PEM. Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and
    /// PKCS#1 (`BEGIN RSA PRIVATE KEY`).
    pub fn from_pem(kid: &str, pem: &str) -> Result<Self, TokenError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| TokenError::Key(format!("Failed to parse private key PEM: {e}")))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            kid: kid.to_string(),
            private_key,
            public_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn private_key_pem(&self) -> Result<String, TokenError> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.to_string())
            .map_err(|e| TokenError::Key(format!("Failed to export private key: {e}")))
    }

    pub fn public_key_pem(&self) -> Result<String, TokenError> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TokenError::Key(format!("Failed to export public key: {e}")))
    }

    pub(crate) fn encoding_key(&self) -> Result<EncodingKey, TokenError> {
        let pem = self.private_key_pem()?;
        EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| TokenError::Key(format!("Failed to build signing key: {e}")))
    }

    /// The verifying half, tagged with this pair's key ID.
    pub fn public_key(&self) -> Result<PublicKey, TokenError> {
        PublicKey::new(self.public_key.clone(), Some(self.kid.clone()))
    }
}

/// RSA public key used for local token verification.
#[derive(Clone)]
pub struct PublicKey {
    kid: Option<String>,
    key: RsaPublicKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey").field("kid", &self.kid).finish()
    }
}

impl PublicKey {
    fn new(key: RsaPublicKey, kid: Option<String>) -> Result<Self, TokenError> {
        let pem = key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TokenError::Key(format!("Failed to export public key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| TokenError::Key(format!("Failed to build verification key: {e}")))?;
        Ok(Self {
            kid,
            key,
            decoding_key,
        })
    }

    /// Load an SPKI (`BEGIN PUBLIC KEY`) PEM.
    ///
    /// When `kid` is given, tokens whose header names a different key ID are
    /// rejected before the signature is checked.
    pub fn from_pem(pem: &str, kid: Option<String>) -> Result<Self, TokenError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| TokenError::Key(format!("Failed to parse public key PEM: {e}")))?;
        Self::new(key, kid)
    }

    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    pub fn to_pem(&self) -> Result<String, TokenError> {
        self.key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| TokenError::Key(format!("Failed to export public key: {e}")))
    }

    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            key_use: "sig".to_string(),
            kid: self.kid.clone().unwrap_or_default(),
            alg: "RS256".to_string(),
            n: URL_SAFE_NO_PAD.encode(self.key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(self.key.e().to_bytes_be()),
        }
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}
