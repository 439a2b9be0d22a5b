//! RS256 token signing.

use jsonwebtoken::{Algorithm, EncodingKey, Header};

use crate::claims::Claims;
use crate::error::TokenError;
use crate::keys::KeyPair;

/// Signs claim sets with the authorization server's private key.
pub struct TokenSigner {
    kid: String,
    encoding_key: EncodingKey,
}

impl TokenSigner {
    pub fn new(key_pair: &KeyPair) -> Result<Self, TokenError> {
        Ok(Self {
            kid: key_pair.kid().to_string(),
            encoding_key: key_pair.encoding_key()?,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Produce the compact `header.payload.signature` form.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        jsonwebtoken::encode(&header, claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}
