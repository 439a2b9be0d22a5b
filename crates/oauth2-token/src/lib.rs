//! oauth2-token: Shared token primitives for the authorization and resource servers.
//!
//! This crate provides:
//! - Scope sets (space-delimited on the wire, ordered in memory)
//! - The JWT claim set carried by access tokens
//! - RSA key pair loading, generation and JWK export
//! - RS256 signing and local verification (signature + expiry)

pub mod claims;
pub mod error;
pub mod keys;
pub mod scope;
pub mod signer;
pub mod verifier;

pub use claims::Claims;
pub use error::TokenError;
pub use keys::{Jwk, JwkSet, KeyPair, PublicKey};
pub use scope::Scopes;
pub use signer::TokenSigner;
pub use verifier::{TokenVerifier, VerifiedToken};
