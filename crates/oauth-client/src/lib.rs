//! Demo OAuth2 client for the authorization code flow

pub mod client;
pub mod error;

pub use client::{ClientConfig, OAuthClient, ResourceResponse, TokenResponse, generate_state};
pub use error::ClientError;
