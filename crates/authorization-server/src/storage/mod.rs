//! Persistent storage for clients, authorization codes, approvals and refresh tokens
//!
//! Every entity lives behind the [`Store`] interface so the backend is
//! swappable. Two backends are provided: [`MemoryStore`] for tests and
//! ephemeral runs, and [`FileStore`] which snapshots each collection to a
//! JSON file so the authorization flow survives restarts.

mod file;
mod memory;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::approvals::Approval;
use crate::clients::ClientRegistration;
use crate::codes::AuthorizationCode;
use crate::tokens::RefreshTokenRecord;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key/value storage for one entity type.
#[async_trait]
pub trait Store<V: Send + 'static>: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError>;

    /// Insert or replace the value stored under `key`.
    async fn put(&self, key: &str, value: V) -> Result<(), StoreError>;

    /// Remove `key`, returning the value that was stored.
    ///
    /// Removal is atomic: when several callers delete the same key
    /// concurrently, exactly one of them receives `Some`.
    async fn delete(&self, key: &str) -> Result<Option<V>, StoreError>;
}

/// The set of stores backing the authorization server.
#[derive(Clone)]
pub struct Storage {
    pub clients: Arc<dyn Store<ClientRegistration>>,
    pub codes: Arc<dyn Store<AuthorizationCode>>,
    pub approvals: Arc<dyn Store<Approval>>,
    pub refresh_tokens: Arc<dyn Store<RefreshTokenRecord>>,
}

impl Storage {
    /// Volatile storage; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            clients: Arc::new(MemoryStore::new()),
            codes: Arc::new(MemoryStore::new()),
            approvals: Arc::new(MemoryStore::new()),
            refresh_tokens: Arc::new(MemoryStore::new()),
        }
    }

    /// File-backed storage rooted at `dir`.
    ///
    /// Clients are provisioned from configuration at every start, so only the
    /// flow state (codes, approvals, refresh tokens) is written to disk.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;

        let storage = Self {
            clients: Arc::new(MemoryStore::new()),
            codes: Arc::new(FileStore::open(dir.join("authorization_codes.json"))?),
            approvals: Arc::new(FileStore::open(dir.join("approvals.json"))?),
            refresh_tokens: Arc::new(FileStore::open(dir.join("refresh_tokens.json"))?),
        };

        tracing::info!("Opened storage in {:?}", dir);
        Ok(storage)
    }
}

// --- Utility Functions ---

/// Generate a cryptographically secure random string
pub fn generate_random_string(len: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hash a code or refresh token for storage (raw values are never stored)
pub fn hash_token(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, result)
}
