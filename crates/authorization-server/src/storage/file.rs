//! JSON-file backed store.
//!
//! Entries are held in memory and the whole collection is rewritten after
//! every mutation (write to a temp file, then rename). Collections here are
//! small and short-lived, so a full snapshot is simpler than a log.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::{Store, StoreError};

pub struct FileStore<V> {
    path: PathBuf,
    entries: DashMap<String, V>,
    /// Serializes snapshot writes so the file always reflects the latest state
    write_lock: Mutex<()>,
}

impl<V> FileStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = DashMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let stored: BTreeMap<String, V> = serde_json::from_str(&content)?;
            for (key, value) in stored {
                entries.insert(key, value);
            }
            tracing::info!("Loaded {} entries from {:?}", entries.len(), path);
        }

        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let snapshot: BTreeMap<String, V> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let content = serde_json::to_vec_pretty(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl<V> Store<V> for FileStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: V) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.entries.insert(key.to_string(), value);
        self.persist().await
    }

    async fn delete(&self, key: &str) -> Result<Option<V>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let removed = self.entries.remove(key).map(|(_, value)| value);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codes.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.put("kept", "one".to_string()).await.unwrap();
            store.put("dropped", "two".to_string()).await.unwrap();
            store.delete("dropped").await.unwrap();
        }

        let reopened: FileStore<String> = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("kept").await.unwrap(), Some("one".to_string()));
        assert_eq!(reopened.get("dropped").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store: FileStore<String> = FileStore::open(dir.path().join("none.json")).unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
        assert!(!dir.path().join("none.json").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let result: Result<FileStore<String>, _> = FileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
