use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use super::{KvStore, StoreError};

/// Durable store backed by a local directory. Each key maps to one JSON
/// file; the `prefix:` key convention becomes a subdirectory so entries of
/// one namespace stay together on disk.
#[derive(Debug)]
pub struct FileStore {
    base_dir: PathBuf,
    // Serializes list read-modify-write so concurrent appends for the same
    // user cannot lose entries.
    list_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            list_lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/').replace(':', "/");
        self.base_dir.join(format!("{normalized}.json"))
    }

    async fn read_list(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.read_value(key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn read_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.resolve_path(key);
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_value(&self, key: &str, raw: &str) -> Result<(), StoreError> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read_value(key).await
    }

    async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> Result<(), StoreError> {
        // No native eviction; cache entries carry their own expiry and are
        // rejected on read once stale.
        self.write_value(key, value).await
    }

    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), StoreError> {
        let _guard = self.list_lock.lock().await;
        let mut items = self.read_list(key).await?;
        items.insert(0, value.to_string());
        items.truncate(cap);
        self.write_value(key, &serde_json::to_string(&items)?).await
    }

    async fn range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut items = self.read_list(key).await?;
        items.truncate(limit);
        Ok(items)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }
}
