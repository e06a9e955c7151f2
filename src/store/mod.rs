pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("store unreachable: {0}")]
    Unreachable(String),
}

/// Key-value collaborator contract. Values are opaque strings (JSON at the
/// call sites); keys are namespaced with a `prefix:` convention. List
/// mutation is a single atomic append-and-trim per call, mirroring the
/// LPUSH+LTRIM pair the history list needs.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`. `ttl` is advisory: stores with native
    /// expiry honor it, others rely on expiry carried inside the value.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Inserts `value` at the head of the list at `key` and trims the tail
    /// so the list never exceeds `cap` entries.
    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), StoreError>;

    /// Returns up to `limit` list entries, head (newest) first.
    async fn range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
