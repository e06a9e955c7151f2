use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{KvStore, StoreError};

struct ValueSlot {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    values: HashMap<String, ValueSlot>,
    lists: HashMap<String, Vec<String>>,
}

/// In-process store used by tests and `STORE_URL=memory://` deployments.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unreachable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.lock()?;
        let expired = matches!(
            inner.values.get(key),
            Some(ValueSlot { expires_at: Some(deadline), .. }) if *deadline <= Instant::now()
        );
        if expired {
            inner.values.remove(key);
            return Ok(None);
        }
        Ok(inner.values.get(key).map(|slot| slot.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.values.insert(
            key.to_string(),
            ValueSlot {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let items = inner.lists.entry(key.to_string()).or_default();
        items.insert(0, value.to_string());
        items.truncate(cap);
        Ok(())
    }

    async fn range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .lists
            .get(key)
            .map(|items| items.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
