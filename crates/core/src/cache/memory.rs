//! Process-memory cache adapter.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheAdapter;
use crate::Error;

#[derive(Debug)]
struct Entry {
    value: String,
    stored_at: Instant,
}

/// Ephemeral adapter backed by a single map.
///
/// Safe for serverless deployments: nothing outlives the process. An optional
/// TTL makes entries read as absent once they are older than the limit.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter whose entries expire `ttl` after being written.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl: Some(ttl) }
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() > ttl)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheAdapter for MemoryAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !self.is_expired(entry) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| self.is_expired(entry)) {
            entries.remove(key);
            tracing::debug!(key, "evicted expired entry");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value: value.to_string(), stored_at: Instant::now() });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool, Error> {
        Ok(self.get(key).await?.is_some())
    }

    async fn clear(&self, prefix: Option<&str>) -> Result<(), Error> {
        let mut entries = self.entries.write().await;
        match prefix {
            Some(prefix) => entries.retain(|key, _| !key.starts_with(prefix)),
            None => entries.clear(),
        }
        Ok(())
    }
}
