//! Server-side cache tier.
//!
//! This module provides a uniform key/value contract with two backends and
//! the service that sits on top of them:
//!
//! - `MemoryAdapter`: a single process-local map, lost on exit
//! - `DirectoryAdapter`: one file per entry under a root directory
//! - `CacheService`: key derivation, typed entities, failure degradation
//!
//! Keys are namespaced by entity class: `activity:<fingerprint>` and
//! `course:<id>`. Values are always strings (HTML or JSON).

pub mod directory;
pub mod hash;
pub mod memory;
pub mod service;

pub use crate::Error;

pub use directory::DirectoryAdapter;
pub use hash::fingerprint;
pub use memory::MemoryAdapter;
pub use service::CacheService;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, CacheBackend};

/// Key prefix of cleaned activity content.
pub const ACTIVITY_PREFIX: &str = "activity:";

/// Key prefix of course structure snapshots.
pub const COURSE_PREFIX: &str = "course:";

/// Key of the process-wide cancellation marker.
pub const CANCEL_FLAG_KEY: &str = "sync_cancelled";

/// Key/value storage contract shared by all cache backends.
///
/// A missing key is never an error. `Err` is reserved for genuine I/O
/// failures, which callers treat as a miss.
#[async_trait]
pub trait CacheAdapter: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    async fn delete(&self, key: &str) -> Result<(), Error>;

    async fn has(&self, key: &str) -> Result<bool, Error>;

    /// Remove every entry whose key starts with `prefix`, or everything when `None`.
    async fn clear(&self, prefix: Option<&str>) -> Result<(), Error>;
}

/// Build the adapter selected by configuration.
pub async fn open_adapter(config: &AppConfig) -> Result<Arc<dyn CacheAdapter>, Error> {
    match config.cache_backend {
        CacheBackend::Memory => {
            let ttl = config.cache_ttl();
            tracing::info!(ttl_secs = ?config.cache_ttl_secs, "using in-memory cache adapter");
            Ok(Arc::new(ttl.map_or_else(MemoryAdapter::new, MemoryAdapter::with_ttl)))
        }
        CacheBackend::Directory => {
            tracing::info!(dir = %config.cache_dir.display(), "using directory cache adapter");
            Ok(Arc::new(DirectoryAdapter::open(&config.cache_dir).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_adapter() {
        let config = AppConfig { cache_backend: CacheBackend::Memory, ..Default::default() };
        let adapter = open_adapter(&config).await.unwrap();
        adapter.set("course:1", "{}").await.unwrap();
        assert!(adapter.has("course:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_memory_adapter_applies_ttl() {
        let config = AppConfig { cache_backend: CacheBackend::Memory, cache_ttl_secs: Some(1), ..Default::default() };
        let adapter = open_adapter(&config).await.unwrap();
        adapter.set("activity:abc", "<p>x</p>").await.unwrap();
        assert!(adapter.has("activity:abc").await.unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(adapter.get("activity:abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_directory_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AppConfig { cache_backend: CacheBackend::Directory, cache_dir: dir.path().join("cache"), ..Default::default() };
        let adapter = open_adapter(&config).await.unwrap();
        adapter.set("course:1", "{}").await.unwrap();
        assert!(dir.path().join("cache").join("courses").join("1.json").exists());
    }
}
