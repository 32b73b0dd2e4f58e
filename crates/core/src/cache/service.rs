//! Domain-level façade over a cache adapter.
//!
//! The service is the only component that writes cache keys. Adapter
//! failures are logged and degrade to a miss (reads) or a no-op (writes);
//! they never reach the caller.

use std::sync::Arc;

use super::{ACTIVITY_PREFIX, CANCEL_FLAG_KEY, COURSE_PREFIX, CacheAdapter, fingerprint};
use crate::model::CourseSnapshot;

/// Typed cache operations for activity content and course structure.
#[derive(Debug, Clone)]
pub struct CacheService {
    adapter: Arc<dyn CacheAdapter>,
}

/// Adapter key for a locator's cleaned content.
pub fn activity_key(locator: &str) -> String {
    format!("{ACTIVITY_PREFIX}{}", fingerprint(locator))
}

/// Adapter key for a course structure snapshot.
pub fn course_key(course_id: i64) -> String {
    format!("{COURSE_PREFIX}{course_id}")
}

impl CacheService {
    pub fn new(adapter: Arc<dyn CacheAdapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<dyn CacheAdapter> {
        &self.adapter
    }

    /// Store cleaned HTML for a locator. Returns whether the write landed.
    pub async fn save_activity_content(&self, locator: &str, html: &str) -> bool {
        let key = activity_key(locator);
        match self.adapter.set(&key, html).await {
            Ok(()) => {
                tracing::debug!(locator, bytes = html.len(), "cached activity content");
                true
            }
            Err(e) => {
                tracing::warn!(locator, error = %e, "failed to cache activity content");
                false
            }
        }
    }

    pub async fn get_activity_content(&self, locator: &str) -> Option<String> {
        match self.adapter.get(&activity_key(locator)).await {
            Ok(Some(html)) => {
                tracing::debug!(locator, "cache hit");
                Some(html)
            }
            Ok(None) => {
                tracing::debug!(locator, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(locator, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn is_activity_cached(&self, locator: &str) -> bool {
        self.adapter
            .has(&activity_key(locator))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(locator, error = %e, "cache lookup failed, treating as miss");
                false
            })
    }

    /// Drop one locator's content. Used to roll back a cancelled job.
    pub async fn delete_activity_content(&self, locator: &str) -> bool {
        match self.adapter.delete(&activity_key(locator)).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(locator, error = %e, "failed to delete cached activity content");
                false
            }
        }
    }

    pub async fn save_course_structure(&self, course_id: i64, snapshot: &CourseSnapshot) -> bool {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(course_id, error = %e, "failed to serialize course structure");
                return false;
            }
        };

        match self.adapter.set(&course_key(course_id), &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(course_id, error = %e, "failed to cache course structure");
                false
            }
        }
    }

    /// Cached course structure; a corrupt entry reads as a miss.
    pub async fn get_course_structure(&self, course_id: i64) -> Option<CourseSnapshot> {
        let json = match self.adapter.get(&course_key(course_id)).await {
            Ok(json) => json?,
            Err(e) => {
                tracing::warn!(course_id, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        serde_json::from_str(&json)
            .inspect_err(|e| tracing::warn!(course_id, error = %e, "discarding unreadable course structure"))
            .ok()
    }

    /// Remove every entry this cache holds.
    pub async fn clear_all(&self) -> bool {
        match self.adapter.clear(None).await {
            Ok(()) => {
                tracing::info!("cache cleared");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear cache");
                false
            }
        }
    }

    /// Remove a course's structure and the content of every activity it lists.
    pub async fn clear_course(&self, course_id: i64) -> bool {
        let mut ok = true;
        if let Some(snapshot) = self.get_course_structure(course_id).await {
            for url in snapshot.activity_urls() {
                ok &= self.delete_activity_content(&url).await;
            }
        }

        if let Err(e) = self.adapter.delete(&course_key(course_id)).await {
            tracing::warn!(course_id, error = %e, "failed to delete course structure");
            ok = false;
        }
        ok
    }

    /// Request cooperative abort of the running sync job.
    ///
    /// The marker lives in the adapter, so with a shared directory store it
    /// is also visible to other processes.
    pub async fn set_cancel_flag(&self) {
        let stamp = chrono::Utc::now().to_rfc3339();
        if let Err(e) = self.adapter.set(CANCEL_FLAG_KEY, &stamp).await {
            tracing::warn!(error = %e, "failed to set cancel flag");
        }
    }

    pub async fn check_cancel_flag(&self) -> bool {
        self.adapter.has(CANCEL_FLAG_KEY).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read cancel flag");
            false
        })
    }

    pub async fn clear_cancel_flag(&self) {
        if let Err(e) = self.adapter.delete(CANCEL_FLAG_KEY).await {
            tracing::warn!(error = %e, "failed to clear cancel flag");
        }
    }
}
