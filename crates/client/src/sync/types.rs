//! Sync job results and progress snapshots.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where an item's content came from, or that it has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Already in the cache; no origin call was made.
    Cached,
    /// Fetched from the origin, cleaned and cached by this job.
    Fetched,
    /// The origin call failed.
    Failed,
}

/// Outcome for one locator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SyncItem {
    pub locator: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncItem {
    pub fn cached(locator: impl Into<String>, content: String) -> Self {
        Self { locator: locator.into(), status: ItemStatus::Cached, content: Some(content), error: None }
    }

    pub fn fetched(locator: impl Into<String>, content: String) -> Self {
        Self { locator: locator.into(), status: ItemStatus::Fetched, content: Some(content), error: None }
    }

    pub fn failed(locator: impl Into<String>, error: String) -> Self {
        Self { locator: locator.into(), status: ItemStatus::Failed, content: None, error: Some(error) }
    }
}

/// Job counters.
///
/// `total` counts cached items plus every uncached item a batch attempted,
/// so after a cancellation it is smaller than the input length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub cached: usize,
}

/// Final result of a sync job. Never modified after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SyncResult {
    /// The job ran to completion. Per-item failures are in `stats.failed`.
    pub success: bool,
    pub cancelled: bool,
    pub stats: SyncStats,
    pub items: Vec<SyncItem>,
}

impl SyncResult {
    /// Items that have content, in job order.
    pub fn contents(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items
            .iter()
            .filter_map(|item| item.content.as_deref().map(|content| (item.locator.as_str(), content)))
    }

    /// Locators this job fetched from the origin and wrote to the cache.
    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|item| item.status == ItemStatus::Fetched)
            .map(|item| item.locator.as_str())
    }
}

/// Progress after a batch. Recomputed each time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_items_per_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
}

/// What a cancelled course sync leaves behind in the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CancelPurge {
    /// Keep everything, including content this job wrote.
    KeepPartial,
    /// Delete only the content this job fetched.
    #[default]
    PurgeJob,
    /// Delete the course structure and all content it lists.
    PurgeCourse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_serializes_camel_case() {
        let progress = SyncProgress {
            current: 4,
            total: 10,
            percentage: 40.0,
            speed_items_per_sec: Some(2.5),
            eta_seconds: Some(3),
        };
        let json = serde_json::to_value(progress).unwrap();
        assert_eq!(json["speedItemsPerSec"], 2.5);
        assert_eq!(json["etaSeconds"], 3);
    }

    #[test]
    fn test_result_accessors() {
        let result = SyncResult {
            success: true,
            cancelled: false,
            stats: SyncStats { total: 3, success: 2, failed: 1, cached: 1 },
            items: vec![
                SyncItem::cached("a", "<p>a</p>".into()),
                SyncItem::fetched("b", "<p>b</p>".into()),
                SyncItem::failed("c", "NOT_FOUND: c".into()),
            ],
        };
        assert_eq!(result.contents().count(), 2);
        assert_eq!(result.written().collect::<Vec<_>>(), vec!["b"]);

        let json = serde_json::to_value(&result.items[2]).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn test_cancel_purge_default() {
        assert_eq!(CancelPurge::default(), CancelPurge::PurgeJob);
        let parsed: CancelPurge = serde_json::from_str("\"purge_course\"").unwrap();
        assert_eq!(parsed, CancelPurge::PurgeCourse);
    }
}
