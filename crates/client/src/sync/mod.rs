//! Batch synchronization of activity content.
//!
//! ### Job lifecycle
//!
//! 1. Clear any stale cancellation marker.
//! 2. Partition locators into cached (no network) and uncached.
//! 3. Fetch uncached locators in fixed-size batches. Items in a batch run
//!    concurrently on the calling task; the next batch starts only when the
//!    whole previous one has finished.
//! 4. Before each batch, stop if the job's token or the cache marker says so.
//! 5. After each batch, report progress.
//! 6. Clear the marker and return stats plus every `(locator, content)` pair.
//!
//! A failing item is recorded and the job moves on. Only cancellation, or a
//! missing credential detected before the first batch, ends a job early.

pub mod progress;
pub mod types;

pub use progress::ProgressTracker;
pub use types::{CancelPurge, ItemStatus, SyncItem, SyncProgress, SyncResult, SyncStats};

use std::sync::Arc;

use futures_util::future::join_all;
use quire_core::{AppConfig, CacheService, CourseSnapshot, CourseSummary, Error};
use tokio_util::sync::CancellationToken;

use crate::clean::Cleaner;
use crate::origin::{Credential, OriginClient};
use crate::retry::{RetryPolicy, retry};

/// Result of a whole-course sync.
#[derive(Debug, Clone)]
pub struct CourseSync {
    pub course: CourseSnapshot,
    pub result: SyncResult,
    /// Cache entries removed because the job was cancelled.
    pub purged: usize,
}

/// Fetches, cleans and caches activity content on behalf of readers.
pub struct SyncOrchestrator {
    cache: CacheService,
    origin: Arc<dyn OriginClient>,
    cleaner: Arc<Cleaner>,
    retry: RetryPolicy,
    batch_size: usize,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    pub fn new(
        cache: CacheService, origin: Arc<dyn OriginClient>, cleaner: Arc<Cleaner>, retry: RetryPolicy,
        batch_size: usize,
    ) -> Self {
        Self { cache, origin, cleaner, retry, batch_size: batch_size.max(1) }
    }

    /// Wire an orchestrator from configuration.
    pub fn from_config(
        config: &AppConfig, cache: CacheService, origin: Arc<dyn OriginClient>, cleaner: Arc<Cleaner>,
    ) -> Self {
        Self::new(cache, origin, cleaner, RetryPolicy::from_config(config), config.batch_size)
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Request cooperative abort of the running job at its next batch boundary.
    pub async fn cancel(&self) {
        self.cache.set_cancel_flag().await;
    }

    pub async fn is_cached(&self, locator: &str) -> bool {
        self.cache.is_activity_cached(locator).await
    }

    pub async fn clear_cache(&self) -> bool {
        self.cache.clear_all().await
    }

    /// Cleaned content for one locator, from cache or origin.
    pub async fn get_or_fetch(&self, locator: &str, credential: Option<&Credential>) -> Result<String, Error> {
        self.get_or_fetch_with_status(locator, credential)
            .await
            .map(|(html, _)| html)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch), also reporting whether the
    /// cache answered.
    pub async fn get_or_fetch_with_status(
        &self, locator: &str, credential: Option<&Credential>,
    ) -> Result<(String, ItemStatus), Error> {
        if locator.trim().is_empty() {
            return Err(Error::InvalidLocator("locator cannot be empty".into()));
        }

        if let Some(html) = self.cache.get_activity_content(locator).await {
            return Ok((html, ItemStatus::Cached));
        }

        let credential = credential.ok_or_else(missing_credential)?;
        let html = self.fetch_clean(locator, credential).await?;
        self.cache.save_activity_content(locator, &html).await;
        Ok((html, ItemStatus::Fetched))
    }

    /// Origin fetch with retry, then clean.
    async fn fetch_clean(&self, locator: &str, credential: &Credential) -> Result<String, Error> {
        let raw = retry(&self.retry, locator, || self.origin.fetch_content(locator, credential)).await?;
        Ok(self.cleaner.clean_with_token(&raw, credential.expose()))
    }

    /// Bring every locator into the cache and return their content.
    ///
    /// `on_progress` is called once after partitioning and once after every
    /// batch. Cancelling `cancel` (or setting the cache marker) stops the job
    /// before the next batch; results gathered so far are kept.
    pub async fn sync_many<F>(
        &self, locators: &[String], credential: Option<&Credential>, cancel: &CancellationToken, mut on_progress: F,
    ) -> Result<SyncResult, Error>
    where
        F: FnMut(SyncProgress) + Send,
    {
        self.cache.clear_cancel_flag().await;

        let mut items = Vec::with_capacity(locators.len());
        let mut uncached = Vec::new();
        for locator in locators {
            match self.cache.get_activity_content(locator).await {
                Some(html) => items.push(SyncItem::cached(locator.as_str(), html)),
                None => uncached.push(locator.as_str()),
            }
        }

        let cached = items.len();
        let credential = match credential {
            Some(credential) => Some(credential),
            None if uncached.is_empty() => None,
            None => {
                self.cache.clear_cancel_flag().await;
                return Err(missing_credential());
            }
        };

        tracing::info!(
            total = locators.len(),
            cached,
            uncached = uncached.len(),
            batch_size = self.batch_size,
            "sync job started"
        );

        let mut stats = SyncStats { total: cached, success: cached, failed: 0, cached };
        let mut tracker = ProgressTracker::new(locators.len(), cached);
        on_progress(tracker.snapshot());

        let mut cancelled = false;
        for (index, batch) in uncached.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() || self.cache.check_cancel_flag().await {
                tracing::info!(batch = index, attempted = stats.total, "sync job cancelled");
                cancelled = true;
                break;
            }

            let Some(credential) = credential else { break };
            let outcomes = join_all(batch.iter().map(|locator| self.sync_one(locator, credential))).await;

            for item in outcomes {
                stats.total += 1;
                match item.status {
                    ItemStatus::Failed => stats.failed += 1,
                    _ => stats.success += 1,
                }
                items.push(item);
            }

            let progress = tracker.advance(batch.len());
            tracing::info!(
                batch = index,
                current = progress.current,
                total = progress.total,
                failed = stats.failed,
                "sync batch done"
            );
            on_progress(progress);
        }

        self.cache.clear_cancel_flag().await;
        tracing::info!(
            cancelled,
            total = stats.total,
            success = stats.success,
            failed = stats.failed,
            cached = stats.cached,
            "sync job finished"
        );

        Ok(SyncResult { success: !cancelled, cancelled, stats, items })
    }

    async fn sync_one(&self, locator: &str, credential: &Credential) -> SyncItem {
        match self.fetch_clean(locator, credential).await {
            Ok(html) => {
                self.cache.save_activity_content(locator, &html).await;
                SyncItem::fetched(locator, html)
            }
            Err(e) => {
                tracing::warn!(locator, error = %e, "sync item failed");
                SyncItem::failed(locator, e.to_string())
            }
        }
    }

    /// Course structure from cache, or from the origin when missing or when
    /// `refresh` is set. A refetched snapshot replaces the cached one.
    pub async fn course_structure(
        &self, course_id: i64, credential: Option<&Credential>, refresh: bool,
    ) -> Result<CourseSnapshot, Error> {
        if !refresh && let Some(snapshot) = self.cache.get_course_structure(course_id).await {
            return Ok(snapshot);
        }

        let credential = credential.ok_or_else(missing_credential)?;
        let label = format!("course:{course_id}");
        let snapshot = retry(&self.retry, &label, || self.origin.list_course_structure(course_id, credential)).await?;
        self.cache.save_course_structure(course_id, &snapshot).await;
        Ok(snapshot)
    }

    pub async fn enrolled_courses(&self, credential: &Credential) -> Result<Vec<CourseSummary>, Error> {
        retry(&self.retry, "enrolled_courses", || self.origin.list_enrolled_courses(credential)).await
    }

    /// Sync every activity of a course, applying `purge` if the job is cancelled.
    pub async fn sync_course<F>(
        &self, course_id: i64, credential: Option<&Credential>, cancel: &CancellationToken, purge: CancelPurge,
        on_progress: F,
    ) -> Result<CourseSync, Error>
    where
        F: FnMut(SyncProgress) + Send,
    {
        let course = self.course_structure(course_id, credential, false).await?;
        let locators = course.activity_urls();
        let result = self.sync_many(&locators, credential, cancel, on_progress).await?;

        let purged = if result.cancelled { self.purge(course_id, &result, purge).await } else { 0 };
        Ok(CourseSync { course, result, purged })
    }

    /// Roll back a cancelled course job. Returns how many entries went away.
    pub async fn purge(&self, course_id: i64, result: &SyncResult, purge: CancelPurge) -> usize {
        match purge {
            CancelPurge::KeepPartial => 0,
            CancelPurge::PurgeJob => {
                let mut purged = 0;
                for locator in result.written() {
                    if self.cache.delete_activity_content(locator).await {
                        purged += 1;
                    }
                }
                tracing::info!(course_id, purged, "purged content written by cancelled job");
                purged
            }
            CancelPurge::PurgeCourse => {
                let listed = self
                    .cache
                    .get_course_structure(course_id)
                    .await
                    .map(|course| course.activity_urls().len())
                    .unwrap_or(0);
                self.cache.clear_course(course_id).await;
                tracing::info!(course_id, listed, "purged course after cancelled job");
                listed + 1
            }
        }
    }
}

fn missing_credential() -> Error {
    Error::MissingCredential("an LMS token is required to fetch uncached content".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::CleanRules;
    use crate::testing::FakeOrigin;
    use quire_core::MemoryAdapter;
    use std::sync::Mutex;
    use std::time::Duration;

    fn locators(n: usize) -> Vec<String> {
        (1..=n)
            .map(|i| format!("https://lms.example.edu/mod/page/view.php?id={i}"))
            .collect()
    }

    fn orchestrator(origin: Arc<FakeOrigin>, batch_size: usize) -> SyncOrchestrator {
        let cache = CacheService::new(Arc::new(MemoryAdapter::new()));
        let cleaner = Arc::new(Cleaner::new(&CleanRules::default()).unwrap());
        SyncOrchestrator::new(cache, origin, cleaner, RetryPolicy::none(), batch_size)
    }

    fn credential() -> Credential {
        Credential::new("token").unwrap()
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_cleaned_content() {
        let origin = Arc::new(FakeOrigin::new());
        let sync = orchestrator(origin.clone(), 4);
        let locator = &locators(1)[0];

        let (html, status) = sync.get_or_fetch_with_status(locator, Some(&credential())).await.unwrap();
        assert_eq!(status, ItemStatus::Fetched);
        assert!(!html.contains("<script"));
        assert!(sync.is_cached(locator).await);

        let (again, status) = sync.get_or_fetch_with_status(locator, None).await.unwrap();
        assert_eq!(status, ItemStatus::Cached);
        assert_eq!(again, html);
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_without_credential() {
        let sync = orchestrator(Arc::new(FakeOrigin::new()), 4);
        let err = sync.get_or_fetch(&locators(1)[0], None).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_get_or_fetch_surfaces_origin_error() {
        let origin = Arc::new(FakeOrigin::new().failing(["https://lms.example.edu/mod/page/view.php?id=1"]));
        let sync = orchestrator(origin, 4);
        let err = sync.get_or_fetch(&locators(1)[0], Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cached_items_skip_network() {
        let origin = Arc::new(FakeOrigin::new());
        let sync = orchestrator(origin.clone(), 4);
        let all = locators(10);
        for locator in &all[..3] {
            sync.cache().save_activity_content(locator, "<p>cached</p>").await;
        }

        let batches = Mutex::new(Vec::new());
        let result = sync
            .sync_many(&all, Some(&credential()), &CancellationToken::new(), |p| {
                batches.lock().unwrap().push(p.current)
            })
            .await
            .unwrap();

        assert_eq!(result.stats, SyncStats { total: 10, success: 10, failed: 0, cached: 3 });
        assert_eq!(origin.calls(), 7);
        assert_eq!(*batches.lock().unwrap(), vec![3, 7, 10]);
        assert!(result.success);
        assert!(!result.cancelled);
        assert_eq!(result.items.len(), 10);
    }

    #[tokio::test]
    async fn test_failures_are_per_item() {
        let origin = Arc::new(FakeOrigin::new().failing(["https://lms.example.edu/mod/page/view.php?id=2"]));
        let sync = orchestrator(origin, 2);

        let result = sync
            .sync_many(&locators(5), Some(&credential()), &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(result.stats.total, 5);
        assert_eq!(result.stats.success + result.stats.failed, 5);
        assert_eq!(result.stats.failed, 1);
        let failed: Vec<_> = result.items.iter().filter(|i| i.status == ItemStatus::Failed).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].error.as_deref().unwrap().starts_with("NOT_FOUND"));
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_missing_credential_aborts_before_batches() {
        let origin = Arc::new(FakeOrigin::new());
        let sync = orchestrator(origin.clone(), 4);

        let err = sync
            .sync_many(&locators(3), None, &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
        assert_eq!(origin.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_cached_needs_no_credential() {
        let sync = orchestrator(Arc::new(FakeOrigin::new()), 4);
        let all = locators(2);
        for locator in &all {
            sync.cache().save_activity_content(locator, "<p>x</p>").await;
        }

        let result = sync.sync_many(&all, None, &CancellationToken::new(), |_| {}).await.unwrap();
        assert_eq!(result.stats.cached, 2);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_cancel_token_stops_at_batch_boundary() {
        let origin = Arc::new(FakeOrigin::new());
        let sync = orchestrator(origin.clone(), 4);
        let cancel = CancellationToken::new();

        let result = sync
            .sync_many(&locators(12), Some(&credential()), &cancel, |p| {
                if p.current > 0 {
                    cancel.cancel();
                }
            })
            .await
            .unwrap();

        assert!(result.cancelled);
        assert!(!result.success);
        assert_eq!(result.stats.total, 4);
        assert_eq!(origin.calls(), 4);
        assert_eq!(result.items.len(), 4);
    }

    #[tokio::test]
    async fn test_stale_cancel_flag_is_cleared_at_start() {
        let origin = Arc::new(FakeOrigin::new());
        let sync = orchestrator(origin.clone(), 2);

        sync.cancel().await;
        let result = sync
            .sync_many(&locators(4), Some(&credential()), &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert!(!result.cancelled);
        assert_eq!(origin.calls(), 4);
        assert!(!sync.cache().check_cancel_flag().await);
    }

    #[tokio::test]
    async fn test_cancel_flag_stops_running_job() {
        let origin = Arc::new(FakeOrigin::new().with_delay(Duration::from_millis(100)));
        let sync = Arc::new(orchestrator(origin.clone(), 2));

        let job = {
            let sync = sync.clone();
            tokio::spawn(async move {
                sync.sync_many(&locators(6), Some(&credential()), &CancellationToken::new(), |_| {})
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(150)).await;
        sync.cancel().await;

        let result = job.await.unwrap().unwrap();
        assert!(result.cancelled);
        assert_eq!(result.stats.total, 4);
        assert_eq!(origin.calls(), 4);
        assert!(!sync.cache().check_cancel_flag().await);
    }

    #[tokio::test]
    async fn test_sync_course_purges_job_content_on_cancel() {
        let all = locators(8);
        let origin = Arc::new(FakeOrigin::new().with_course(5, "Chemistry", &all));
        let sync = orchestrator(origin.clone(), 4);
        sync.cache().save_activity_content(&all[7], "<p>from earlier</p>").await;
        let cancel = CancellationToken::new();

        let outcome = sync
            .sync_course(5, Some(&credential()), &cancel, CancelPurge::PurgeJob, |p| {
                if p.current > 1 {
                    cancel.cancel();
                }
            })
            .await
            .unwrap();

        assert!(outcome.result.cancelled);
        assert_eq!(outcome.purged, 4);
        assert_eq!(outcome.course.title, "Chemistry");
        for locator in &all[..4] {
            assert!(!sync.is_cached(locator).await);
        }
        assert!(sync.is_cached(&all[7]).await);
        assert!(sync.cache().get_course_structure(5).await.is_some());
    }

    #[tokio::test]
    async fn test_sync_course_purge_course_clears_everything() {
        let all = locators(8);
        let origin = Arc::new(FakeOrigin::new().with_course(5, "Chemistry", &all));
        let sync = orchestrator(origin, 4);
        sync.cache().save_activity_content(&all[7], "<p>from earlier</p>").await;
        let cancel = CancellationToken::new();

        let outcome = sync
            .sync_course(5, Some(&credential()), &cancel, CancelPurge::PurgeCourse, |p| {
                if p.current > 1 {
                    cancel.cancel();
                }
            })
            .await
            .unwrap();

        assert!(outcome.result.cancelled);
        assert!(!sync.is_cached(&all[0]).await);
        assert!(!sync.is_cached(&all[7]).await);
        assert!(sync.cache().get_course_structure(5).await.is_none());
    }

    #[tokio::test]
    async fn test_sync_course_keep_partial() {
        let all = locators(8);
        let origin = Arc::new(FakeOrigin::new().with_course(5, "Chemistry", &all));
        let sync = orchestrator(origin, 4);
        let cancel = CancellationToken::new();

        let outcome = sync
            .sync_course(5, Some(&credential()), &cancel, CancelPurge::KeepPartial, |p| {
                if p.current > 0 {
                    cancel.cancel();
                }
            })
            .await
            .unwrap();

        assert_eq!(outcome.purged, 0);
        assert!(sync.is_cached(&all[0]).await);
    }

    #[tokio::test]
    async fn test_course_structure_cached_until_refresh() {
        let origin = Arc::new(FakeOrigin::new().with_course(9, "Art", &locators(2)));
        let sync = orchestrator(origin.clone(), 4);

        sync.course_structure(9, Some(&credential()), false).await.unwrap();
        sync.course_structure(9, None, false).await.unwrap();
        assert_eq!(origin.structure_calls(), 1);

        sync.course_structure(9, Some(&credential()), true).await.unwrap();
        assert_eq!(origin.structure_calls(), 2);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let sync = orchestrator(Arc::new(FakeOrigin::new()), 4);
        let locator = &locators(1)[0];
        sync.get_or_fetch(locator, Some(&credential())).await.unwrap();
        assert!(sync.clear_cache().await);
        assert!(!sync.is_cached(locator).await);
    }
}
