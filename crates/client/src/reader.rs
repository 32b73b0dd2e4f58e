//! The requesting client's view of content.
//!
//! Reads consult the durable client store first and fall back to the sync
//! orchestrator, persisting whatever comes back. Store failures are logged and
//! read as misses.

use std::sync::Arc;

use quire_core::{ClientStore, CourseSnapshot, Error};
use tokio_util::sync::CancellationToken;

use crate::origin::Credential;
use crate::sync::{CancelPurge, CourseSync, SyncOrchestrator, SyncProgress, SyncResult};

/// Which tier answered a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// The durable client store.
    Local,
    /// The server cache or the origin, through the orchestrator.
    Remote,
}

#[derive(Debug)]
pub struct Reader {
    store: ClientStore,
    orchestrator: Arc<SyncOrchestrator>,
    credential: Option<Credential>,
}

impl Reader {
    pub fn new(store: ClientStore, orchestrator: Arc<SyncOrchestrator>, credential: Option<Credential>) -> Self {
        Self { store, orchestrator, credential }
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    async fn stored(&self, locator: &str) -> Option<String> {
        match self.store.get_activity(locator).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(locator, error = %e, "client store read failed");
                None
            }
        }
    }

    async fn persist(&self, locator: &str, html: &str) {
        if let Err(e) = self.store.save_activity(locator, html).await {
            tracing::warn!(locator, error = %e, "client store write failed");
        }
    }

    /// Content for an explicitly opened activity.
    pub async fn read(&self, locator: &str) -> Result<(String, ReadSource), Error> {
        if let Some(html) = self.stored(locator).await {
            tracing::debug!(locator, "client store hit");
            return Ok((html, ReadSource::Local));
        }

        let html = self
            .orchestrator
            .get_or_fetch(locator, self.credential.as_ref())
            .await?;
        self.persist(locator, &html).await;
        Ok((html, ReadSource::Remote))
    }

    pub async fn is_stored(&self, locator: &str) -> bool {
        self.store.has_activity(locator).await.unwrap_or_else(|e| {
            tracing::warn!(locator, error = %e, "client store lookup failed");
            false
        })
    }

    /// Course structure, from the client store unless `refresh` is set.
    pub async fn read_course(&self, course_id: i64, refresh: bool) -> Result<CourseSnapshot, Error> {
        if !refresh {
            match self.store.get_course(course_id).await {
                Ok(Some(course)) => return Ok(course),
                Ok(None) => {}
                Err(e) => tracing::warn!(course_id, error = %e, "client store read failed"),
            }
        }

        let course = self
            .orchestrator
            .course_structure(course_id, self.credential.as_ref(), refresh)
            .await?;
        if let Err(e) = self.store.save_course(course_id, &course).await {
            tracing::warn!(course_id, error = %e, "client store write failed");
        }
        Ok(course)
    }

    /// Bulk sweep: sync every locator not yet stored and persist the results.
    pub async fn prefetch_many<F>(
        &self, locators: &[String], cancel: &CancellationToken, on_progress: F,
    ) -> Result<SyncResult, Error>
    where
        F: FnMut(SyncProgress) + Send,
    {
        let mut missing = Vec::with_capacity(locators.len());
        for locator in locators {
            if !self.is_stored(locator).await {
                missing.push(locator.clone());
            }
        }
        tracing::info!(requested = locators.len(), missing = missing.len(), "prefetch sweep");

        let result = self
            .orchestrator
            .sync_many(&missing, self.credential.as_ref(), cancel, on_progress)
            .await?;
        for (locator, html) in result.contents() {
            self.persist(locator, html).await;
        }
        Ok(result)
    }

    /// Bulk sweep over every activity of a course.
    pub async fn prefetch_course<F>(
        &self, course_id: i64, cancel: &CancellationToken, on_progress: F,
    ) -> Result<SyncResult, Error>
    where
        F: FnMut(SyncProgress) + Send,
    {
        let course = self.read_course(course_id, false).await?;
        self.prefetch_many(&course.activity_urls(), cancel, on_progress).await
    }

    /// Whole-course sync through the orchestrator, persisting what survives.
    pub async fn sync_course<F>(
        &self, course_id: i64, cancel: &CancellationToken, purge: CancelPurge, on_progress: F,
    ) -> Result<CourseSync, Error>
    where
        F: FnMut(SyncProgress) + Send,
    {
        let outcome = self
            .orchestrator
            .sync_course(course_id, self.credential.as_ref(), cancel, purge, on_progress)
            .await?;
        if !outcome.result.cancelled {
            for (locator, html) in outcome.result.contents() {
                self.persist(locator, html).await;
            }
        }
        Ok(outcome)
    }

    /// Drop everything in the client store. Returns how many rows went away.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.store.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{CleanRules, Cleaner};
    use crate::retry::RetryPolicy;
    use crate::testing::FakeOrigin;
    use quire_core::{CacheService, MemoryAdapter};

    fn locators(n: usize) -> Vec<String> {
        (1..=n)
            .map(|i| format!("https://lms.example.edu/mod/page/view.php?id={i}"))
            .collect()
    }

    async fn reader(origin: Arc<FakeOrigin>, credential: Option<&str>) -> Reader {
        let cache = CacheService::new(Arc::new(MemoryAdapter::new()));
        let cleaner = Arc::new(Cleaner::new(&CleanRules::default()).unwrap());
        let orchestrator = SyncOrchestrator::new(cache, origin, cleaner, RetryPolicy::none(), 3);
        let store = ClientStore::open_in_memory().await.unwrap();
        Reader::new(store, Arc::new(orchestrator), credential.map(|t| Credential::new(t).unwrap()))
    }

    #[tokio::test]
    async fn test_read_prefers_client_store() {
        let origin = Arc::new(FakeOrigin::new());
        let reader = reader(origin.clone(), Some("token")).await;
        let locator = &locators(1)[0];

        let (first, source) = reader.read(locator).await.unwrap();
        assert_eq!(source, ReadSource::Remote);
        assert!(reader.is_stored(locator).await);

        let (second, source) = reader.read(locator).await.unwrap();
        assert_eq!(source, ReadSource::Local);
        assert_eq!(first, second);
        assert_eq!(origin.calls(), 1);
    }

    #[tokio::test]
    async fn test_read_without_credential_fails_on_miss() {
        let reader = reader(Arc::new(FakeOrigin::new()), None).await;
        let err = reader.read(&locators(1)[0]).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_prefetch_skips_stored_and_persists_results() {
        let origin = Arc::new(FakeOrigin::new());
        let reader = reader(origin.clone(), Some("token")).await;
        let all = locators(5);
        reader.store().save_activity(&all[0], "<p>already here</p>").await.unwrap();

        let result = reader
            .prefetch_many(&all, &CancellationToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(result.stats.total, 4);
        assert_eq!(origin.calls(), 4);
        assert!(!origin.fetched().contains(&all[0]));
        assert_eq!(reader.store().activity_count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_prefetch_course_and_clear() {
        let all = locators(4);
        let origin = Arc::new(FakeOrigin::new().with_course(3, "Biology", &all));
        let reader = reader(origin, Some("token")).await;

        reader
            .prefetch_course(3, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        for locator in &all {
            assert!(reader.is_stored(locator).await);
        }
        assert_eq!(reader.read_course(3, false).await.unwrap().title, "Biology");

        assert_eq!(reader.clear().await.unwrap(), 5);
        assert!(!reader.is_stored(&all[0]).await);
    }

    #[tokio::test]
    async fn test_read_course_refresh_bypasses_store() {
        let origin = Arc::new(FakeOrigin::new().with_course(3, "Biology", &locators(1)));
        let reader = reader(origin.clone(), Some("token")).await;

        reader.read_course(3, false).await.unwrap();
        reader.read_course(3, false).await.unwrap();
        assert_eq!(origin.structure_calls(), 1);

        reader.read_course(3, true).await.unwrap();
        assert_eq!(origin.structure_calls(), 2);
    }
}
