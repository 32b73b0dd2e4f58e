//! Shared server state.

use std::sync::{Arc, Mutex, PoisonError};

use quire_client::{CleanRules, Cleaner, Credential, LmsClient, OriginClient, SyncOrchestrator};
use quire_core::{AppConfig, CacheService, Error, open_adapter};
use tokio_util::sync::CancellationToken;

/// Everything a tool call needs.
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: SyncOrchestrator,
    credential: Option<Credential>,
    job: Mutex<Option<CancellationToken>>,
}

impl AppState {
    /// Build the cache, origin client, cleaner and orchestrator from config.
    pub async fn from_config(config: AppConfig) -> Result<Self, Error> {
        let adapter = open_adapter(&config).await?;
        let origin = LmsClient::from_app_config(&config)?;
        let rules = CleanRules::from_optional_file(config.clean_rules_file.as_deref())?;
        let cleaner = Cleaner::new(&rules)?.with_origin(origin.base_url());

        let orchestrator =
            SyncOrchestrator::from_config(&config, CacheService::new(adapter), Arc::new(origin), Arc::new(cleaner));
        Ok(Self::new(config, orchestrator))
    }

    pub fn new(config: AppConfig, orchestrator: SyncOrchestrator) -> Self {
        let credential = Credential::from_config(&config).ok();
        Self { config, orchestrator, credential, job: Mutex::new(None) }
    }

    /// State around an explicit cache and origin, with the built-in cleaning rules.
    pub fn with_origin(config: AppConfig, cache: CacheService, origin: Arc<dyn OriginClient>) -> Result<Self, Error> {
        let cleaner = Cleaner::new(&CleanRules::default())?;
        let orchestrator = SyncOrchestrator::from_config(&config, cache, origin, Arc::new(cleaner));
        Ok(Self::new(config, orchestrator))
    }

    /// The per-request token if given, else the configured one.
    pub fn credential(&self, token: Option<&str>) -> Result<Option<Credential>, Error> {
        match token {
            Some(token) => Credential::new(token).map(Some),
            None => Ok(self.credential.clone()),
        }
    }

    /// Claim the single job slot.
    pub fn begin_job(&self) -> Result<JobGuard<'_>, Error> {
        let mut slot = self.job.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(Error::SyncBusy);
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        Ok(JobGuard { slot: &self.job, token })
    }

    pub fn job_running(&self) -> bool {
        self.job.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Cancel the running job. Also raises the cache marker so a job in
    /// another process sharing the cache stops too.
    pub async fn cancel_job(&self) -> bool {
        let running = self
            .job
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(CancellationToken::cancel)
            .is_some();
        self.orchestrator.cancel().await;
        running
    }
}

/// Holds the job slot until dropped.
#[derive(Debug)]
pub struct JobGuard<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
    token: CancellationToken,
}

impl JobGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::state;
    use super::*;

    #[test]
    fn test_single_job_slot() {
        let state = state(Some("t"));
        let guard = state.begin_job().unwrap();
        assert!(state.job_running());
        assert!(matches!(state.begin_job(), Err(Error::SyncBusy)));

        drop(guard);
        assert!(!state.job_running());
        assert!(state.begin_job().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_job_cancels_token() {
        let state = state(Some("t"));
        assert!(!state.cancel_job().await);

        let guard = state.begin_job().unwrap();
        assert!(state.cancel_job().await);
        assert!(guard.token().is_cancelled());
    }

    #[test]
    fn test_request_token_overrides_config() {
        let state = state(Some("configured"));
        assert_eq!(state.credential(None).unwrap().unwrap().expose(), "configured");
        assert_eq!(state.credential(Some("mine")).unwrap().unwrap().expose(), "mine");
        assert!(state.credential(Some("")).is_err());
        assert!(super::testing::state(None).credential(None).unwrap().is_none());
    }
}
