//! Exponential backoff for fallible async operations.
//!
//! The attempt loop asks a classifier whether each error is worth another
//! try. Errors it rejects are returned immediately, so an invalid token
//! never costs a backoff delay.

use std::future::Future;
use std::time::Duration;

use quire_core::{AppConfig, Error};

/// Backoff settings for one retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Growth factor applied per retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            initial_backoff: config.retry_base_delay(),
            ..Self::default()
        }
    }

    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let delay = self.initial_backoff.as_nanos() as f64 * factor;
        if !delay.is_finite() || delay >= self.max_backoff.as_nanos() as f64 {
            self.max_backoff
        } else {
            Duration::from_nanos(delay as u64)
        }
    }
}

/// Errors that know whether a retry could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for Error {
    fn is_retryable(&self) -> bool {
        Error::is_retryable(self)
    }
}

/// Run `op` under `policy`, retrying errors the type itself classifies as transient.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    retry_with(policy, label, op, E::is_retryable).await
}

/// Run `op` under `policy`, retrying only errors `classify` accepts.
pub async fn retry_with<T, E, F, Fut, C>(policy: &RetryPolicy, label: &str, mut op: F, classify: C) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && classify(&e) => {
                let delay = policy.backoff(attempt);
                tracing::debug!(
                    label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::warn!(label, attempt, error = %e, "giving up after retries");
                }
                return Err(e);
            }
        }
    }
}
