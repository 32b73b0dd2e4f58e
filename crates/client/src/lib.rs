//! Client code for quire.
//!
//! This crate provides the content cleaner, the origin LMS client, the retry
//! utility, the synchronization orchestrator and the reader-side helpers
//! shared by the server and CLI.

pub mod clean;
pub mod origin;
pub mod prefetch;
pub mod reader;
pub mod retry;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use clean::{CleanError, CleanRules, Cleaner, normalize_entities};
pub use origin::{Credential, LmsClient, LmsConfig, LmsError, OriginClient};
pub use prefetch::HoverPrefetcher;
pub use reader::{ReadSource, Reader};
pub use retry::{RetryPolicy, Retryable, retry, retry_with};
pub use sync::{
    CancelPurge, CourseSync, ItemStatus, ProgressTracker, SyncItem, SyncOrchestrator, SyncProgress, SyncResult,
    SyncStats,
};
