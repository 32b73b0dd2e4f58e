//! course_sync tool implementation.
//!
//! Synchronizes every activity of a course. A cancelled job rolls the cache
//! back according to `purge`.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use quire_client::{CancelPurge, SyncProgress, SyncResult};

use crate::state::AppState;
use crate::tools::content_sync::strip_content;
use crate::tools::json_result;

/// Parameters for the course_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CourseSyncParams {
    pub course_id: i64,

    /// What a cancelled job leaves behind: `keep_partial`, `purge_job`
    /// (default) or `purge_course`.
    #[serde(default)]
    pub purge: CancelPurge,

    /// LMS token for this request. Falls back to the configured token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Output from the course_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CourseSyncOutput {
    pub course_id: i64,
    pub title: String,
    pub result: SyncResult,
    pub progress: Option<SyncProgress>,
    /// Cache entries removed after cancellation.
    pub purged: usize,
}

pub async fn sync_impl(state: &AppState, params: CourseSyncParams) -> Result<CallToolResult, McpError> {
    let credential = state.credential(params.token.as_deref())?;
    let job = state.begin_job()?;

    let mut last = None;
    let outcome = state
        .orchestrator
        .sync_course(params.course_id, credential.as_ref(), job.token(), params.purge, |progress| {
            last = Some(progress)
        })
        .await?;
    drop(job);

    let mut result = outcome.result;
    strip_content(&mut result);
    json_result(&CourseSyncOutput {
        course_id: outcome.course.id,
        title: outcome.course.title,
        result,
        progress: last,
        purged: outcome.purged,
    })
}
