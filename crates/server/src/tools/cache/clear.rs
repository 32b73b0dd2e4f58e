//! cache_clear tool implementation.
//!
//! Clears the server cache, or one course and its activities.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use quire_core::Error;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Clear only this course's structure and activities.
    #[serde(default)]
    pub course_id: Option<i64>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Every targeted entry was removed.
    pub cleared: bool,
}

pub async fn clear_impl(state: &AppState, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    if state.job_running() {
        return Err(Error::SyncBusy.into());
    }

    let cache = state.orchestrator.cache();
    let cleared = match params.course_id {
        Some(course_id) => cache.clear_course(course_id).await,
        None => state.orchestrator.clear_cache().await,
    };
    tracing::info!(course_id = ?params.course_id, cleared, "cache cleared");

    json_result(&CacheClearOutput { cleared })
}
