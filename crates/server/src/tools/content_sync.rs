//! content_sync tool implementation.
//!
//! Brings a list of activities into the cache in batches.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use quire_client::{SyncProgress, SyncResult};
use quire_core::Error;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the content_sync tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ContentSyncParams {
    /// Activity URLs to synchronize.
    pub locators: Vec<String>,

    /// Include cleaned content for every item in the output (default: false).
    #[serde(default)]
    pub include_content: bool,

    /// LMS token for this request. Falls back to the configured token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Output from the content_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentSyncOutput {
    pub result: SyncResult,
    /// Last progress snapshot emitted by the job.
    pub progress: Option<SyncProgress>,
}

pub async fn sync_impl(state: &AppState, params: ContentSyncParams) -> Result<CallToolResult, McpError> {
    if params.locators.is_empty() {
        return Err(Error::InvalidInput("locators cannot be empty".into()).into());
    }

    let credential = state.credential(params.token.as_deref())?;
    let job = state.begin_job()?;

    let mut last = None;
    let mut result = state
        .orchestrator
        .sync_many(&params.locators, credential.as_ref(), job.token(), |progress| last = Some(progress))
        .await?;
    drop(job);

    if !params.include_content {
        strip_content(&mut result);
    }
    json_result(&ContentSyncOutput { result, progress: last })
}

pub(crate) fn strip_content(result: &mut SyncResult) {
    for item in &mut result.items {
        item.content = None;
    }
}
