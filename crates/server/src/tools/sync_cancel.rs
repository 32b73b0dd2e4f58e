//! sync_cancel tool implementation.
//!
//! Requests cooperative abort of the running sync job. The job stops at its
//! next batch boundary.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Output from the sync_cancel tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncCancelOutput {
    /// A job in this process was running and has been signalled.
    pub cancelled: bool,
}

pub async fn cancel_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let cancelled = state.cancel_job().await;
    tracing::info!(cancelled, "sync cancellation requested");
    json_result(&SyncCancelOutput { cancelled })
}
