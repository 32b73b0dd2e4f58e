//! MCP tool implementations.
//!
//! This module contains all tools exposed by the quire server.

pub mod cache;
pub mod content_get;
pub mod content_sync;
pub mod course_get;
pub mod course_sync;
pub mod courses_list;
pub mod sync_cancel;

pub use cache::{CacheClearParams, CacheStatusParams};
pub use content_get::ContentGetParams;
pub use content_sync::ContentSyncParams;
pub use course_get::CourseGetParams;
pub use course_sync::CourseSyncParams;
pub use courses_list::CoursesListParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use quire_core::Error;
use serde::Serialize;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::Serialization(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
