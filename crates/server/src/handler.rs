//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use crate::state::AppState;
use crate::tools::{
    CacheClearParams, CacheStatusParams, ContentGetParams, ContentSyncParams, CourseGetParams, CourseSyncParams,
    CoursesListParams, cache, content_get, content_sync, course_get, course_sync, courses_list, sync_cancel,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for quire.
#[derive(Clone)]
pub struct QuireServer {
    tool_router: ToolRouter<Self>,
    state: Arc<AppState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl QuireServer {
    /// Create a new server handler.
    pub fn new(state: AppState) -> Self {
        Self { tool_router: Self::tool_router(), state: Arc::new(state) }
    }

    #[tool(description = "Get cleaned, distraction-free HTML for one LMS activity. Served from cache when available.")]
    async fn content_get(&self, params: Parameters<ContentGetParams>) -> Result<CallToolResult, McpError> {
        content_get::get_impl(&self.state, params.0).await
    }

    /// Batch synchronization of many activities.
    ///
    /// Cached items are never refetched. Only one sync job runs at a time.
    #[tool(
        description = "Fetch, clean and cache many LMS activities in batches. Returns per-item status and stats. Cancel with sync_cancel."
    )]
    async fn content_sync(&self, params: Parameters<ContentSyncParams>) -> Result<CallToolResult, McpError> {
        content_sync::sync_impl(&self.state, params.0).await
    }

    #[tool(description = "Get a course's sections and activities, with how many activities are already cached.")]
    async fn course_get(&self, params: Parameters<CourseGetParams>) -> Result<CallToolResult, McpError> {
        course_get::get_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Fetch, clean and cache every activity of a course. A cancelled job purges what it wrote (configurable)."
    )]
    async fn course_sync(&self, params: Parameters<CourseSyncParams>) -> Result<CallToolResult, McpError> {
        course_sync::sync_impl(&self.state, params.0).await
    }

    #[tool(description = "List the courses the token's user is enrolled in.")]
    async fn courses_list(&self, params: Parameters<CoursesListParams>) -> Result<CallToolResult, McpError> {
        courses_list::list_impl(&self.state, params.0).await
    }

    #[tool(description = "Cancel the running sync job at its next batch boundary.")]
    async fn sync_cancel(&self) -> Result<CallToolResult, McpError> {
        sync_cancel::cancel_impl(&self.state).await
    }

    #[tool(description = "Report which activities and course structures are cached and whether a sync job is running.")]
    async fn cache_status(&self, params: Parameters<CacheStatusParams>) -> Result<CallToolResult, McpError> {
        cache::status_impl(&self.state, params.0).await
    }

    #[tool(description = "Clear the server cache, or only one course and its activities.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        cache::clear_impl(&self.state, params.0).await
    }
}

impl ServerHandler for QuireServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "quire".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Reads LMS course content as cleaned HTML. Use courses_list and course_get to discover activities, \
                 content_get to read one, and content_sync or course_sync to cache many."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::state;

    #[test]
    fn test_all_tools_registered() {
        let server = QuireServer::new(state(Some("t")));
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            [
                "cache_clear",
                "cache_status",
                "content_get",
                "content_sync",
                "course_get",
                "course_sync",
                "courses_list",
                "sync_cancel"
            ]
        );
    }
}
