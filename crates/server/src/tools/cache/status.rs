//! cache_status tool implementation.
//!
//! Reports which activities and course structures are cached, and whether a
//! sync job is running.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the cache_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusParams {
    /// Activity URLs to check.
    #[serde(default)]
    pub locators: Vec<String>,

    /// Course whose structure (and listed activities) to check.
    #[serde(default)]
    pub course_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryStatus {
    pub locator: String,
    pub cached: bool,
}

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub entries: Vec<EntryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_cached: Option<bool>,
    pub job_running: bool,
    pub backend: String,
}

pub async fn status_impl(state: &AppState, params: CacheStatusParams) -> Result<CallToolResult, McpError> {
    let mut locators = params.locators;
    let mut course_cached = None;

    if let Some(course_id) = params.course_id {
        let course = state.orchestrator.cache().get_course_structure(course_id).await;
        course_cached = Some(course.is_some());
        if let Some(course) = course {
            for url in course.activity_urls() {
                if !locators.contains(&url) {
                    locators.push(url);
                }
            }
        }
    }

    let mut entries = Vec::with_capacity(locators.len());
    for locator in locators {
        let cached = state.orchestrator.is_cached(&locator).await;
        entries.push(EntryStatus { locator, cached });
    }

    json_result(&CacheStatusOutput {
        entries,
        course_cached,
        job_running: state.job_running(),
        backend: format!("{:?}", state.config.cache_backend).to_lowercase(),
    })
}
