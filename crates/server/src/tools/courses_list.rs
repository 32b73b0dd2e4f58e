//! courses_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use quire_core::{CourseSummary, Error};

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the courses_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CoursesListParams {
    /// LMS token for this request. Falls back to the configured token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Output from the courses_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CoursesListOutput {
    pub courses: Vec<CourseSummary>,
}

pub async fn list_impl(state: &AppState, params: CoursesListParams) -> Result<CallToolResult, McpError> {
    let credential = state
        .credential(params.token.as_deref())?
        .ok_or_else(|| Error::MissingCredential("an LMS token is required to list courses".into()))?;
    let courses = state.orchestrator.enrolled_courses(&credential).await?;
    json_result(&CoursesListOutput { courses })
}
