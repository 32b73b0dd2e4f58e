//! course_get tool implementation.
//!
//! Returns a course's section/activity structure with per-activity cache state.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use quire_core::CourseSnapshot;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the course_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CourseGetParams {
    pub course_id: i64,

    /// Refetch the structure from the origin even if cached (default: false).
    #[serde(default)]
    pub refresh: bool,

    /// LMS token for this request. Falls back to the configured token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Output from the course_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CourseGetOutput {
    pub course: CourseSnapshot,
    /// Number of activities whose content is already cached.
    pub cached_activities: usize,
    pub total_activities: usize,
}

pub async fn get_impl(state: &AppState, params: CourseGetParams) -> Result<CallToolResult, McpError> {
    let credential = state.credential(params.token.as_deref())?;
    let course = state
        .orchestrator
        .course_structure(params.course_id, credential.as_ref(), params.refresh)
        .await?;

    let urls = course.activity_urls();
    let mut cached_activities = 0;
    for url in &urls {
        if state.orchestrator.is_cached(url).await {
            cached_activities += 1;
        }
    }

    json_result(&CourseGetOutput { total_activities: urls.len(), cached_activities, course })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{COURSE_ID, locator, output_json, state};

    #[tokio::test]
    async fn test_course_get_reports_cached_activities() {
        let state = state(Some("t"));
        state.orchestrator.get_or_fetch(&locator(2), state.credential(None).unwrap().as_ref()).await.unwrap();

        let params = CourseGetParams { course_id: COURSE_ID, refresh: false, token: None };
        let out = output_json(&get_impl(&state, params).await.unwrap());
        assert_eq!(out["course"]["title"], "Statistics");
        assert_eq!(out["total_activities"], 3);
        assert_eq!(out["cached_activities"], 1);
        assert_eq!(out["course"]["sections"][0]["activities"][0]["type"], "page");
    }

    #[tokio::test]
    async fn test_unknown_course() {
        let state = state(Some("t"));
        let params = CourseGetParams { course_id: 99, refresh: false, token: None };
        let err = get_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32006);
    }
}
