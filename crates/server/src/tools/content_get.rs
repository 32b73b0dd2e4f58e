//! content_get tool implementation.
//!
//! Returns cleaned content for one activity, from cache or origin.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use quire_client::ItemStatus;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the content_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentGetParams {
    /// Activity URL, e.g. `https://lms.example.edu/mod/page/view.php?id=42`.
    pub locator: String,

    /// LMS token for this request. Falls back to the configured token.
    #[serde(default)]
    pub token: Option<String>,
}

/// Output from the content_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentGetOutput {
    pub locator: String,
    /// `cached` when no origin call was made.
    pub status: ItemStatus,
    /// Cleaned HTML.
    pub content: String,
}

pub async fn get_impl(state: &AppState, params: ContentGetParams) -> Result<CallToolResult, McpError> {
    let credential = state.credential(params.token.as_deref())?;
    let (content, status) = state
        .orchestrator
        .get_or_fetch_with_status(&params.locator, credential.as_ref())
        .await?;

    json_result(&ContentGetOutput { locator: params.locator, status, content })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{locator, output_json, state};

    #[tokio::test]
    async fn test_get_then_cached() {
        let state = state(Some("t"));
        let params = ContentGetParams { locator: locator(1), token: None };

        let first = output_json(&get_impl(&state, params.clone()).await.unwrap());
        assert_eq!(first["status"], "fetched");
        assert!(!first["content"].as_str().unwrap().contains("menu"));

        let second = output_json(&get_impl(&state, params).await.unwrap());
        assert_eq!(second["status"], "cached");
        assert_eq!(first["content"], second["content"]);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let state = state(None);
        let err = get_impl(&state, ContentGetParams { locator: locator(1), token: None })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32003);
    }

    #[tokio::test]
    async fn test_empty_locator() {
        let state = state(Some("t"));
        let err = get_impl(&state, ContentGetParams { locator: " ".into(), token: None })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
