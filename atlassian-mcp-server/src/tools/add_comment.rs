//! Add comment tool for commenting on Jira issues
//!
//! Plain text comments are wrapped into a one-paragraph ADF document before
//! being posted.

use crate::adf;
use crate::atlassian_client::RemoteApi;
use crate::error::{AtlassianMcpError, AtlassianMcpResult};
use crate::tools::common::{require_non_empty, status_with_json, validate_issue_key};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

const MAX_COMMENT_LENGTH: usize = 32767;

/// Parameters for the add_jira_comment tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddCommentParams {
    /// Jira issue key (required)
    /// Examples: "PROJ-123", "KEY-456"
    pub issue_key: String,

    /// Comment text (required)
    pub comment: String,
}

/// Implementation of the add_jira_comment tool
pub struct AddCommentTool {
    api: Arc<dyn RemoteApi>,
}

impl AddCommentTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self), fields(
        issue_key = params.issue_key.as_str(),
        comment_length = params.comment.len(),
    ))]
    pub async fn execute(&self, params: AddCommentParams) -> AtlassianMcpResult<String> {
        let issue_key = validate_issue_key(&params.issue_key)?;
        require_non_empty("comment", &params.comment)?;

        // Jira rejects comment bodies longer than this
        if params.comment.len() > MAX_COMMENT_LENGTH {
            return Err(AtlassianMcpError::invalid_param(
                "comment",
                format!("Comment cannot exceed {} characters", MAX_COMMENT_LENGTH),
            ));
        }

        info!("Adding comment to issue: {}", issue_key);

        let comment = self
            .api
            .post(
                &format!("/rest/api/3/issue/{}/comment", issue_key),
                &json!({ "body": adf::paragraph_document(&params.comment) }),
            )
            .await?;

        info!("Comment added successfully to issue {}", issue_key);
        status_with_json(&format!("Added comment to {}", issue_key), &comment)
    }
}
