use crate::adf;
use crate::atlassian_client::RemoteApi;
use crate::error::{AtlassianMcpError, AtlassianMcpResult};
use crate::tools::common::{require_non_empty, status_with_json, str_at, validate_issue_key};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};

/// Parameters for creating a new Jira issue
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateIssueParams {
    /// Project key where the issue will be created (e.g., "PROJ", "DEV")
    pub project_key: String,

    /// Issue summary/title (required)
    /// Keep it concise and descriptive (e.g., "Fix login button alignment")
    pub summary: String,

    /// Plain text description, stored as a single ADF paragraph
    #[serde(default)]
    pub description: Option<String>,

    /// Issue type (default: "Task")
    /// Common types: "Task", "Bug", "Story", "Epic", "Subtask"
    #[serde(default)]
    pub issue_type: Option<String>,
}

/// Parameters for updating fields of an existing issue
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateIssueParams {
    /// Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Field id -> value, sent verbatim as the `fields` object
    /// Example: {"summary": "New title", "labels": ["backend"]}
    pub fields: Map<String, Value>,
}

/// Tool for creating Jira issues
pub struct CreateIssueTool {
    api: Arc<dyn RemoteApi>,
}

impl CreateIssueTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: CreateIssueParams) -> AtlassianMcpResult<String> {
        require_non_empty("project_key", &params.project_key)?;
        require_non_empty("summary", &params.summary)?;

        let project_key = params.project_key.trim().to_uppercase();
        let issue_type = params
            .issue_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Task");

        info!(
            "Creating {} in project {}: {}",
            issue_type, project_key, params.summary
        );

        let body = json!({
            "fields": {
                "project": {"key": project_key},
                "summary": params.summary.trim(),
                "description": adf::paragraph_document(params.description.as_deref().unwrap_or_default()),
                "issuetype": {"name": issue_type}
            }
        });

        let created = self.api.post("/rest/api/3/issue", &body).await?;
        let key = str_at(&created, "/key");
        if key.is_empty() {
            return Err(AtlassianMcpError::internal(
                "Jira accepted the issue but returned no key",
            ));
        }

        info!("Created issue {}", key);
        status_with_json(&format!("Created issue: {}", key), &created)
    }
}

/// Tool for updating Jira issue fields
pub struct UpdateIssueTool {
    api: Arc<dyn RemoteApi>,
}

impl UpdateIssueTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self), fields(issue_key = %params.issue_key))]
    pub async fn execute(&self, params: UpdateIssueParams) -> AtlassianMcpResult<String> {
        let issue_key = validate_issue_key(&params.issue_key)?;

        if params.fields.is_empty() {
            return Err(AtlassianMcpError::invalid_param(
                "fields",
                "At least one field must be provided",
            ));
        }

        info!(
            "Updating {} field(s) on {}",
            params.fields.len(),
            issue_key
        );

        self.api
            .put(
                &format!("/rest/api/3/issue/{}", issue_key),
                &json!({ "fields": params.fields }),
            )
            .await?;

        Ok(format!("Updated issue {}", issue_key))
    }
}
