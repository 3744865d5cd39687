//! Project issues tool

use crate::atlassian_client::RemoteApi;
use crate::error::AtlassianMcpResult;
use crate::tools::common::{
    impl_pretty_display, jql_quote, require_non_empty, require_positive, search_jql, total_of,
    IssueRow, ROW_FIELDS,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Parameters for the get_all_issues_in_project tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProjectIssuesParams {
    /// Project key (e.g., "SCRUM")
    pub project_key: String,

    /// Maximum issues to return (optional, default: 100)
    pub max_results: Option<u32>,

    /// Starting offset for pagination (optional, default: 0)
    pub start_at: Option<u32>,
}

/// Result from the get_all_issues_in_project tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIssuesResult {
    pub project_key: String,
    pub total_issues: u64,
    pub returned_issues: usize,
    pub start_at: u32,
    pub max_results: u32,
    pub issues: Vec<IssueRow>,
}

impl_pretty_display!(ProjectIssuesResult);

pub struct ProjectIssuesTool {
    api: Arc<dyn RemoteApi>,
}

impl ProjectIssuesTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: ProjectIssuesParams) -> AtlassianMcpResult<ProjectIssuesResult> {
        require_non_empty("project_key", &params.project_key)?;
        let max_results = params.max_results.unwrap_or(100);
        let start_at = params.start_at.unwrap_or(0);
        require_positive("max_results", max_results)?;

        let project_key = params.project_key.trim().to_uppercase();
        info!("Listing issues in project {}", project_key);

        let jql = format!("project = {} ORDER BY created DESC", jql_quote(&project_key));
        let page = search_jql(self.api.as_ref(), &jql, max_results, start_at, ROW_FIELDS).await?;
        let issues = IssueRow::from_page(&page);

        Ok(ProjectIssuesResult {
            project_key,
            total_issues: total_of(&page),
            returned_issues: issues.len(),
            start_at,
            max_results,
            issues,
        })
    }
}
