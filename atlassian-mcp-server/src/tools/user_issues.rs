//! User issues tool for retrieving every issue assigned to someone
//!
//! Searches by assignee, then expands each hit into a full [`IssueDetail`]
//! with comments, history and subtasks. Issues are fetched one after
//! another; an issue that fails to load is reported and skipped.

use crate::atlassian_client::RemoteApi;
use crate::error::AtlassianMcpResult;
use crate::tools::common::{
    array_at, impl_pretty_display, jql_quote, require_non_empty, require_positive, search_jql,
    total_of,
};
use crate::tools::issue_details::{IssueAggregator, IssueDetail, ItemError, ISSUE_FIELDS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Parameters for the get_issues_by_assignee tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetUserIssuesParams {
    /// Email address of the assignee (required)
    pub assignee_email: String,

    /// Maximum issues to return (optional, default: 50)
    pub max_results: Option<u32>,

    /// Starting offset for pagination (optional, default: 0)
    pub start_at: Option<u32>,
}

/// Result from the get_issues_by_assignee tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserIssuesResult {
    pub assignee: String,

    /// Total reported by Jira for the search
    pub total_issues: u64,

    /// Number of issues expanded in this response
    pub returned_issues: usize,

    pub start_at: u32,
    pub max_results: u32,
    pub issues: Vec<IssueDetail>,

    /// Issues found by the search that could not be expanded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_issues: Vec<ItemError>,
}

impl_pretty_display!(GetUserIssuesResult);

/// Implementation of the get_issues_by_assignee tool
pub struct GetUserIssuesTool {
    api: Arc<dyn RemoteApi>,
    aggregator: IssueAggregator,
}

impl GetUserIssuesTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        let aggregator = IssueAggregator::new(Arc::clone(&api));
        Self { api, aggregator }
    }

    #[instrument(skip(self), fields(assignee = %params.assignee_email))]
    pub async fn execute(&self, params: GetUserIssuesParams) -> AtlassianMcpResult<GetUserIssuesResult> {
        require_non_empty("assignee_email", &params.assignee_email)?;
        let max_results = params.max_results.unwrap_or(50);
        let start_at = params.start_at.unwrap_or(0);
        require_positive("max_results", max_results)?;

        let assignee = params.assignee_email.trim().to_string();
        info!("Getting issues assigned to {}", assignee);

        let jql = format!("assignee = {} ORDER BY updated DESC", jql_quote(&assignee));
        let page = search_jql(self.api.as_ref(), &jql, max_results, start_at, ISSUE_FIELDS).await?;

        let mut issues = Vec::new();
        let mut failed_issues = Vec::new();

        for hit in array_at(&page, "/issues") {
            let Some(key) = hit.get("key").and_then(Value::as_str) else {
                continue;
            };

            match self.aggregator.issue_detail(key).await {
                Ok(detail) => issues.push(detail),
                Err(e) => {
                    warn!("Skipping issue {}: {}", key, e);
                    failed_issues.push(ItemError {
                        key: key.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Expanded {} issues for {} ({} failed)",
            issues.len(),
            assignee,
            failed_issues.len()
        );

        Ok(GetUserIssuesResult {
            assignee,
            total_issues: total_of(&page),
            returned_issues: issues.len(),
            start_at,
            max_results,
            issues,
            failed_issues,
        })
    }
}
