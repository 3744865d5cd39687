//! Issue details tool for retrieving an issue with its full context
//!
//! Stitches the issue, its changelog, its comments and one level of
//! subtasks into a single flattened document. Descriptions and comment
//! bodies are converted from ADF to plain text.

use crate::adf;
use crate::atlassian_client::RemoteApi;
use crate::error::AtlassianMcpResult;
use crate::tools::common::{
    array_at, assignee_of, display_name_at, impl_pretty_display, string_at, validate_issue_key,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Fields requested for a top-level issue
pub const ISSUE_FIELDS: &str =
    "summary,description,status,comment,subtasks,issuetype,priority,project,assignee,created,updated";

/// Fields requested for each expanded subtask
pub const SUBTASK_FIELDS: &str = "summary,description,status,comment,assignee";

/// Parameters for the get_jira_issue tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetIssueDetailsParams {
    /// Jira issue key or numeric id (required)
    /// Examples: "PROJ-123", "10042"
    pub issue_key: String,
}

/// A comment flattened to author and plain text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSummary {
    pub author: String,
    pub body: String,
}

/// One field change inside a changelog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeItem {
    pub field: String,
    pub from: String,
    pub to: String,
}

/// One changelog entry, in the order Jira returned it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub author: String,
    pub created: String,
    pub items: Vec<ChangeItem>,
}

/// A subtask expanded one level deep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtaskSummary {
    pub key: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub assignee: String,
    pub comments: Vec<CommentSummary>,
    pub history: Vec<HistoryEntry>,
}

/// A per-item fetch that failed and was left out of the aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    pub key: String,
    pub error: String,
}

/// Issue with description, comments, history and subtasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDetail {
    pub key: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub project: String,
    pub project_key: String,
    pub assignee: String,
    pub created: String,
    pub updated: String,
    pub comments: Vec<CommentSummary>,
    pub history: Vec<HistoryEntry>,
    pub subtasks: Vec<SubtaskSummary>,
    /// Subtasks that could not be fetched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtask_errors: Vec<ItemError>,
}

/// Parameters for the get_jira_issue_type tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetIssueTypeParams {
    /// Jira issue key (required)
    pub issue_key: String,
}

/// Result from the get_jira_issue_type tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTypeResult {
    pub key: String,
    pub issue_type: String,
    pub issue_type_id: String,
    pub is_subtask: bool,
}

impl_pretty_display!(IssueDetail, IssueTypeResult);

/// Comments of a fetched issue, bodies converted from ADF
pub fn comments_of(issue: &Value) -> Vec<CommentSummary> {
    array_at(issue, "/fields/comment/comments")
        .iter()
        .filter(|c| c.is_object())
        .map(|c| CommentSummary {
            author: display_name_at(c, "/author", "Unknown"),
            body: adf::extract_optional(c.get("body")),
        })
        .collect()
}

/// Changelog of a fetched issue, in upstream order
pub fn history_of(issue: &Value) -> Vec<HistoryEntry> {
    array_at(issue, "/changelog/histories")
        .iter()
        .filter(|h| h.is_object())
        .map(|h| HistoryEntry {
            author: display_name_at(h, "/author", "Unknown"),
            created: string_at(h, "/created"),
            items: array_at(h, "/items")
                .iter()
                .filter(|i| i.is_object())
                .map(|i| ChangeItem {
                    field: string_at(i, "/field"),
                    from: string_at(i, "/fromString"),
                    to: string_at(i, "/toString"),
                })
                .collect(),
        })
        .collect()
}

fn subtask_from(issue: &Value) -> SubtaskSummary {
    SubtaskSummary {
        key: string_at(issue, "/key"),
        summary: string_at(issue, "/fields/summary"),
        description: adf::extract_optional(issue.pointer("/fields/description")),
        status: string_at(issue, "/fields/status/name"),
        assignee: assignee_of(issue),
        comments: comments_of(issue),
        history: history_of(issue),
    }
}

/// Builds [`IssueDetail`] views out of sequential issue fetches
#[derive(Clone)]
pub struct IssueAggregator {
    api: Arc<dyn RemoteApi>,
}

impl IssueAggregator {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    /// Fetch one issue with its changelog expanded
    pub async fn fetch_issue(&self, issue_key: &str, fields: &str) -> AtlassianMcpResult<Value> {
        debug!("Fetching issue {} with fields {}", issue_key, fields);
        self.api
            .get(
                &format!("/rest/api/3/issue/{}", issue_key),
                &[
                    ("expand", "changelog".to_string()),
                    ("fields", fields.to_string()),
                ],
            )
            .await
    }

    /// Fetch an issue and expand its subtasks one level deep.
    ///
    /// A failure on the issue itself is returned; a failure on a subtask
    /// leaves that subtask out and records it in `subtask_errors`.
    pub async fn issue_detail(&self, issue_key: &str) -> AtlassianMcpResult<IssueDetail> {
        let issue = self.fetch_issue(issue_key, ISSUE_FIELDS).await?;
        let (subtasks, subtask_errors) = self.expand_subtasks(&issue).await;

        Ok(IssueDetail {
            key: string_at(&issue, "/key"),
            issue_type: string_at(&issue, "/fields/issuetype/name"),
            summary: string_at(&issue, "/fields/summary"),
            description: adf::extract_optional(issue.pointer("/fields/description")),
            status: string_at(&issue, "/fields/status/name"),
            priority: string_at(&issue, "/fields/priority/name"),
            project: string_at(&issue, "/fields/project/name"),
            project_key: string_at(&issue, "/fields/project/key"),
            assignee: assignee_of(&issue),
            created: string_at(&issue, "/fields/created"),
            updated: string_at(&issue, "/fields/updated"),
            comments: comments_of(&issue),
            history: history_of(&issue),
            subtasks,
            subtask_errors,
        })
    }

    async fn expand_subtasks(&self, issue: &Value) -> (Vec<SubtaskSummary>, Vec<ItemError>) {
        let mut subtasks = Vec::new();
        let mut errors = Vec::new();

        for reference in array_at(issue, "/fields/subtasks") {
            let Some(key) = reference.get("key").and_then(Value::as_str) else {
                continue;
            };

            match self.fetch_issue(key, SUBTASK_FIELDS).await {
                Ok(subtask) => subtasks.push(subtask_from(&subtask)),
                Err(e) => {
                    warn!("Skipping subtask {}: {}", key, e);
                    errors.push(ItemError {
                        key: key.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        (subtasks, errors)
    }
}

/// Implementation of the get_jira_issue tool
pub struct GetIssueDetailsTool {
    aggregator: IssueAggregator,
}

impl GetIssueDetailsTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self {
            aggregator: IssueAggregator::new(api),
        }
    }

    #[instrument(skip(self), fields(issue_key = %params.issue_key))]
    pub async fn execute(&self, params: GetIssueDetailsParams) -> AtlassianMcpResult<IssueDetail> {
        let issue_key = validate_issue_key(&params.issue_key)?;
        info!("Executing get_jira_issue for issue: {}", issue_key);

        let detail = self.aggregator.issue_detail(&issue_key).await?;

        info!(
            "Retrieved {} with {} comments, {} history entries, {} subtasks",
            detail.key,
            detail.comments.len(),
            detail.history.len(),
            detail.subtasks.len()
        );

        Ok(detail)
    }
}

/// Implementation of the get_jira_issue_type tool
pub struct GetIssueTypeTool {
    api: Arc<dyn RemoteApi>,
}

impl GetIssueTypeTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: GetIssueTypeParams) -> AtlassianMcpResult<IssueTypeResult> {
        let issue_key = validate_issue_key(&params.issue_key)?;
        info!("Getting issue type for: {}", issue_key);

        let issue = self
            .api
            .get(
                &format!("/rest/api/3/issue/{}", issue_key),
                &[("fields", "issuetype,key,summary".to_string())],
            )
            .await?;

        Ok(IssueTypeResult {
            key: string_at(&issue, "/key"),
            issue_type: string_at(&issue, "/fields/issuetype/name"),
            issue_type_id: string_at(&issue, "/fields/issuetype/id"),
            is_subtask: issue
                .pointer("/fields/issuetype/subtask")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comments_convert_adf_and_default_author() {
        let issue = json!({"fields": {"comment": {"comments": [
            {"author": {"displayName": "Ada"}, "body": {"type": "doc", "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "Ship it"}]}
            ]}},
            {"body": "legacy plain text"},
            null
        ]}}});

        let comments = comments_of(&issue);
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "Ada");
        assert_eq!(comments[0].body, "Ship it");
        assert_eq!(comments[1].author, "Unknown");
        assert_eq!(comments[1].body, "legacy plain text");
    }

    #[test]
    fn test_history_keeps_upstream_order() {
        let issue = json!({"changelog": {"histories": [
            {"author": {"displayName": "B"}, "created": "2025-02-01", "items": [
                {"field": "status", "fromString": "To Do", "toString": "In Progress"}
            ]},
            {"author": {"displayName": "A"}, "created": "2025-01-01", "items": [
                {"field": "assignee", "fromString": null, "toString": "Ada"}
            ]}
        ]}});

        let history = history_of(&issue);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].created, "2025-02-01");
        assert_eq!(history[0].items[0].to, "In Progress");
        assert_eq!(history[1].items[0].from, "");
    }

    #[test]
    fn test_missing_changelog_is_empty() {
        assert!(history_of(&json!({"key": "A-1"})).is_empty());
        assert!(comments_of(&json!({"fields": {"comment": null}})).is_empty());
    }
}
