//! Shared helpers for the tool modules
//!
//! JSON accessors that degrade missing data to empty values, the flattened
//! issue row used by every listing tool, JQL search, and parameter checks.

use crate::atlassian_client::RemoteApi;
use crate::error::{AtlassianMcpError, AtlassianMcpResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Shown wherever an issue has no assignee
pub const UNASSIGNED: &str = "Unassigned";

/// Jira Cloud's enhanced JQL search endpoint
pub const SEARCH_PATH: &str = "/rest/api/3/search/jql";

/// Fields requested for flattened issue rows
pub const ROW_FIELDS: &str =
    "summary,status,assignee,priority,issuetype,created,updated,parent,labels,customfield_10016";

/// Render a result as 2-space indented JSON for the MCP text content
macro_rules! impl_pretty_display {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    match serde_json::to_string_pretty(self) {
                        Ok(json) => write!(f, "{}", json),
                        Err(_) => write!(
                            f,
                            "{{\"error\": \"Failed to serialize {}\"}}",
                            stringify!($ty)
                        ),
                    }
                }
            }
        )+
    };
}
pub(crate) use impl_pretty_display;

/// String at a JSON pointer, or "" when absent or not a string
pub fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// Owned variant of [`str_at`]
pub fn string_at(value: &Value, pointer: &str) -> String {
    str_at(value, pointer).to_string()
}

/// String at a JSON pointer, or `None` when absent
pub fn opt_string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Display name of the user object at `pointer`, or `fallback`
pub fn display_name_at(value: &Value, pointer: &str, fallback: &str) -> String {
    value
        .pointer(pointer)
        .and_then(|user| user.get("displayName"))
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

/// Assignee display name, or [`UNASSIGNED`] when the issue has none
pub fn assignee_of(issue: &Value) -> String {
    match issue.pointer("/fields/assignee") {
        Some(user) if user.is_object() => user
            .get("displayName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => UNASSIGNED.to_string(),
    }
}

/// Array at `pointer`, or an empty slice
pub fn array_at<'a>(value: &'a Value, pointer: &str) -> &'a [Value] {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Upstream-reported `total`, 0 when missing
pub fn total_of(page: &Value) -> u64 {
    page.get("total").and_then(Value::as_u64).unwrap_or(0)
}

/// Flattened issue as returned by search and agile listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRow {
    pub key: String,
    pub summary: String,
    pub issue_type: String,
    pub status: String,
    pub assignee: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_summary: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_points: Option<f64>,
    pub created: String,
    pub updated: String,
}

impl IssueRow {
    pub fn from_issue(issue: &Value) -> Self {
        let parent = issue.pointer("/fields/parent").filter(|p| p.is_object());

        IssueRow {
            key: string_at(issue, "/key"),
            summary: string_at(issue, "/fields/summary"),
            issue_type: string_at(issue, "/fields/issuetype/name"),
            status: string_at(issue, "/fields/status/name"),
            assignee: assignee_of(issue),
            priority: string_at(issue, "/fields/priority/name"),
            parent_key: parent.map(|p| string_at(p, "/key")),
            parent_summary: parent.map(|p| string_at(p, "/fields/summary")),
            labels: array_at(issue, "/fields/labels")
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            story_points: issue
                .pointer("/fields/customfield_10016")
                .and_then(Value::as_f64),
            created: string_at(issue, "/fields/created"),
            updated: string_at(issue, "/fields/updated"),
        }
    }

    /// Rows for every issue in a search or agile page
    pub fn from_page(page: &Value) -> Vec<Self> {
        array_at(page, "/issues")
            .iter()
            .map(IssueRow::from_issue)
            .collect()
    }
}

/// Run a JQL search against the enhanced search endpoint
pub async fn search_jql(
    api: &dyn RemoteApi,
    jql: &str,
    max_results: u32,
    start_at: u32,
    fields: &str,
) -> AtlassianMcpResult<Value> {
    debug!("Searching with JQL: '{}'", jql);
    api.get(
        SEARCH_PATH,
        &[
            ("jql", jql.to_string()),
            ("maxResults", max_results.to_string()),
            ("startAt", start_at.to_string()),
            ("fields", fields.to_string()),
        ],
    )
    .await
}

/// Quote a value for use inside a JQL string literal
pub fn jql_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Validate and normalize an issue key (`PROJ-123`) or numeric issue id
pub fn validate_issue_key(issue_key: &str) -> AtlassianMcpResult<String> {
    let key = issue_key.trim();

    if key.is_empty() {
        return Err(AtlassianMcpError::invalid_param(
            "issue_key",
            "Issue key is required. Please provide a Jira issue key (e.g., 'PROJ-123').",
        ));
    }

    if key.len() > 100 {
        return Err(AtlassianMcpError::invalid_param(
            "issue_key",
            "Issue key cannot exceed 100 characters",
        ));
    }

    if key.chars().all(|c| c.is_ascii_digit()) {
        return Ok(key.to_string());
    }

    let normalized = key.to_uppercase();
    let valid = match normalized.rsplit_once('-') {
        Some((project, number)) => {
            project.starts_with(|c: char| c.is_ascii_alphabetic())
                && project.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !number.is_empty()
                && number.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    };

    if !valid {
        return Err(AtlassianMcpError::invalid_param(
            "issue_key",
            format!(
                "'{}' is not a valid issue key; expected PROJECT-NUMBER format (e.g., 'PROJ-123')",
                key
            ),
        ));
    }

    Ok(normalized)
}

/// Reject empty or whitespace-only string parameters
pub fn require_non_empty(parameter: &str, value: &str) -> AtlassianMcpResult<()> {
    if value.trim().is_empty() {
        return Err(AtlassianMcpError::invalid_param(
            parameter,
            format!("{} cannot be empty", parameter),
        ));
    }
    Ok(())
}

/// Reject zero page sizes
pub fn require_positive(parameter: &str, value: u32) -> AtlassianMcpResult<()> {
    if value == 0 {
        return Err(AtlassianMcpError::invalid_param(
            parameter,
            format!("{} must be greater than 0", parameter),
        ));
    }
    Ok(())
}

/// Status line followed by the 2-space indented JSON document
pub fn status_with_json(status: &str, value: &Value) -> AtlassianMcpResult<String> {
    Ok(format!("{}\n{}", status, serde_json::to_string_pretty(value)?))
}
