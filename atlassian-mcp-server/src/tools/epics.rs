//! Epic tools
//!
//! The epic resolver searches for an epic's children with
//! `parent = KEY OR "Epic Link" = KEY`. Some Jira configurations reject that
//! query; when the search answers with an HTTP error it is retried once as
//! `parent = <epic id>`. An empty but successful answer is returned as is.

use crate::atlassian_client::RemoteApi;
use crate::error::{AtlassianMcpError, AtlassianMcpResult};
use crate::tools::common::{
    array_at, assignee_of, impl_pretty_display, jql_quote, require_positive, search_jql,
    string_at, total_of, validate_issue_key, IssueRow,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const EPIC_FIELDS: &str = "summary,status,project,created,updated,assignee";

const CHILD_FIELDS: &str =
    "summary,status,assignee,priority,issuetype,created,updated,parent,labels,customfield_10016,timetracking,progress";

const EPIC_LIST_FIELDS: &str = "summary,status,project,created,updated,assignee,priority";

/// Parameters for the get_epic_issues tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EpicIssuesParams {
    /// Epic issue key (e.g., "SCRUM-1")
    pub epic_key: String,

    /// Maximum issues to return (optional, default: 100)
    pub max_results: Option<u32>,

    /// Starting offset for pagination (optional, default: 0)
    pub start_at: Option<u32>,
}

/// Epic metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicInfo {
    pub epic_key: String,
    pub epic_id: String,
    pub epic_summary: String,
    pub epic_assignee: String,
    pub epic_status: String,
    pub project: String,
    pub created: String,
    pub updated: String,
}

impl EpicInfo {
    fn from_issue(epic_key: &str, epic: &Value) -> Self {
        EpicInfo {
            epic_key: epic_key.to_string(),
            epic_id: string_at(epic, "/id"),
            epic_summary: string_at(epic, "/fields/summary"),
            epic_assignee: string_at(epic, "/fields/assignee/displayName"),
            epic_status: string_at(epic, "/fields/status/name"),
            project: string_at(epic, "/fields/project/name"),
            created: string_at(epic, "/fields/created"),
            updated: string_at(epic, "/fields/updated"),
        }
    }
}

/// Result from the get_epic_issues tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicIssuesResult {
    pub epic_info: EpicInfo,

    /// Total reported by Jira, passed through unchanged
    pub total_issues: u64,
    pub returned_issues: usize,
    pub start_at: u32,
    pub max_results: u32,
    pub issues: Vec<IssueRow>,
}

/// Parameters for the get_epic_issues_by_board tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BoardEpicIssuesParams {
    /// Board ID
    pub board_id: u64,

    /// Epic issue key (e.g., "SCRUM-1")
    pub epic_key: String,

    /// Maximum issues to return (optional, default: 100)
    pub max_results: Option<u32>,
}

/// Short epic header used by the board-scoped listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardEpicInfo {
    pub epic_key: String,
    pub epic_summary: String,
    pub epic_status: String,
}

/// Result from the get_epic_issues_by_board tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardEpicIssuesResult {
    pub board_id: u64,
    pub epic_info: BoardEpicInfo,
    pub total_issues: u64,
    pub returned_issues: usize,
    pub issues: Vec<IssueRow>,
}

/// Parameters for the get_all_epics tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListEpicsParams {
    /// Project key to filter epics (optional, e.g., "SCRUM")
    pub project_key: Option<String>,

    /// Maximum epics to return (optional, default: 100)
    pub max_results: Option<u32>,

    /// Starting offset for pagination (optional, default: 0)
    pub start_at: Option<u32>,
}

/// One epic in a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicRow {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub project: String,
    pub project_key: String,
    pub assignee: String,
    pub priority: String,
    pub created: String,
    pub updated: String,
}

impl EpicRow {
    fn from_issue(epic: &Value) -> Self {
        EpicRow {
            key: string_at(epic, "/key"),
            summary: string_at(epic, "/fields/summary"),
            status: string_at(epic, "/fields/status/name"),
            project: string_at(epic, "/fields/project/name"),
            project_key: string_at(epic, "/fields/project/key"),
            assignee: assignee_of(epic),
            priority: string_at(epic, "/fields/priority/name"),
            created: string_at(epic, "/fields/created"),
            updated: string_at(epic, "/fields/updated"),
        }
    }
}

/// Result from the get_all_epics tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEpicsResult {
    pub total_epics: u64,
    pub returned_epics: usize,
    pub start_at: u32,
    pub max_results: u32,

    /// Project key, or "All projects"
    pub project_filter: String,
    pub epics: Vec<EpicRow>,
}

impl_pretty_display!(EpicIssuesResult, BoardEpicIssuesResult, ListEpicsResult);

/// Resolves an epic's children with a key-based query and an id-based fallback
pub struct EpicResolver {
    api: Arc<dyn RemoteApi>,
}

impl EpicResolver {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    pub async fn get_epic_children(
        &self,
        epic_key: &str,
        max_results: u32,
        start_at: u32,
    ) -> AtlassianMcpResult<EpicIssuesResult> {
        let epic = self
            .api
            .get(
                &format!("/rest/api/3/issue/{}", epic_key),
                &[("fields", EPIC_FIELDS.to_string())],
            )
            .await?;
        let epic_info = EpicInfo::from_issue(epic_key, &epic);

        let jql = format!(
            "parent = {} OR {} = {}",
            epic_key,
            jql_quote("Epic Link"),
            epic_key
        );

        let page = match search_jql(self.api.as_ref(), &jql, max_results, start_at, CHILD_FIELDS).await {
            Ok(page) => page,
            Err(e @ AtlassianMcpError::Http { .. }) if !epic_info.epic_id.is_empty() => {
                warn!(
                    "Epic search by key failed for {} ({}), retrying by id {}",
                    epic_key, e, epic_info.epic_id
                );
                let fallback = format!("parent = {}", epic_info.epic_id);
                search_jql(self.api.as_ref(), &fallback, max_results, start_at, CHILD_FIELDS).await?
            }
            Err(e) => return Err(e),
        };

        let issues = IssueRow::from_page(&page);
        debug!("Epic {} has {} issues on this page", epic_key, issues.len());

        Ok(EpicIssuesResult {
            epic_info,
            total_issues: total_of(&page),
            returned_issues: issues.len(),
            start_at,
            max_results,
            issues,
        })
    }
}

/// Tool for listing an epic's child issues through JQL
pub struct EpicIssuesTool {
    resolver: EpicResolver,
}

impl EpicIssuesTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self {
            resolver: EpicResolver::new(api),
        }
    }

    #[instrument(skip(self), fields(epic_key = %params.epic_key))]
    pub async fn execute(&self, params: EpicIssuesParams) -> AtlassianMcpResult<EpicIssuesResult> {
        let epic_key = validate_issue_key(&params.epic_key)?;
        let max_results = params.max_results.unwrap_or(100);
        let start_at = params.start_at.unwrap_or(0);
        require_positive("max_results", max_results)?;

        info!("Getting issues for epic {}", epic_key);

        let result = self
            .resolver
            .get_epic_children(&epic_key, max_results, start_at)
            .await?;

        info!(
            "Epic {} returned {} of {} issues",
            epic_key, result.returned_issues, result.total_issues
        );
        Ok(result)
    }
}

/// Tool for listing an epic's issues through a board's Agile endpoint
pub struct BoardEpicIssuesTool {
    api: Arc<dyn RemoteApi>,
}

impl BoardEpicIssuesTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        params: BoardEpicIssuesParams,
    ) -> AtlassianMcpResult<BoardEpicIssuesResult> {
        let epic_key = validate_issue_key(&params.epic_key)?;
        let max_results = params.max_results.unwrap_or(100);
        require_positive("max_results", max_results)?;

        info!(
            "Getting issues for epic {} on board {}",
            epic_key, params.board_id
        );

        let epic = self
            .api
            .get(
                &format!("/rest/api/3/issue/{}", epic_key),
                &[("fields", "summary,status".to_string())],
            )
            .await?;

        let page = self
            .api
            .get(
                &format!(
                    "/rest/agile/1.0/board/{}/epic/{}/issue",
                    params.board_id, epic_key
                ),
                &[
                    ("maxResults", max_results.to_string()),
                    ("startAt", "0".to_string()),
                    ("fields", CHILD_FIELDS.to_string()),
                ],
            )
            .await?;

        let issues = IssueRow::from_page(&page);
        Ok(BoardEpicIssuesResult {
            board_id: params.board_id,
            epic_info: BoardEpicInfo {
                epic_summary: string_at(&epic, "/fields/summary"),
                epic_status: string_at(&epic, "/fields/status/name"),
                epic_key,
            },
            total_issues: total_of(&page),
            returned_issues: issues.len(),
            issues,
        })
    }
}

/// Tool for listing epics, optionally within one project
pub struct ListEpicsTool {
    api: Arc<dyn RemoteApi>,
}

impl ListEpicsTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: ListEpicsParams) -> AtlassianMcpResult<ListEpicsResult> {
        let max_results = params.max_results.unwrap_or(100);
        let start_at = params.start_at.unwrap_or(0);
        require_positive("max_results", max_results)?;

        let project_key = params
            .project_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_uppercase);

        let jql = match &project_key {
            Some(key) => format!("project = {} AND type = Epic ORDER BY created DESC", jql_quote(key)),
            None => "type = Epic ORDER BY created DESC".to_string(),
        };

        info!("Listing epics with JQL: {}", jql);

        let page = search_jql(self.api.as_ref(), &jql, max_results, start_at, EPIC_LIST_FIELDS).await?;
        let epics: Vec<EpicRow> = array_at(&page, "/issues")
            .iter()
            .map(EpicRow::from_issue)
            .collect();

        Ok(ListEpicsResult {
            total_epics: total_of(&page),
            returned_epics: epics.len(),
            start_at,
            max_results,
            project_filter: project_key.unwrap_or_else(|| "All projects".to_string()),
            epics,
        })
    }
}
