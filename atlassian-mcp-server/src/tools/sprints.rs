//! Board and sprint tools for Jira Agile
//!
//! Lists boards and sprints, and resolves a sprint by its display name.
//! Name lookup is a linear scan: boards in upstream order, and for each
//! board the sprint states `active`, `closed`, `future` in that order. The
//! first case-insensitive exact match wins.

use crate::atlassian_client::RemoteApi;
use crate::error::AtlassianMcpResult;
use crate::tools::common::{
    array_at, impl_pretty_display, opt_string_at, require_non_empty, require_positive,
    string_at, total_of, IssueRow,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Sprint states in the order they are scanned
pub const SPRINT_STATES: [&str; 3] = ["active", "closed", "future"];

const SPRINT_ISSUE_FIELDS: &str =
    "summary,status,assignee,priority,issuetype,created,updated,timetracking,progress,customfield_10016";

/// Parameters for the get_all_boards tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListBoardsParams {
    /// Starting offset for pagination (optional, default: 0)
    pub start_at: Option<u32>,

    /// Maximum boards to return (optional, default: 50)
    pub max_results: Option<u32>,
}

/// Board information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardInfo {
    pub board_id: u64,
    pub board_name: String,
    pub board_type: String,
}

impl BoardInfo {
    fn from_value(board: &Value) -> Self {
        BoardInfo {
            board_id: board.get("id").and_then(Value::as_u64).unwrap_or(0),
            board_name: string_at(board, "/name"),
            board_type: string_at(board, "/type"),
        }
    }
}

/// Result from the get_all_boards tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBoardsResult {
    pub total: u64,
    pub start_at: u32,
    pub max_results: u32,
    pub is_last: bool,
    pub boards: Vec<BoardInfo>,
}

/// Parameters for the get_board_sprints tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListSprintsParams {
    /// Board ID to list sprints from (required)
    pub board_id: u64,

    /// Sprint state filter (optional, default: "active")
    /// Values: "active", "future", "closed"
    pub state: Option<String>,
}

/// Sprint information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintInfo {
    pub sprint_id: u64,
    pub sprint_name: String,

    /// "future", "active", or "closed"
    pub state: String,

    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub complete_date: Option<String>,
    pub goal: Option<String>,
}

impl SprintInfo {
    fn from_value(sprint: &Value) -> Self {
        SprintInfo {
            sprint_id: sprint.get("id").and_then(Value::as_u64).unwrap_or(0),
            sprint_name: string_at(sprint, "/name"),
            state: string_at(sprint, "/state"),
            start_date: opt_string_at(sprint, "/startDate"),
            end_date: opt_string_at(sprint, "/endDate"),
            complete_date: opt_string_at(sprint, "/completeDate"),
            goal: opt_string_at(sprint, "/goal"),
        }
    }
}

/// Result from the get_board_sprints tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSprintsResult {
    pub board_id: u64,
    pub state: String,
    pub is_last: bool,
    pub sprints: Vec<SprintInfo>,
}

/// Parameters for the find_sprint_by_name tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FindSprintParams {
    /// Board ID to search (use get_all_boards to find this)
    pub board_id: u64,

    /// Sprint name, matched case-insensitively (e.g., "SCRUM Sprint 0")
    pub sprint_name: String,
}

/// A sprint resolved by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoundSprint {
    pub found: bool,
    pub board_id: u64,
    #[serde(flatten)]
    pub sprint: SprintInfo,
}

/// Nothing matched the requested name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintNotFound {
    pub found: bool,
    pub message: String,
}

impl SprintNotFound {
    fn on_board(name: &str) -> Self {
        Self {
            found: false,
            message: format!("Sprint '{}' not found", name),
        }
    }

    fn anywhere(name: &str) -> Self {
        Self {
            found: false,
            message: format!("Sprint '{}' not found in any board", name),
        }
    }
}

/// Result from the find_sprint_by_name tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SprintLookup {
    Found(FoundSprint),
    NotFound(SprintNotFound),
}

/// Parameters for the get_sprint_issues_by_name tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SprintIssuesByNameParams {
    /// Sprint name, matched case-insensitively across all boards
    pub sprint_name: String,

    /// Maximum issues to return (optional, default: 100)
    pub max_results: Option<u32>,
}

/// Sprint found on some board, with its issues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintIssues {
    pub found: bool,
    pub board_info: BoardInfo,
    pub sprint_info: SprintInfo,
    pub total_issues: u64,
    pub returned_issues: usize,
    pub issues: Vec<IssueRow>,
}

/// Result from the get_sprint_issues_by_name tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SprintIssuesLookup {
    Found(SprintIssues),
    NotFound(SprintNotFound),
}

impl_pretty_display!(
    ListBoardsResult,
    ListSprintsResult,
    SprintLookup,
    SprintIssuesLookup
);

fn sprint_path(board_id: u64) -> String {
    format!("/rest/agile/1.0/board/{}/sprint", board_id)
}

/// Fetch one page of boards
async fn list_boards(
    api: &dyn RemoteApi,
    start_at: u32,
    max_results: u32,
) -> AtlassianMcpResult<Value> {
    api.get(
        "/rest/agile/1.0/board",
        &[
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
        ],
    )
    .await
}

/// Fetch a board's sprints in one state
async fn list_sprints(api: &dyn RemoteApi, board_id: u64, state: &str) -> AtlassianMcpResult<Value> {
    debug!("Listing {} sprints on board {}", state, board_id);
    api.get(&sprint_path(board_id), &[("state", state.to_string())])
        .await
}

/// Resolves sprints by name across the state-partitioned sprint lists
pub struct SprintLocator {
    api: Arc<dyn RemoteApi>,
    board_scan_limit: u32,
}

impl SprintLocator {
    pub fn new(api: Arc<dyn RemoteApi>, board_scan_limit: u32) -> Self {
        Self {
            api,
            board_scan_limit,
        }
    }

    /// First sprint on `board_id` whose name matches, scanning states in order
    async fn scan_board(&self, board_id: u64, name: &str) -> AtlassianMcpResult<Option<SprintInfo>> {
        let wanted = name.to_lowercase();

        for state in SPRINT_STATES {
            let page = list_sprints(self.api.as_ref(), board_id, state).await?;
            let hit = array_at(&page, "/values")
                .iter()
                .find(|sprint| str_lower(sprint, "/name") == wanted);

            if let Some(sprint) = hit {
                return Ok(Some(SprintInfo::from_value(sprint)));
            }
        }

        Ok(None)
    }

    /// Resolve a sprint name on one board
    pub async fn find_sprint_by_name(&self, board_id: u64, name: &str) -> AtlassianMcpResult<SprintLookup> {
        Ok(match self.scan_board(board_id, name).await? {
            Some(sprint) => SprintLookup::Found(FoundSprint {
                found: true,
                board_id,
                sprint,
            }),
            None => SprintLookup::NotFound(SprintNotFound::on_board(name)),
        })
    }

    /// Resolve a sprint name across every board, then fetch its issues
    pub async fn find_sprint_across_boards(
        &self,
        name: &str,
        max_results: u32,
    ) -> AtlassianMcpResult<SprintIssuesLookup> {
        let boards = list_boards(self.api.as_ref(), 0, self.board_scan_limit).await?;

        for board in array_at(&boards, "/values") {
            let board_info = BoardInfo::from_value(board);

            if let Some(sprint) = self.scan_board(board_info.board_id, name).await? {
                info!(
                    "Found sprint '{}' ({}) on board {}",
                    sprint.sprint_name, sprint.sprint_id, board_info.board_id
                );

                let issues_page = self
                    .api
                    .get(
                        &format!("/rest/agile/1.0/sprint/{}/issue", sprint.sprint_id),
                        &[
                            ("maxResults", max_results.to_string()),
                            ("startAt", "0".to_string()),
                            ("fields", SPRINT_ISSUE_FIELDS.to_string()),
                        ],
                    )
                    .await?;

                let issues = IssueRow::from_page(&issues_page);
                return Ok(SprintIssuesLookup::Found(SprintIssues {
                    found: true,
                    board_info,
                    sprint_info: sprint,
                    total_issues: total_of(&issues_page),
                    returned_issues: issues.len(),
                    issues,
                }));
            }
        }

        Ok(SprintIssuesLookup::NotFound(SprintNotFound::anywhere(name)))
    }
}

fn str_lower(value: &Value, pointer: &str) -> String {
    string_at(value, pointer).to_lowercase()
}

/// Tool for listing boards
pub struct ListBoardsTool {
    api: Arc<dyn RemoteApi>,
}

impl ListBoardsTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: ListBoardsParams) -> AtlassianMcpResult<ListBoardsResult> {
        let start_at = params.start_at.unwrap_or(0);
        let max_results = params.max_results.unwrap_or(50);
        require_positive("max_results", max_results)?;

        info!("Listing boards (start_at: {}, max: {})", start_at, max_results);

        let page = list_boards(self.api.as_ref(), start_at, max_results).await?;
        let boards: Vec<BoardInfo> = array_at(&page, "/values")
            .iter()
            .map(BoardInfo::from_value)
            .collect();

        Ok(ListBoardsResult {
            total: total_of(&page),
            start_at,
            max_results,
            is_last: page.get("isLast").and_then(Value::as_bool).unwrap_or(true),
            boards,
        })
    }
}

/// Tool for listing a board's sprints in one state
pub struct ListSprintsTool {
    api: Arc<dyn RemoteApi>,
}

impl ListSprintsTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: ListSprintsParams) -> AtlassianMcpResult<ListSprintsResult> {
        let state = params
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("active")
            .to_lowercase();

        info!("Listing {} sprints for board {}", state, params.board_id);

        let page = list_sprints(self.api.as_ref(), params.board_id, &state).await?;
        let sprints: Vec<SprintInfo> = array_at(&page, "/values")
            .iter()
            .map(SprintInfo::from_value)
            .collect();

        info!("Found {} sprints for board {}", sprints.len(), params.board_id);

        Ok(ListSprintsResult {
            board_id: params.board_id,
            state,
            is_last: page.get("isLast").and_then(Value::as_bool).unwrap_or(true),
            sprints,
        })
    }
}

/// Tool for resolving a sprint name on one board
pub struct FindSprintTool {
    locator: SprintLocator,
}

impl FindSprintTool {
    pub fn new(locator: SprintLocator) -> Self {
        Self { locator }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: FindSprintParams) -> AtlassianMcpResult<SprintLookup> {
        require_non_empty("sprint_name", &params.sprint_name)?;
        info!(
            "Looking up sprint '{}' on board {}",
            params.sprint_name, params.board_id
        );
        self.locator
            .find_sprint_by_name(params.board_id, params.sprint_name.trim())
            .await
    }
}

/// Tool for resolving a sprint name across all boards
pub struct SprintIssuesByNameTool {
    locator: SprintLocator,
}

impl SprintIssuesByNameTool {
    pub fn new(locator: SprintLocator) -> Self {
        Self { locator }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        params: SprintIssuesByNameParams,
    ) -> AtlassianMcpResult<SprintIssuesLookup> {
        require_non_empty("sprint_name", &params.sprint_name)?;
        let max_results = params.max_results.unwrap_or(100);
        require_positive("max_results", max_results)?;

        info!("Looking up sprint '{}' across all boards", params.sprint_name);
        self.locator
            .find_sprint_across_boards(params.sprint_name.trim(), max_results)
            .await
    }
}
