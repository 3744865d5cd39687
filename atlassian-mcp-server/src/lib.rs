//! Atlassian MCP Server Library
//!
//! A Model Context Protocol server that proxies Jira and Confluence and
//! reshapes their responses into flat JSON an AI agent can consume without
//! knowing the Atlassian REST APIs.
//!
//! ## Features
//!
//! - **Issue aggregation**: issue, changelog, comments and subtasks in one document
//! - **Plain text**: ADF descriptions and comments flattened to text
//! - **Sprint lookup by name**: scans boards and sprint states in a fixed order
//! - **Epic children**: JQL search with an id-based fallback
//! - **Confluence**: spaces, pages, and pages linked from Jira issues
//! - **Error Handling**: MCP-compliant error codes and messages

use crate::atlassian_client::{AtlassianClient, RemoteApi};
use crate::config::AtlassianConfig;
use crate::error::AtlassianMcpResult;
use crate::tools::common::impl_pretty_display;
use crate::tools::{
    AddCommentParams, AddCommentTool, BoardEpicIssuesParams, BoardEpicIssuesResult,
    BoardEpicIssuesTool, CreateIssueParams, CreateIssueTool, CreatePageParams, CreatePageTool,
    EpicIssuesParams, EpicIssuesResult, EpicIssuesTool, FindSprintParams, FindSprintTool,
    GetIssueDetailsParams, GetIssueDetailsTool, GetIssueTypeParams, GetIssueTypeTool,
    GetPageParams, GetPageTool, GetTransitionsParams, GetTransitionsResult, GetTransitionsTool,
    GetUserIssuesParams, GetUserIssuesResult, GetUserIssuesTool, IssueDetail, IssueTypeResult,
    LinkedPagesParams, LinkedPagesResult, LinkedPagesTool, ListBoardsParams, ListBoardsResult,
    ListBoardsTool, ListEpicsParams, ListEpicsResult, ListEpicsTool, ListPagesParams,
    ListPagesResult, ListPagesTool, ListSpacesParams, ListSpacesResult, ListSpacesTool,
    ListSprintsParams, ListSprintsResult, ListSprintsTool, PageContent, ProjectIssuesParams,
    ProjectIssuesResult, ProjectIssuesTool, SprintIssuesByNameParams, SprintIssuesByNameTool,
    SprintIssuesLookup, SprintLocator, SprintLookup, TransitionIssueParams, TransitionIssueTool,
    UpdateIssueParams, UpdateIssueTool, UpdatePageParams, UpdatePageTool,
};

use pulseengine_mcp_macros::{mcp_server, mcp_tools};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

// Re-export modules for external use
pub mod adf;
pub mod atlassian_client;
pub mod config;
pub mod error;
pub mod tools;

const SERVER_NAME: &str = "Atlassian MCP Server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of tools registered in the `#[mcp_tools]` block below
const TOOLS_COUNT: usize = 24;

/// Server status information
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AtlassianServerStatus {
    pub server_name: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub instance_url: String,
    pub connection_status: String,
    pub authenticated_user: Option<String>,
    pub tools_count: usize,
}

impl_pretty_display!(AtlassianServerStatus);

/// Atlassian MCP Server
///
/// Every public method in the `#[mcp_tools]` block is exposed as an MCP tool.
/// Each tool invocation works on fresh data; nothing is cached between calls.
#[mcp_server(
    name = "Atlassian MCP Server",
    version = "0.1.0",
    description = "Flattened Jira and Confluence views for AI agents",
    auth = "disabled"
)]
#[derive(Clone)]
pub struct AtlassianMcpServer {
    /// Server start time for uptime calculation
    start_time: Instant,

    /// Remote API used by every tool
    api: Arc<dyn RemoteApi>,

    /// Configuration
    config: Arc<AtlassianConfig>,

    /// Tool implementations
    issue_details_tool: Arc<GetIssueDetailsTool>,
    issue_type_tool: Arc<GetIssueTypeTool>,
    user_issues_tool: Arc<GetUserIssuesTool>,
    list_boards_tool: Arc<ListBoardsTool>,
    list_sprints_tool: Arc<ListSprintsTool>,
    find_sprint_tool: Arc<FindSprintTool>,
    sprint_issues_tool: Arc<SprintIssuesByNameTool>,
    epic_issues_tool: Arc<EpicIssuesTool>,
    board_epic_issues_tool: Arc<BoardEpicIssuesTool>,
    list_epics_tool: Arc<ListEpicsTool>,
    project_issues_tool: Arc<ProjectIssuesTool>,
    create_issue_tool: Arc<CreateIssueTool>,
    update_issue_tool: Arc<UpdateIssueTool>,
    add_comment_tool: Arc<AddCommentTool>,
    get_transitions_tool: Arc<GetTransitionsTool>,
    transition_issue_tool: Arc<TransitionIssueTool>,
    list_spaces_tool: Arc<ListSpacesTool>,
    list_pages_tool: Arc<ListPagesTool>,
    get_page_tool: Arc<GetPageTool>,
    create_page_tool: Arc<CreatePageTool>,
    update_page_tool: Arc<UpdatePageTool>,
    linked_pages_tool: Arc<LinkedPagesTool>,
}

impl Default for AtlassianMcpServer {
    fn default() -> Self {
        // The macro requires Default; real servers come from `new()` or `with_config()`
        panic!(
            "AtlassianMcpServer cannot be created with default(). Use AtlassianMcpServer::new() instead."
        )
    }
}

impl AtlassianMcpServer {
    /// Create a new server from environment / file configuration
    #[instrument]
    pub async fn new() -> AtlassianMcpResult<Self> {
        info!("Initializing Atlassian MCP Server");

        let config = AtlassianConfig::load()?;
        info!("Configuration loaded successfully");

        Self::with_config(config).await
    }

    /// Create server with an explicit configuration
    #[instrument(skip(config))]
    pub async fn with_config(mut config: AtlassianConfig) -> AtlassianMcpResult<Self> {
        config.normalize();
        config.validate()?;
        let config = Arc::new(config);

        let client = AtlassianClient::new(Arc::clone(&config))?;
        info!("Atlassian client initialized for {}", client.instance_url());

        match client.current_user().await {
            Ok(user) => info!("Authenticated as {}", user.display_name),
            Err(e) => warn!("Could not retrieve current user information: {}", e),
        }

        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Create server on top of any [`RemoteApi`] implementation
    pub fn with_api(config: Arc<AtlassianConfig>, api: Arc<dyn RemoteApi>) -> Self {
        let locator = || SprintLocator::new(Arc::clone(&api), config.board_scan_limit);

        let server = Self {
            start_time: Instant::now(),
            issue_details_tool: Arc::new(GetIssueDetailsTool::new(Arc::clone(&api))),
            issue_type_tool: Arc::new(GetIssueTypeTool::new(Arc::clone(&api))),
            user_issues_tool: Arc::new(GetUserIssuesTool::new(Arc::clone(&api))),
            list_boards_tool: Arc::new(ListBoardsTool::new(Arc::clone(&api))),
            list_sprints_tool: Arc::new(ListSprintsTool::new(Arc::clone(&api))),
            find_sprint_tool: Arc::new(FindSprintTool::new(locator())),
            sprint_issues_tool: Arc::new(SprintIssuesByNameTool::new(locator())),
            epic_issues_tool: Arc::new(EpicIssuesTool::new(Arc::clone(&api))),
            board_epic_issues_tool: Arc::new(BoardEpicIssuesTool::new(Arc::clone(&api))),
            list_epics_tool: Arc::new(ListEpicsTool::new(Arc::clone(&api))),
            project_issues_tool: Arc::new(ProjectIssuesTool::new(Arc::clone(&api))),
            create_issue_tool: Arc::new(CreateIssueTool::new(Arc::clone(&api))),
            update_issue_tool: Arc::new(UpdateIssueTool::new(Arc::clone(&api))),
            add_comment_tool: Arc::new(AddCommentTool::new(Arc::clone(&api))),
            get_transitions_tool: Arc::new(GetTransitionsTool::new(Arc::clone(&api))),
            transition_issue_tool: Arc::new(TransitionIssueTool::new(Arc::clone(&api))),
            list_spaces_tool: Arc::new(ListSpacesTool::new(Arc::clone(&api))),
            list_pages_tool: Arc::new(ListPagesTool::new(Arc::clone(&api))),
            get_page_tool: Arc::new(GetPageTool::new(Arc::clone(&api))),
            create_page_tool: Arc::new(CreatePageTool::new(Arc::clone(&api))),
            update_page_tool: Arc::new(UpdatePageTool::new(Arc::clone(&api))),
            linked_pages_tool: Arc::new(LinkedPagesTool::new(Arc::clone(&api))),
            api,
            config,
        };

        info!("Atlassian MCP Server initialized successfully");
        server
    }

    /// Get server uptime in seconds
    fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// All public methods in this impl block become MCP tools automatically
/// The #[mcp_tools] macro discovers these methods and exposes them via MCP
#[mcp_tools]
impl AtlassianMcpServer {
    /// Get a Jira issue with description, comments, change history and subtasks
    ///
    /// Subtasks are expanded one level deep. A subtask that cannot be fetched
    /// is listed under `subtask_errors` instead of failing the call.
    ///
    /// # Examples
    /// - `{"issue_key": "PROJ-123"}`
    #[instrument(skip(self))]
    pub async fn get_jira_issue(&self, params: GetIssueDetailsParams) -> anyhow::Result<IssueDetail> {
        self.issue_details_tool.execute(params).await.map_err(|e| {
            error!("get_jira_issue failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get the issue type of a Jira issue
    #[instrument(skip(self))]
    pub async fn get_jira_issue_type(
        &self,
        params: GetIssueTypeParams,
    ) -> anyhow::Result<IssueTypeResult> {
        self.issue_type_tool.execute(params).await.map_err(|e| {
            error!("get_jira_issue_type failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get all issues assigned to a user, each with full details
    ///
    /// # Examples
    /// - `{"assignee_email": "dev@example.com"}`
    /// - `{"assignee_email": "dev@example.com", "max_results": 10, "start_at": 10}`
    #[instrument(skip(self))]
    pub async fn get_issues_by_assignee(
        &self,
        params: GetUserIssuesParams,
    ) -> anyhow::Result<GetUserIssuesResult> {
        self.user_issues_tool.execute(params).await.map_err(|e| {
            error!("get_issues_by_assignee failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// List Jira boards
    #[instrument(skip(self))]
    pub async fn get_all_boards(&self, params: ListBoardsParams) -> anyhow::Result<ListBoardsResult> {
        self.list_boards_tool.execute(params).await.map_err(|e| {
            error!("get_all_boards failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// List a board's sprints filtered by state (active, closed, future)
    ///
    /// # Examples
    /// - Active sprints: `{"board_id": 1}`
    /// - Closed sprints: `{"board_id": 1, "state": "closed"}`
    #[instrument(skip(self))]
    pub async fn get_board_sprints(
        &self,
        params: ListSprintsParams,
    ) -> anyhow::Result<ListSprintsResult> {
        self.list_sprints_tool.execute(params).await.map_err(|e| {
            error!("get_board_sprints failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Find a sprint on a board by name (case-insensitive)
    ///
    /// Returns `found: false` with a message when no sprint matches.
    #[instrument(skip(self))]
    pub async fn find_sprint_by_name(&self, params: FindSprintParams) -> anyhow::Result<SprintLookup> {
        self.find_sprint_tool.execute(params).await.map_err(|e| {
            error!("find_sprint_by_name failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get the issues of a sprint using only its name (searches all boards)
    ///
    /// # Examples
    /// - `{"sprint_name": "SCRUM Sprint 0"}`
    #[instrument(skip(self))]
    pub async fn get_sprint_issues_by_name(
        &self,
        params: SprintIssuesByNameParams,
    ) -> anyhow::Result<SprintIssuesLookup> {
        self.sprint_issues_tool.execute(params).await.map_err(|e| {
            error!("get_sprint_issues_by_name failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get all issues in an epic
    ///
    /// # Examples
    /// - `{"epic_key": "SCRUM-1"}`
    /// - `{"epic_key": "SCRUM-1", "max_results": 25, "start_at": 25}`
    #[instrument(skip(self))]
    pub async fn get_epic_issues(&self, params: EpicIssuesParams) -> anyhow::Result<EpicIssuesResult> {
        self.epic_issues_tool.execute(params).await.map_err(|e| {
            error!("get_epic_issues failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get an epic's issues through a board's Agile endpoint
    #[instrument(skip(self))]
    pub async fn get_epic_issues_by_board(
        &self,
        params: BoardEpicIssuesParams,
    ) -> anyhow::Result<BoardEpicIssuesResult> {
        self.board_epic_issues_tool.execute(params).await.map_err(|e| {
            error!("get_epic_issues_by_board failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get all issues in a project, newest first
    #[instrument(skip(self))]
    pub async fn get_all_issues_in_project(
        &self,
        params: ProjectIssuesParams,
    ) -> anyhow::Result<ProjectIssuesResult> {
        self.project_issues_tool.execute(params).await.map_err(|e| {
            error!("get_all_issues_in_project failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get all epics, optionally filtered by project
    #[instrument(skip(self))]
    pub async fn get_all_epics(&self, params: ListEpicsParams) -> anyhow::Result<ListEpicsResult> {
        self.list_epics_tool.execute(params).await.map_err(|e| {
            error!("get_all_epics failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get the transitions available from an issue's current status
    #[instrument(skip(self))]
    pub async fn get_jira_transitions(
        &self,
        params: GetTransitionsParams,
    ) -> anyhow::Result<GetTransitionsResult> {
        self.get_transitions_tool.execute(params).await.map_err(|e| {
            error!("get_jira_transitions failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Create a Jira issue
    ///
    /// # Examples
    /// - `{"project_key": "PROJ", "summary": "Fix login"}`
    /// - `{"project_key": "PROJ", "summary": "Crash on save", "description": "Steps...", "issue_type": "Bug"}`
    #[instrument(skip(self))]
    pub async fn create_jira_issue(&self, params: CreateIssueParams) -> anyhow::Result<String> {
        self.create_issue_tool.execute(params).await.map_err(|e| {
            error!("create_jira_issue failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Update fields of a Jira issue
    ///
    /// # Examples
    /// - `{"issue_key": "PROJ-1", "fields": {"summary": "New title"}}`
    #[instrument(skip(self))]
    pub async fn update_jira_issue(&self, params: UpdateIssueParams) -> anyhow::Result<String> {
        self.update_issue_tool.execute(params).await.map_err(|e| {
            error!("update_jira_issue failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Add a comment to a Jira issue
    #[instrument(skip(self))]
    pub async fn add_jira_comment(&self, params: AddCommentParams) -> anyhow::Result<String> {
        self.add_comment_tool.execute(params).await.map_err(|e| {
            error!("add_jira_comment failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Transition a Jira issue to a new status
    ///
    /// Use get_jira_transitions to find the transition ID.
    #[instrument(skip(self))]
    pub async fn transition_jira_issue(
        &self,
        params: TransitionIssueParams,
    ) -> anyhow::Result<String> {
        self.transition_issue_tool.execute(params).await.map_err(|e| {
            error!("transition_jira_issue failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// List Confluence spaces
    #[instrument(skip(self))]
    pub async fn get_confluence_spaces(
        &self,
        params: ListSpacesParams,
    ) -> anyhow::Result<ListSpacesResult> {
        self.list_spaces_tool.execute(params).await.map_err(|e| {
            error!("get_confluence_spaces failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// List pages in a Confluence space
    #[instrument(skip(self))]
    pub async fn get_confluence_pages(
        &self,
        params: ListPagesParams,
    ) -> anyhow::Result<ListPagesResult> {
        self.list_pages_tool.execute(params).await.map_err(|e| {
            error!("get_confluence_pages failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get a Confluence page with its storage-format body
    #[instrument(skip(self))]
    pub async fn get_confluence_page(&self, params: GetPageParams) -> anyhow::Result<PageContent> {
        self.get_page_tool.execute(params).await.map_err(|e| {
            error!("get_confluence_page failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Create a Confluence page, optionally under a parent page
    #[instrument(skip(self, params))]
    pub async fn create_confluence_page(&self, params: CreatePageParams) -> anyhow::Result<String> {
        self.create_page_tool.execute(params).await.map_err(|e| {
            error!("create_confluence_page failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Update a Confluence page
    ///
    /// `version` is the page's current version; the update is sent as
    /// version + 1 and fails upstream if someone else saved in between.
    #[instrument(skip(self, params))]
    pub async fn update_confluence_page(&self, params: UpdatePageParams) -> anyhow::Result<String> {
        self.update_page_tool.execute(params).await.map_err(|e| {
            error!("update_confluence_page failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get the Confluence pages linked from a Jira issue, with their content
    ///
    /// Links whose page cannot be identified or fetched are still listed,
    /// with an `error` field instead of content.
    #[instrument(skip(self))]
    pub async fn get_jira_issue_confluence_content(
        &self,
        params: LinkedPagesParams,
    ) -> anyhow::Result<LinkedPagesResult> {
        self.linked_pages_tool.execute(params).await.map_err(|e| {
            error!("get_jira_issue_confluence_content failed: {}", e);
            anyhow::anyhow!(e)
        })
    }

    /// Get server status and connection information
    #[instrument(skip(self))]
    pub async fn get_server_status(&self) -> anyhow::Result<AtlassianServerStatus> {
        info!("Getting server status");

        let (connection_status, authenticated_user) = match self.api.current_user().await {
            Ok(user) => ("Connected".to_string(), Some(user.display_name)),
            Err(e) => (format!("Connection Error: {}", e), None),
        };

        Ok(AtlassianServerStatus {
            server_name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
            uptime_seconds: self.get_uptime_seconds(),
            instance_url: self.config.instance_url.clone(),
            connection_status,
            authenticated_user,
            tools_count: TOOLS_COUNT,
        })
    }

    /// Test the connection and authentication against the configured instance
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> anyhow::Result<String> {
        info!("Testing Atlassian connection");

        match self.api.current_user().await {
            Ok(user) => {
                let message = format!(
                    "✅ Connection successful!\n\
                     Instance URL: {}\n\
                     Authenticated as: {}\n\
                     Account ID: {}\n\
                     Email: {}",
                    self.config.instance_url,
                    user.display_name,
                    user.account_id,
                    user.email_address.as_deref().unwrap_or("Not provided")
                );
                info!("Connection test successful for user: {}", user.display_name);
                Ok(message)
            }
            Err(e) => {
                let message = format!(
                    "❌ Connection failed!\n\
                     Instance URL: {}\n\
                     Error: {}\n\
                     \n\
                     Please check:\n\
                     - ATLASSIAN_INSTANCE_URL is correct and accessible\n\
                     - ATLASSIAN_EMAIL and ATLASSIAN_API_TOKEN are valid\n\
                     - Network connectivity to the instance",
                    self.config.instance_url, e
                );
                error!("Connection test failed: {}", e);
                Ok(message)
            }
        }
    }
}
