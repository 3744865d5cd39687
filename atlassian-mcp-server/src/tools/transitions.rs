//! Issue Transition Tools
//!
//! Jira doesn't allow direct status updates; an issue moves between states by
//! triggering one of the transitions available from its current status.

use crate::atlassian_client::RemoteApi;
use crate::error::AtlassianMcpResult;
use crate::tools::common::{impl_pretty_display, require_non_empty, validate_issue_key};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Parameters for getting available transitions
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetTransitionsParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,
}

/// Information about an available transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionInfo {
    /// Unique identifier for the transition
    pub id: String,

    /// Human-readable name of the transition (e.g., "Start Progress", "Done")
    pub name: String,

    /// The target status this transition leads to
    pub to_status: String,

    /// The target status ID
    pub to_status_id: String,
}

/// Result from get_jira_transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransitionsResult {
    pub issue_key: String,
    pub transitions: Vec<TransitionInfo>,
}

impl_pretty_display!(GetTransitionsResult);

/// Parameters for transitioning an issue
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TransitionIssueParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Transition ID (use get_jira_transitions to find it)
    pub transition_id: String,
}

/// Jira's transition listing (for deserialization)
#[derive(Debug, Default, Deserialize)]
struct TransitionOptions {
    #[serde(default)]
    transitions: Vec<TransitionOption>,
}

#[derive(Debug, Deserialize)]
struct TransitionOption {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    to: Option<TransitionTo>,
}

#[derive(Debug, Default, Deserialize)]
struct TransitionTo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    id: String,
}

impl From<TransitionOption> for TransitionInfo {
    fn from(option: TransitionOption) -> Self {
        let to = option.to.unwrap_or_default();
        TransitionInfo {
            id: option.id,
            name: option.name,
            to_status: to.name,
            to_status_id: to.id,
        }
    }
}

fn transitions_path(issue_key: &str) -> String {
    format!("/rest/api/3/issue/{}/transitions", issue_key)
}

/// Tool for getting available transitions
pub struct GetTransitionsTool {
    api: Arc<dyn RemoteApi>,
}

impl GetTransitionsTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: GetTransitionsParams) -> AtlassianMcpResult<GetTransitionsResult> {
        let issue_key = validate_issue_key(&params.issue_key)?;
        info!("Getting available transitions for issue {}", issue_key);

        let response = self.api.get(&transitions_path(&issue_key), &[]).await?;
        let options: TransitionOptions = if response.is_null() {
            TransitionOptions::default()
        } else {
            serde_json::from_value(response)?
        };

        let transitions: Vec<TransitionInfo> = options
            .transitions
            .into_iter()
            .map(TransitionInfo::from)
            .collect();

        debug!("Found {} transitions for {}", transitions.len(), issue_key);

        Ok(GetTransitionsResult {
            issue_key,
            transitions,
        })
    }
}

/// Tool for transitioning issues
pub struct TransitionIssueTool {
    api: Arc<dyn RemoteApi>,
}

impl TransitionIssueTool {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, params: TransitionIssueParams) -> AtlassianMcpResult<String> {
        let issue_key = validate_issue_key(&params.issue_key)?;
        require_non_empty("transition_id", &params.transition_id)?;

        info!(
            "Transitioning issue {} with transition {}",
            issue_key, params.transition_id
        );

        self.api
            .post(
                &transitions_path(&issue_key),
                &json!({ "transition": { "id": params.transition_id.trim() } }),
            )
            .await?;

        Ok(format!("Transitioned issue {}", issue_key))
    }
}
