//! Tools module for the Atlassian MCP Server
//!
//! Contains all the MCP tools that expose flattened Jira and Confluence views.

pub mod add_comment;
pub mod common;
pub mod confluence;
pub mod create_issue;
pub mod epics;
pub mod issue_details;
pub mod linked_pages;
pub mod project_issues;
pub mod sprints;
pub mod transitions;
pub mod user_issues;

pub use add_comment::*;
pub use confluence::*;
pub use create_issue::*;
pub use epics::*;
pub use issue_details::*;
pub use linked_pages::*;
pub use project_issues::*;
pub use sprints::*;
pub use transitions::*;
pub use user_issues::*;
