/// Live tests against a real Atlassian Cloud instance
///
/// Credentials come from `.env` (ATLASSIAN_INSTANCE_URL, ATLASSIAN_EMAIL,
/// ATLASSIAN_API_TOKEN). Run with `cargo test -- --ignored`.
mod common;

use common::{test_issue_key, test_project_key, McpTestClient};
use serde_json::json;

#[test]
#[ignore]
fn test_connection_with_real_instance() {
    let mut client = McpTestClient::new().expect("Failed to create test client");

    let response = client
        .call_tool("test_connection", json!({}))
        .expect("Failed to call test_connection");
    let text = McpTestClient::extract_tool_text(&response).expect("No text result");

    println!("{}", text);
    assert!(text.contains("Connection successful"));
}

#[test]
#[ignore]
fn test_get_issue_with_real_instance() {
    let mut client = McpTestClient::new().expect("Failed to create test client");

    let response = client
        .call_tool("get_jira_issue", json!({"issue_key": test_issue_key()}))
        .expect("Failed to call get_jira_issue");
    let issue = McpTestClient::extract_tool_result(&response).expect("Invalid result");

    println!(
        "✅ get_jira_issue:\n{}",
        serde_json::to_string_pretty(&issue).unwrap()
    );
    assert_eq!(issue["key"], test_issue_key());
    assert!(issue["comments"].is_array());
    assert!(issue["history"].is_array());
}

#[test]
#[ignore]
fn test_project_issues_with_real_instance() {
    let mut client = McpTestClient::new().expect("Failed to create test client");

    let response = client
        .call_tool(
            "get_all_issues_in_project",
            json!({"project_key": test_project_key(), "max_results": 5}),
        )
        .expect("Failed to call get_all_issues_in_project");
    let result = McpTestClient::extract_tool_result(&response).expect("Invalid result");

    assert_eq!(result["project_key"], test_project_key());
    assert!(result["returned_issues"].as_u64().unwrap() <= 5);
}

#[test]
#[ignore]
fn test_boards_and_sprint_lookup_with_real_instance() {
    let mut client = McpTestClient::new().expect("Failed to create test client");

    let response = client
        .call_tool("get_all_boards", json!({"max_results": 5}))
        .expect("Failed to call get_all_boards");
    let boards = McpTestClient::extract_tool_result(&response).expect("Invalid result");
    assert!(boards["boards"].is_array());

    let response = client
        .call_tool(
            "get_sprint_issues_by_name",
            json!({"sprint_name": "no such sprint, hopefully"}),
        )
        .expect("Failed to call get_sprint_issues_by_name");
    let lookup = McpTestClient::extract_tool_result(&response).expect("Invalid result");
    assert_eq!(lookup["found"], false);
}

#[test]
#[ignore]
fn test_confluence_spaces_with_real_instance() {
    let mut client = McpTestClient::new().expect("Failed to create test client");

    let response = client
        .call_tool("get_confluence_spaces", json!({"limit": 3}))
        .expect("Failed to call get_confluence_spaces");
    let result = McpTestClient::extract_tool_result(&response).expect("Invalid result");

    assert!(result["returned_spaces"].as_u64().unwrap() <= 3);
}

#[test]
#[ignore]
fn test_linked_confluence_pages_with_real_instance() {
    let mut client = McpTestClient::new().expect("Failed to create test client");

    let response = client
        .call_tool(
            "get_jira_issue_confluence_content",
            json!({"issue_key": test_issue_key()}),
        )
        .expect("Failed to call get_jira_issue_confluence_content");
    let result = McpTestClient::extract_tool_result(&response).expect("Invalid result");

    assert_eq!(
        result["confluence_pages_count"].as_u64().unwrap() as usize,
        result["confluence_pages"].as_array().unwrap().len()
    );
}
