/// Issue aggregation: issue + changelog + comments + subtasks
mod common;

use assert_matches::assert_matches;
use atlassian_mcp_server::error::AtlassianMcpError;
use atlassian_mcp_server::tools::{
    GetIssueDetailsParams, GetIssueDetailsTool, GetIssueTypeParams, GetUserIssuesParams,
};
use common::{server_with, FakeApi};
use serde_json::{json, Value};

fn parent_issue() -> Value {
    json!({
        "id": "10100",
        "key": "PROJ-1",
        "fields": {
            "summary": "Parent story",
            "description": {"type": "doc", "version": 1, "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "Do the thing"}]}
            ]},
            "status": {"name": "In Progress"},
            "issuetype": {"name": "Story"},
            "priority": null,
            "project": {"name": "Project", "key": "PROJ"},
            "assignee": {"displayName": "Ada"},
            "comment": {"comments": [
                {"author": {"displayName": "Grace"}, "body": {"type": "doc", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "LGTM"}]}
                ]}}
            ]},
            "subtasks": [{"key": "PROJ-2"}, {"key": "PROJ-3"}]
        },
        "changelog": {"histories": [
            {"author": {"displayName": "Ada"}, "created": "2025-01-02", "items": [
                {"field": "status", "fromString": "To Do", "toString": "In Progress"}
            ]}
        ]}
    })
}

fn subtask() -> Value {
    json!({
        "key": "PROJ-2",
        "fields": {
            "summary": "Subtask one",
            "description": "already plain",
            "status": {"name": "Done"},
            "assignee": {"displayName": "Linus"},
            "comment": {"comments": [{"author": {"displayName": "Ada"}, "body": "ok"}]},
            "subtasks": [{"key": "PROJ-9"}]
        },
        "changelog": {"histories": [
            {"author": {"displayName": "Linus"}, "created": "2025-01-03", "items": [
                {"field": "resolution", "fromString": null, "toString": "Done"}
            ]}
        ]}
    })
}

fn fake_instance() -> FakeApi {
    FakeApi::new()
        .get("/rest/api/3/issue/PROJ-1", &[("expand", "changelog")], parent_issue())
        .get("/rest/api/3/issue/PROJ-2", &[("expand", "changelog")], subtask())
        .get_fails(
            "/rest/api/3/issue/PROJ-3",
            &[],
            403,
            "{\"errorMessages\":[\"No permission\"]}",
        )
}

#[tokio::test]
async fn test_issue_detail_expands_subtasks_and_records_failures() {
    let fake = fake_instance().into_arc();
    let server = server_with(fake.clone());

    let detail = server
        .get_jira_issue(GetIssueDetailsParams {
            issue_key: "proj-1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(detail.key, "PROJ-1");
    assert_eq!(detail.description, "Do the thing");
    assert_eq!(detail.priority, "");
    assert_eq!(detail.assignee, "Ada");
    assert_eq!(detail.comments[0].author, "Grace");
    assert_eq!(detail.comments[0].body, "LGTM");
    assert_eq!(detail.history[0].items[0].to, "In Progress");

    assert_eq!(detail.subtasks.len(), 1);
    let expanded = &detail.subtasks[0];
    assert_eq!(expanded.key, "PROJ-2");
    assert_eq!(expanded.assignee, "Linus");
    assert_eq!(expanded.description, "already plain");
    assert_eq!(expanded.comments[0].body, "ok");
    assert_eq!(expanded.history[0].items[0].from, "");

    assert_eq!(detail.subtask_errors.len(), 1);
    assert_eq!(detail.subtask_errors[0].key, "PROJ-3");
    assert!(detail.subtask_errors[0].error.contains("403"));

    // one level deep: PROJ-9 is never fetched, and requests go out in order
    let paths: Vec<String> = fake.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(
        paths,
        vec![
            "/rest/api/3/issue/PROJ-1",
            "/rest/api/3/issue/PROJ-2",
            "/rest/api/3/issue/PROJ-3"
        ]
    );
    assert_eq!(
        fake.calls()[1].param("fields"),
        Some("summary,description,status,comment,assignee")
    );
}

#[tokio::test]
async fn test_top_level_failure_propagates_http_error() {
    let fake = FakeApi::new()
        .get_fails("/rest/api/3/issue/PROJ-404", &[], 404, "Issue does not exist")
        .into_arc();
    let tool = GetIssueDetailsTool::new(fake);

    let err = tool
        .execute(GetIssueDetailsParams {
            issue_key: "PROJ-404".to_string(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, AtlassianMcpError::Http { status: 404, ref body } if body == "Issue does not exist");
    assert_eq!(err.error_code(), -32005);
}

#[tokio::test]
async fn test_invalid_issue_key_is_rejected_before_any_request() {
    let fake = FakeApi::new().into_arc();
    let tool = GetIssueDetailsTool::new(fake.clone());

    let err = tool
        .execute(GetIssueDetailsParams {
            issue_key: "not a key".to_string(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, AtlassianMcpError::InvalidParameter { .. });
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_batched_assignee_path_skips_failed_issues() {
    let fake = fake_instance()
        .get(
            "/rest/api/3/search/jql",
            &[("jql", "assignee = \"dev@example.com\" ORDER BY updated DESC")],
            json!({
                "total": 12,
                "issues": [{"key": "PROJ-1"}, {"key": "PROJ-3"}, {"id": "no-key"}]
            }),
        )
        .into_arc();
    let server = server_with(fake.clone());

    let result = server
        .get_issues_by_assignee(GetUserIssuesParams {
            assignee_email: "dev@example.com".to_string(),
            max_results: None,
            start_at: Some(5),
        })
        .await
        .unwrap();

    assert_eq!(result.total_issues, 12);
    assert_eq!(result.returned_issues, 1);
    assert_eq!(result.start_at, 5);
    assert_eq!(result.max_results, 50);
    assert_eq!(result.issues[0].key, "PROJ-1");
    assert_eq!(result.issues[0].subtasks.len(), 1);
    assert_eq!(result.failed_issues.len(), 1);
    assert_eq!(result.failed_issues[0].key, "PROJ-3");

    let search = &fake.calls_to("/rest/api/3/search/jql")[0];
    assert_eq!(search.param("maxResults"), Some("50"));
    assert_eq!(search.param("startAt"), Some("5"));
}

#[tokio::test]
async fn test_batched_assignee_search_failure_is_hard() {
    let fake = FakeApi::new()
        .get_fails("/rest/api/3/search/jql", &[], 400, "Bad JQL")
        .into_arc();
    let server = server_with(fake);

    let err = server
        .get_issues_by_assignee(GetUserIssuesParams {
            assignee_email: "dev@example.com".to_string(),
            max_results: Some(5),
            start_at: None,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Bad JQL"));
}

#[tokio::test]
async fn test_issue_type_lookup() {
    let fake = FakeApi::new()
        .get(
            "/rest/api/3/issue/PROJ-2",
            &[("fields", "issuetype,key,summary")],
            json!({
                "key": "PROJ-2",
                "fields": {"issuetype": {"id": "10003", "name": "Sub-task", "subtask": true}}
            }),
        )
        .into_arc();
    let server = server_with(fake);

    let result = server
        .get_jira_issue_type(GetIssueTypeParams {
            issue_key: "PROJ-2".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.issue_type, "Sub-task");
    assert_eq!(result.issue_type_id, "10003");
    assert!(result.is_subtask);
}
