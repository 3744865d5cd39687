/// Sprint lookup by name across boards and sprint states
mod common;

use atlassian_mcp_server::tools::{
    FindSprintParams, ListSprintsParams, SprintIssuesByNameParams, SprintIssuesLookup,
    SprintLookup,
};
use common::{server_with, FakeApi};
use serde_json::json;

const BOARDS: &str = "/rest/agile/1.0/board";

fn empty_sprints() -> serde_json::Value {
    json!({"isLast": true, "values": []})
}

/// Boards B1 (id 1) and B2 (id 2); only B2's closed list holds "Sprint X"
fn two_boards() -> FakeApi {
    FakeApi::new()
        .get(
            BOARDS,
            &[],
            json!({
                "total": 2,
                "isLast": true,
                "values": [
                    {"id": 1, "name": "B1", "type": "scrum"},
                    {"id": 2, "name": "B2", "type": "kanban"}
                ]
            }),
        )
        .get("/rest/agile/1.0/board/1/sprint", &[("state", "active")], empty_sprints())
        .get(
            "/rest/agile/1.0/board/1/sprint",
            &[("state", "closed")],
            json!({"values": [{"id": 10, "name": "Sprint Y", "state": "closed"}]}),
        )
        .get("/rest/agile/1.0/board/1/sprint", &[("state", "future")], empty_sprints())
        .get(
            "/rest/agile/1.0/board/2/sprint",
            &[("state", "active")],
            json!({"values": [{"id": 20, "name": "Sprint X2", "state": "active"}]}),
        )
        .get(
            "/rest/agile/1.0/board/2/sprint",
            &[("state", "closed")],
            json!({"values": [
                {"id": 21, "name": "Sprint X", "state": "closed",
                 "startDate": "2025-01-06T09:00:00.000Z", "endDate": "2025-01-20T09:00:00.000Z",
                 "completeDate": "2025-01-20T10:00:00.000Z", "goal": "Ship login"},
                {"id": 22, "name": "sprint x", "state": "closed"}
            ]}),
        )
        .get("/rest/agile/1.0/board/2/sprint", &[("state", "future")], empty_sprints())
        .get(
            "/rest/agile/1.0/sprint/21/issue",
            &[],
            json!({
                "total": 7,
                "issues": [
                    {"key": "B2-1", "fields": {"summary": "Login form", "status": {"name": "Done"},
                     "issuetype": {"name": "Story"}, "assignee": {"displayName": "Ada"},
                     "customfield_10016": 3.0}},
                    {"key": "B2-2", "fields": {"summary": "Logout", "assignee": null}}
                ]
            }),
        )
}

#[tokio::test]
async fn test_sprint_found_on_second_board_in_closed_state() {
    let fake = two_boards().into_arc();
    let server = server_with(fake.clone());

    let result = server
        .get_sprint_issues_by_name(SprintIssuesByNameParams {
            sprint_name: "sprint x".to_string(),
            max_results: None,
        })
        .await
        .unwrap();

    let SprintIssuesLookup::Found(found) = result else {
        panic!("expected the sprint to be found");
    };
    assert!(found.found);
    assert_eq!(found.board_info.board_id, 2);
    assert_eq!(found.board_info.board_type, "kanban");
    assert_eq!(found.sprint_info.sprint_id, 21);
    assert_eq!(found.sprint_info.sprint_name, "Sprint X");
    assert_eq!(found.sprint_info.goal.as_deref(), Some("Ship login"));
    assert_eq!(found.total_issues, 7);
    assert_eq!(found.returned_issues, 2);
    assert_eq!(found.issues[0].story_points, Some(3.0));
    assert_eq!(found.issues[1].assignee, "Unassigned");

    let scanned: Vec<(String, String)> = fake
        .calls()
        .iter()
        .filter(|c| c.path.ends_with("/sprint"))
        .map(|c| (c.path.clone(), c.param("state").unwrap_or_default().to_string()))
        .collect();
    assert_eq!(
        scanned,
        vec![
            ("/rest/agile/1.0/board/1/sprint".to_string(), "active".to_string()),
            ("/rest/agile/1.0/board/1/sprint".to_string(), "closed".to_string()),
            ("/rest/agile/1.0/board/1/sprint".to_string(), "future".to_string()),
            ("/rest/agile/1.0/board/2/sprint".to_string(), "active".to_string()),
            ("/rest/agile/1.0/board/2/sprint".to_string(), "closed".to_string()),
        ]
    );

    let board_call = &fake.calls_to(BOARDS)[0];
    assert_eq!(board_call.param("maxResults"), Some("100"));

    let issue_calls = fake.calls_to("/rest/agile/1.0/sprint/21/issue");
    assert_eq!(issue_calls.len(), 1);
    assert_eq!(issue_calls[0].param("maxResults"), Some("100"));
    assert_eq!(issue_calls[0].param("startAt"), Some("0"));
    assert!(issue_calls[0]
        .param("fields")
        .unwrap()
        .contains("customfield_10016"));
}

#[tokio::test]
async fn test_sprint_not_found_is_a_result_not_an_error() {
    let fake = two_boards().into_arc();
    let server = server_with(fake.clone());

    let result = server
        .get_sprint_issues_by_name(SprintIssuesByNameParams {
            sprint_name: "Sprint Z".to_string(),
            max_results: Some(10),
        })
        .await
        .unwrap();

    let SprintIssuesLookup::NotFound(missing) = result else {
        panic!("expected a not-found result");
    };
    assert!(!missing.found);
    assert_eq!(missing.message, "Sprint 'Sprint Z' not found in any board");

    // every board and state scanned, no issue fetch
    assert_eq!(
        fake.calls()
            .iter()
            .filter(|c| c.path.ends_with("/sprint"))
            .count(),
        6
    );
    assert!(fake.calls().iter().all(|c| !c.path.contains("/sprint/")));
}

#[tokio::test]
async fn test_find_sprint_on_single_board() {
    let fake = two_boards().into_arc();
    let server = server_with(fake.clone());

    let found = server
        .find_sprint_by_name(FindSprintParams {
            board_id: 2,
            sprint_name: "SPRINT X2".to_string(),
        })
        .await
        .unwrap();
    let SprintLookup::Found(found) = found else {
        panic!("expected a match in the active state");
    };
    assert_eq!(found.board_id, 2);
    assert_eq!(found.sprint.sprint_id, 20);
    assert_eq!(fake.calls().len(), 1);

    let missing = server
        .find_sprint_by_name(FindSprintParams {
            board_id: 1,
            sprint_name: "Sprint X".to_string(),
        })
        .await
        .unwrap();
    let rendered = serde_json::to_value(&missing).unwrap();
    assert_eq!(rendered["found"], false);
    assert_eq!(rendered["message"], "Sprint 'Sprint X' not found");
}

#[tokio::test]
async fn test_board_listing_failure_is_a_hard_error() {
    let fake = FakeApi::new()
        .get_fails(BOARDS, &[], 401, "{\"message\":\"Unauthorized\"}")
        .into_arc();
    let server = server_with(fake);

    let err = server
        .get_sprint_issues_by_name(SprintIssuesByNameParams {
            sprint_name: "Sprint X".to_string(),
            max_results: None,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 401"));
}

#[tokio::test]
async fn test_board_sprints_defaults_to_active() {
    let fake = two_boards().into_arc();
    let server = server_with(fake.clone());

    let result = server
        .get_board_sprints(ListSprintsParams {
            board_id: 2,
            state: None,
        })
        .await
        .unwrap();

    assert_eq!(result.state, "active");
    assert_eq!(result.sprints.len(), 1);
    assert_eq!(fake.calls()[0].param("state"), Some("active"));
}
