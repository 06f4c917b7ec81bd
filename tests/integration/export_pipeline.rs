//! End-to-end export tests: in-memory API and a mock ClickUp server

use crate::support::fake_api::{entry, task, window, FakeClickUp};
use clickup_time_export::{
    export_team, AssigneeTimeSummary, ExportConfig, ExportError, ExportOptions, Exporter,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn hierarchy() -> FakeClickUp {
    FakeClickUp::new()
        .with_space("s1", "Engineering", &["1"])
        .with_space_list("s1", "l1", "Inbox")
        .with_folder("s1", "f1", "Q3")
        .with_folder_list("f1", "l2", "Sprint")
}

#[tokio::test]
async fn test_export_joins_tasks_with_time_summary() {
    let api = Arc::new(
        hierarchy()
            .with_tasks("l1", vec![vec![task("t1", Some(("1", "ada")))]])
            .with_tasks("l2", vec![vec![task("t2", None)]])
            .with_entries(
                "l1",
                vec![entry(Some("t1"), ("1", "ada"), 3_600_000, true, "l1")],
            ),
    );

    let records = Exporter::new(api, ExportOptions::new(window()))
        .export("9001")
        .await
        .unwrap();

    assert_eq!(records.len(), 2);

    let t1 = &records[0];
    assert_eq!(t1.task_id, "t1");
    assert_eq!(t1.assignees, "ada");
    assert_eq!(t1.list_name, "Inbox");
    assert_eq!(t1.folder_id, None);
    assert_eq!(
        t1.time_summary,
        vec![AssigneeTimeSummary {
            assignee_id: "1".to_string(),
            assignee_name: "ada".to_string(),
            billable_ms: 3_600_000,
            non_billable_ms: 0,
            billable_hours: 1.0,
            non_billable_hours: 0.0,
        }]
    );

    let t2 = &records[1];
    assert_eq!(t2.task_id, "t2");
    assert_eq!(t2.folder_name.as_deref(), Some("Q3"));
    assert!(t2.time_summary.is_empty());
}

#[tokio::test]
async fn test_task_in_two_lists_yields_two_records() {
    let api = Arc::new(
        hierarchy()
            .with_tasks("l1", vec![vec![task("t1", None)]])
            .with_tasks("l2", vec![vec![task("t1", None)]])
            .with_entries(
                "l2",
                vec![entry(Some("t1"), ("1", "ada"), 1_800_000, false, "l2")],
            ),
    );

    let records = Exporter::new(api, ExportOptions::new(window()))
        .export("9001")
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].list_id, "l1");
    assert_eq!(records[1].list_id, "l2");
    for record in &records {
        assert_eq!(record.non_billable_ms(), 1_800_000);
        assert_eq!(record.time_summary[0].non_billable_hours, 0.5);
    }
}

#[tokio::test]
async fn test_entries_without_task_are_dropped() {
    let api = Arc::new(
        hierarchy()
            .with_tasks("l1", vec![vec![task("t1", None)]])
            .with_entries(
                "l1",
                vec![
                    entry(None, ("1", "ada"), 900_000, true, "l1"),
                    entry(Some("t1"), ("1", "ada"), 900_000, true, "l1"),
                    entry(Some("t1"), ("2", "grace"), 600_000, false, "l1"),
                ],
            ),
    );

    let records = Exporter::new(api, ExportOptions::new(window()))
        .export("9001")
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].billable_ms(), 900_000);
    assert_eq!(records[0].non_billable_ms(), 600_000);
    assert_eq!(records[0].time_summary.len(), 2);
}

#[tokio::test]
async fn test_failing_list_fails_export() {
    let api = Arc::new(hierarchy().failing_list("l2"));

    let err = Exporter::new(api, ExportOptions::new(window()))
        .export("9001")
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::RemoteApi(_)));
    assert_eq!(err.status(), 502);
}

async fn mock_json(
    server: &mut ServerGuard,
    path: &str,
    query: Matcher,
    body: serde_json::Value,
) -> mockito::Mock {
    server
        .mock("GET", path)
        .match_header("authorization", "pk_test")
        .match_query(query)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

fn config(server: &ServerGuard) -> ExportConfig {
    ExportConfig::new("pk_test", "9001", window())
        .with_base_url(server.url())
        .with_max_retries(2)
        .with_initial_backoff(Duration::from_millis(1))
}

#[tokio::test]
async fn test_export_team_over_http() {
    let mut server = Server::new_async().await;

    mock_json(
        &mut server,
        "/team/9001/space",
        Matcher::Any,
        json!({"spaces": [{"id": "s1", "name": "Engineering", "members": [
            {"user": {"id": 1, "username": "ada"}}
        ]}]}),
    )
    .await;
    mock_json(
        &mut server,
        "/space/s1/list",
        Matcher::Any,
        json!({"lists": [{"id": "l1", "name": "Inbox"}]}),
    )
    .await;
    mock_json(
        &mut server,
        "/space/s1/folder",
        Matcher::Any,
        json!({"folders": [{"id": "f1", "name": "Q3"}]}),
    )
    .await;
    mock_json(
        &mut server,
        "/folder/f1/list",
        Matcher::Any,
        json!({"lists": [{"id": "l2", "name": "Sprint"}]}),
    )
    .await;
    mock_json(
        &mut server,
        "/list/l1/task",
        Matcher::UrlEncoded("page".into(), "0".into()),
        json!({"tasks": [{
            "id": "t1",
            "name": "Write report",
            "status": {"status": "in progress"},
            "assignees": [{"id": 1, "username": "ada"}],
            "date_created": "1735689600000",
            "time_estimate": 7200000
        }], "last_page": true}),
    )
    .await;
    mock_json(
        &mut server,
        "/list/l2/task",
        Matcher::UrlEncoded("page".into(), "0".into()),
        json!({"tasks": [{"id": "t2", "name": "Review"}], "last_page": true}),
    )
    .await;
    let entries = mock_json(
        &mut server,
        "/team/9001/time_entries",
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("list_id".into(), "l1".into()),
            Matcher::UrlEncoded("assignee".into(), "1".into()),
        ]),
        json!({"data": [{
            "id": "e1",
            "task": {"id": "t1"},
            "user": {"id": 1, "username": "ada"},
            "duration": "3600000",
            "billable": true
        }]}),
    )
    .await;
    mock_json(
        &mut server,
        "/team/9001/time_entries",
        Matcher::UrlEncoded("list_id".into(), "l2".into()),
        json!({"data": []}),
    )
    .await;

    let records = export_team(&config(&server)).await.unwrap();

    assert_eq!(records.len(), 2);
    let t1 = &records[0];
    assert_eq!(t1.task_name, "Write report");
    assert_eq!(t1.status.as_deref(), Some("in progress"));
    assert_eq!(t1.date_created.as_deref(), Some("2025-01-01T00:00:00.000Z"));
    assert_eq!(t1.time_estimate_hours, Some(2.0));
    assert_eq!(t1.time_summary.len(), 1);
    assert_eq!(t1.time_summary[0].billable_hours, 1.0);
    assert_eq!(t1.time_summary[0].non_billable_hours, 0.0);

    assert_eq!(records[1].task_id, "t2");
    assert_eq!(records[1].folder_name.as_deref(), Some("Q3"));

    entries.assert_async().await;
}

#[tokio::test]
async fn test_export_team_fails_fast_on_server_error() {
    let mut server = Server::new_async().await;

    mock_json(
        &mut server,
        "/team/9001/space",
        Matcher::Any,
        json!({"spaces": [{"id": "s1", "name": "Engineering"}]}),
    )
    .await;
    mock_json(
        &mut server,
        "/space/s1/list",
        Matcher::Any,
        json!({"lists": [
            {"id": "l1", "name": "One"},
            {"id": "l2", "name": "Two"},
            {"id": "l3", "name": "Three"}
        ]}),
    )
    .await;
    mock_json(&mut server, "/space/s1/folder", Matcher::Any, json!({"folders": []})).await;
    for list in ["l1", "l3"] {
        mock_json(
            &mut server,
            &format!("/list/{list}/task"),
            Matcher::Any,
            json!({"tasks": [], "last_page": true}),
        )
        .await;
    }
    mock_json(&mut server, "/team/9001/time_entries", Matcher::Any, json!({"data": []})).await;
    let broken = server
        .mock("GET", "/list/l2/task")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let err = export_team(&config(&server)).await.unwrap_err();

    assert_eq!(err.status(), 502);
    broken.assert_async().await;
}

#[tokio::test]
async fn test_export_team_rejects_unauthorized_token() {
    let mut server = Server::new_async().await;
    let denied = server
        .mock("GET", "/team/9001/space")
        .with_status(401)
        .with_body(r#"{"err":"Token invalid","ECODE":"OAUTH_025"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = export_team(&config(&server)).await.unwrap_err();

    assert_eq!(err.status(), 401);
    assert!(err.to_string().contains("Token invalid"));
    denied.assert_async().await;
}

#[tokio::test]
async fn test_export_team_validates_before_requests() {
    let server = Server::new_async().await;
    let config = config(&server).with_concurrency(0);

    let err = export_team(&config).await.unwrap_err();
    assert!(matches!(err, ExportError::Configuration(_)));
    assert_eq!(err.status(), 400);
}
