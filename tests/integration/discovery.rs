//! Integration tests for hierarchy discovery

use crate::support::fake_api::FakeClickUp;
use clickup_time_export::exporter::TreeDiscoverer;
use clickup_time_export::fetcher::ClickUpApi;
use std::sync::Arc;

#[tokio::test]
async fn test_list_reachable_twice_is_discovered_once() {
    let api = Arc::new(
        FakeClickUp::new()
            .with_space("s1", "Engineering", &["10", "11"])
            .with_space_list("s1", "l1", "Inbox")
            .with_folder("s1", "f1", "Q3")
            .with_folder_list("f1", "l1", "Inbox")
            .with_folder_list("f1", "l2", "Sprint"),
    );

    let discovery = TreeDiscoverer::new(api.clone()).discover("9001").await.unwrap();

    let ids: Vec<_> = discovery.lists.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["l1", "l2"]);

    // direct placement wins for the duplicate
    assert_eq!(discovery.lists[0].folder, None);
    assert_eq!(discovery.lists[0].space.name, "Engineering");
    assert_eq!(
        discovery.lists[1].folder.as_ref().map(|f| f.name.as_str()),
        Some("Q3")
    );
}

#[tokio::test]
async fn test_member_ids_are_distinct_across_spaces() {
    let api = Arc::new(
        FakeClickUp::new()
            .with_space("s1", "Engineering", &["10", "11"])
            .with_space("s2", "Design", &["11", "12"]),
    );

    let discovery = TreeDiscoverer::new(api).discover("9001").await.unwrap();

    assert!(discovery.lists.is_empty());
    assert_eq!(discovery.member_ids, vec!["10", "11", "12"]);
}

#[tokio::test]
async fn test_every_space_and_folder_is_visited() {
    let api = Arc::new(
        FakeClickUp::new()
            .with_space("s1", "Engineering", &[])
            .with_space("s2", "Design", &[])
            .with_folder("s1", "f1", "Backend")
            .with_folder("s2", "f2", "Brand")
            .with_folder_list("f1", "l1", "API")
            .with_folder_list("f2", "l2", "Logos")
            .with_space_list("s2", "l3", "Requests"),
    );

    let discovery = TreeDiscoverer::new(api.clone()).discover("9001").await.unwrap();
    assert_eq!(discovery.lists.len(), 3);

    let calls = api.calls();
    for expected in [
        "spaces:9001",
        "space_lists:s1",
        "space_lists:s2",
        "folders:s1",
        "folders:s2",
        "folder_lists:f1",
        "folder_lists:f2",
    ] {
        assert!(calls.iter().any(|c| c == expected), "missing {expected}: {calls:?}");
    }

    // direct lists come before folder lists
    assert_eq!(discovery.lists[0].id, "l3");
}

#[tokio::test]
async fn test_empty_team_discovers_nothing() {
    let api: Arc<dyn ClickUpApi> = Arc::new(FakeClickUp::new());
    let discovery = TreeDiscoverer::new(api).discover("9001").await.unwrap();
    assert!(discovery.lists.is_empty());
    assert!(discovery.member_ids.is_empty());
}
