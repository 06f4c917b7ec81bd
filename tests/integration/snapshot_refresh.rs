//! Integration tests for the snapshot refresh job over a full export

use crate::support::fake_api::{entry, task, window, FakeClickUp};
use chrono::NaiveDate;
use clickup_time_export::fetcher::FetcherError;
use clickup_time_export::snapshot::lock::{ExportLock, EXPORT_LOCK_FILE};
use clickup_time_export::snapshot::refresh::{latest_view, RefreshJob, RefreshOutcome};
use clickup_time_export::snapshot::store::FileSnapshotStore;
use clickup_time_export::snapshot::{SnapshotError, SnapshotStatus};
use clickup_time_export::{ExportError, ExportOptions, Exporter};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
}

fn exporter() -> Exporter {
    let api = Arc::new(
        FakeClickUp::new()
            .with_space("s1", "Engineering", &["1"])
            .with_space_list("s1", "l1", "Inbox")
            .with_tasks("l1", vec![vec![task("t1", Some(("1", "ada")))]])
            .with_entries(
                "l1",
                vec![entry(Some("t1"), ("1", "ada"), 5_400_000, true, "l1")],
            ),
    );
    Exporter::new(api, ExportOptions::new(window()))
}

#[tokio::test]
async fn test_refresh_persists_export_and_serves_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    let job = RefreshJob::new(store.clone());
    let exporter = exporter();

    assert_eq!(latest_view(&store, "9001").unwrap(), json!({"status": "not_ready"}));

    let outcome = job
        .run_on("9001", day(2), || exporter.export("9001"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RefreshOutcome::Refreshed {
            version: "20250602".to_string(),
            records: 1,
            pruned: Vec::new(),
        }
    );

    let view = latest_view(&store, "9001").unwrap();
    assert_eq!(view[0]["task_id"], "t1");
    assert_eq!(view[0]["time_summary"][0]["billable_hours"], 1.5);

    // lock released once the run is over
    assert!(!store.team_dir("9001").unwrap().join(EXPORT_LOCK_FILE).exists());
}

#[tokio::test]
async fn test_same_day_success_is_not_exported_again() {
    let dir = tempfile::tempdir().unwrap();
    let job = RefreshJob::new(FileSnapshotStore::new(dir.path()));
    let exporter = exporter();

    job.run_on("9001", day(2), || exporter.export("9001"))
        .await
        .unwrap();
    let again = job
        .run_on("9001", day(2), || async { Err(ExportError::Configuration("export must not run".into())) })
        .await
        .unwrap();

    assert_eq!(
        again,
        RefreshOutcome::AlreadyFresh {
            version: "20250602".to_string()
        }
    );
}

#[tokio::test]
async fn test_held_lock_reports_in_progress() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    let job = RefreshJob::new(store.clone());

    let team_dir = store.team_dir("9001").unwrap();
    std::fs::create_dir_all(&team_dir).unwrap();
    let held = ExportLock::try_acquire(&team_dir, Duration::from_secs(60))
        .unwrap()
        .expect("lock should be free");

    let outcome = job
        .run_on("9001", day(2), || async { Err(ExportError::Configuration("export must not run".into())) })
        .await
        .unwrap();
    assert_eq!(outcome, RefreshOutcome::InProgress);

    held.release();
    let exporter = exporter();
    let outcome = job
        .run_on("9001", day(2), || exporter.export("9001"))
        .await
        .unwrap();
    assert!(matches!(outcome, RefreshOutcome::Refreshed { .. }));
}

#[tokio::test]
async fn test_failed_export_is_recorded_and_retried() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSnapshotStore::new(dir.path());
    let job = RefreshJob::new(store.clone());

    let err = job
        .run_on("9001", day(3), || async {
            Err(ExportError::from(FetcherError::rate_limited()))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SnapshotError::Export(_)));

    let (version, snapshot) = store.latest("9001").unwrap().unwrap();
    assert_eq!(version, "20250603");
    assert_eq!(snapshot.status, SnapshotStatus::Error);
    assert_eq!(snapshot.status_code, Some(429));

    let view = latest_view(&store, "9001").unwrap();
    assert_eq!(view["status"], "error");
    assert!(view.get("data").is_none());

    // an error snapshot does not block a retry on the same day
    let exporter = exporter();
    let outcome = job
        .run_on("9001", day(3), || exporter.export("9001"))
        .await
        .unwrap();
    assert!(matches!(outcome, RefreshOutcome::Refreshed { records: 1, .. }));
}

#[tokio::test]
async fn test_retention_prunes_old_versions() {
    let dir = tempfile::tempdir().unwrap();
    let job = RefreshJob::new(FileSnapshotStore::new(dir.path())).with_retention(2, 30);
    let exporter = exporter();

    for d in 1..=3 {
        job.run_on("9001", day(d), || exporter.export("9001"))
            .await
            .unwrap();
    }

    assert_eq!(
        job.store().versions("9001").unwrap(),
        vec!["20250602".to_string(), "20250603".to_string()]
    );
}

#[tokio::test]
async fn test_zero_retention_keeps_fresh_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let job = RefreshJob::new(FileSnapshotStore::new(dir.path())).with_retention(0, 30);
    let exporter = exporter();

    for d in 1..=2 {
        job.run_on("9001", day(d), || exporter.export("9001"))
            .await
            .unwrap();
    }

    assert_eq!(
        job.store().versions("9001").unwrap(),
        vec!["20250602".to_string()]
    );
    let (_, snapshot) = job.store().latest("9001").unwrap().unwrap();
    assert_eq!(snapshot.status, SnapshotStatus::Success);
}

#[tokio::test]
async fn test_invalid_team_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let job = RefreshJob::new(FileSnapshotStore::new(dir.path()));

    let err = job
        .run_on("../etc", day(2), || async { Ok(Vec::new()) })
        .await
        .unwrap_err();
    assert!(matches!(err, SnapshotError::InvalidTeamId(_)));
}
