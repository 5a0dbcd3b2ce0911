mod common;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use batch_golem::coordinator::spawn_queue;
use batch_golem::executor::{channel_starter, run_dry_executor, DryRunOptions};
use batch_golem::plan::{load_plan, validate};
use batch_golem::state_file;
use batch_golem::types::QueueStatus;

const PLAN: &str = r#"
items:
  - id: WRK-001
    title: Schema migration
  - id: WRK-002
    title: API endpoint
  - id: WRK-003
    title: Client update
schedule:
  - parallel: false
    titles: [Schema migration]
  - parallel: true
    titles: [API endpoint, Client update]
"#;

/// End-to-end: plan file -> groups -> queue + dry executor, paused after the
/// first item, persisted, then picked up again by a second run that only
/// starts what is left.
#[tokio::test]
async fn paused_run_resumes_from_persisted_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let plan_path = dir.path().join("BATCH.yaml");
    let state_path = dir.path().join(".batch-golem").join("queue-state.json");
    std::fs::write(&plan_path, PLAN).unwrap();

    let plan = load_plan(&plan_path).unwrap();
    validate(&plan).unwrap();
    let groups = plan.groups();
    assert_eq!(groups.len(), 2);

    // First run: pause once WRK-001 finishes
    let (starter, started_rx) = channel_starter();
    let (handle, task) = spawn_queue(groups.clone(), starter, None);
    let persist = tokio::spawn(state_file::persist_changes(
        handle.subscribe(),
        state_path.clone(),
    ));
    let cancel = CancellationToken::new();
    let executor = tokio::spawn(run_dry_executor(
        started_rx,
        handle.clone(),
        DryRunOptions {
            pause_after: Some(1),
            ..Default::default()
        },
        cancel.clone(),
    ));

    handle
        .subscribe()
        .wait_for(|s| s.status == QueueStatus::Paused && s.is_item_completed("WRK-001"))
        .await
        .unwrap();
    cancel.cancel();
    executor.await.unwrap();
    drop(handle);
    let first_final = task.await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), persist)
        .await
        .unwrap()
        .unwrap();

    let saved = state_file::load(&state_path).unwrap().unwrap();
    assert_eq!(saved, first_final);
    assert_eq!(saved.status, QueueStatus::Paused);
    assert_eq!(saved.cursor, 0);
    assert!(state_file::matches_groups(&saved, &groups));

    // Second run: resume the snapshot and drive to completion
    let starter = common::RecordingStarter::new();
    let (handle, _task) = spawn_queue(groups, starter.clone(), Some(saved));
    assert!(handle.is_paused());
    assert!(starter.started().is_empty());

    handle.resume().await.unwrap();
    assert_eq!(starter.started(), vec!["WRK-002", "WRK-003"]);

    handle
        .report(batch_golem::types::CompletionEvent::succeeded("WRK-003"))
        .await
        .unwrap();
    handle
        .report(batch_golem::types::CompletionEvent::failed("WRK-002"))
        .await
        .unwrap();

    let done = handle.wait_completed().await.unwrap();
    assert_eq!(done.cursor, 2);
    assert_eq!(done.completed_item_ids, vec!["WRK-001", "WRK-003", "WRK-002"]);
}
