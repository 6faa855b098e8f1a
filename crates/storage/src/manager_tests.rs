// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::test_support::{execution_started, linear_graph, node_scheduled};
use lf_core::{ExecutionState, RunId};

fn exec(workflow_id: &str) -> ExecutionId {
    ExecutionId::new("default", workflow_id, RunId::from_string("run-test"))
}

fn start(manager: &ShardManager, workflow_id: &str) {
    let exec = exec(workflow_id);
    manager.with_shard(&exec, |shard| {
        shard
            .create_execution(
                ExecutionState::new(exec.clone(), "job-1", 1_000),
                execution_started(linear_graph()),
                1_000,
                |s| s.transition(ExecutionStatus::Running, 1_000),
            )
            .unwrap();
    });
}

#[test]
fn routes_to_stable_shard() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ShardManager::open(dir.path(), 4).unwrap();
    start(&manager, "wf-1");

    let history =
        manager.with_shard(&exec("wf-1"), |shard| shard.get_history(&exec("wf-1"), 0).unwrap());
    assert_eq!(history.len(), 1);
}

#[test]
fn recovery_replays_wal() {
    let dir = tempfile::tempdir().unwrap();
    {
        let manager = ShardManager::open(dir.path(), 2).unwrap();
        start(&manager, "wf-1");
        manager.with_shard(&exec("wf-1"), |shard| {
            shard
                .append(&exec("wf-1"), 1, vec![node_scheduled("t", "trigger_manual")], 1_001, |_| {})
                .unwrap();
        });
    }

    let manager = ShardManager::open(dir.path(), 2).unwrap();
    let history =
        manager.with_shard(&exec("wf-1"), |shard| shard.get_history(&exec("wf-1"), 0).unwrap());
    assert_eq!(history.len(), 2);
    let state = manager.with_shard(&exec("wf-1"), |shard| shard.get_state(&exec("wf-1")).unwrap());
    assert_eq!(state.last_event_id, 2);
    assert_eq!(state.status, ExecutionStatus::Running);
}

#[test]
fn recovery_after_checkpoint_combines_snapshot_and_tail() {
    let dir = tempfile::tempdir().unwrap();
    {
        let manager = ShardManager::open(dir.path(), 1).unwrap();
        start(&manager, "wf-1");
        manager.checkpoint_all().unwrap();
        // Post-snapshot append lands only in the fresh WAL
        manager.with_shard(&exec("wf-1"), |shard| {
            shard
                .append(&exec("wf-1"), 1, vec![node_scheduled("t", "trigger_manual")], 1_001, |_| {})
                .unwrap();
        });
    }

    let manager = ShardManager::open(dir.path(), 1).unwrap();
    let history =
        manager.with_shard(&exec("wf-1"), |shard| shard.get_history(&exec("wf-1"), 0).unwrap());
    assert_eq!(history.len(), 2);
}

#[test]
fn visibility_lists_by_namespace_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let manager = ShardManager::open(dir.path(), 4).unwrap();
    start(&manager, "wf-1");
    start(&manager, "wf-2");

    let rows = manager.list("default", None);
    assert_eq!(rows.len(), 2);

    let running = manager.list("default", Some(ExecutionStatus::Running));
    assert_eq!(running.len(), 2);

    let done = manager.list("default", Some(ExecutionStatus::Completed));
    assert!(done.is_empty());

    assert!(manager.list("other", None).is_empty());
}
