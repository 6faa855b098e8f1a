// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::test_support::{exec_id, execution_started, linear_graph, node_scheduled, timer_fired};
use lf_core::ExecutionStatus;

fn store(dir: &std::path::Path) -> ShardStore {
    let wal = WalWriter::open(dir.join("shard-000.wal")).unwrap();
    ShardStore::new(0, wal)
}

use crate::wal::WalWriter;

fn started_state() -> ExecutionState {
    ExecutionState::new(exec_id("wf-1"), "job-1", 1_000)
}

#[test]
fn create_assigns_dense_ids_from_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store(dir.path());

    let outcome = store
        .create_execution(started_state(), execution_started(linear_graph()), 1_000, |s| {
            s.transition(ExecutionStatus::Running, 1_000)
        })
        .unwrap();
    assert_eq!(outcome.last_event_id, 1);
    assert_eq!(outcome.events[0].event_id, 1);

    let outcome = store
        .append(&exec_id("wf-1"), 1, vec![node_scheduled("t", "trigger_manual")], 1_001, |_| {})
        .unwrap();
    assert_eq!(outcome.last_event_id, 2);
}

#[test]
fn conflict_on_stale_expected_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store(dir.path());
    store
        .create_execution(started_state(), execution_started(linear_graph()), 1_000, |_| {})
        .unwrap();

    let err = store
        .append(&exec_id("wf-1"), 0, vec![node_scheduled("t", "trigger_manual")], 1_001, |_| {})
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { expected: 0, actual: 1 }));
}

#[test]
fn closed_execution_rejects_appends() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store(dir.path());
    store
        .create_execution(started_state(), execution_started(linear_graph()), 1_000, |s| {
            s.transition(ExecutionStatus::Completed, 1_000)
        })
        .unwrap();

    let err = store
        .append(&exec_id("wf-1"), 1, vec![node_scheduled("t", "trigger_manual")], 1_001, |_| {})
        .unwrap_err();
    assert!(matches!(err, StoreError::ExecutionClosed(_)));
}

#[test]
fn duplicate_timer_fire_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store(dir.path());
    store
        .create_execution(started_state(), execution_started(linear_graph()), 1_000, |_| {})
        .unwrap();
    store.append(&exec_id("wf-1"), 1, vec![timer_fired(1, "d1")], 1_001, |_| {}).unwrap();

    let outcome =
        store.append(&exec_id("wf-1"), 2, vec![timer_fired(1, "d1")], 1_002, |_| {}).unwrap();
    assert!(outcome.events.is_empty());
    assert_eq!(outcome.last_event_id, 2);

    let history = store.get_history(&exec_id("wf-1"), 0).unwrap();
    assert_eq!(history.len(), 2);
}

#[test]
fn get_history_from_offset() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store(dir.path());
    store
        .create_execution(started_state(), execution_started(linear_graph()), 1_000, |_| {})
        .unwrap();
    store
        .append(&exec_id("wf-1"), 1, vec![node_scheduled("t", "trigger_manual")], 1_001, |_| {})
        .unwrap();

    let tail = store.get_history(&exec_id("wf-1"), 1).unwrap();
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].event_id, 2);
}

#[test]
fn unknown_execution_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    assert!(matches!(
        store.get_history(&exec_id("ghost"), 0),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn state_patch_is_atomic_with_append() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store(dir.path());
    store
        .create_execution(started_state(), execution_started(linear_graph()), 1_000, |s| {
            s.transition(ExecutionStatus::Running, 1_000)
        })
        .unwrap();

    let state = store.get_state(&exec_id("wf-1")).unwrap();
    assert_eq!(state.status, ExecutionStatus::Running);
    assert_eq!(state.last_event_id, 1);
}
