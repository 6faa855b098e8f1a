// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::wal::WalWriter;
use lf_core::test_support::{exec_id, execution_started, linear_graph};
use lf_core::ExecutionState;

#[test]
fn snapshot_write_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer = Checkpointer::new(dir.path());

    let wal = WalWriter::open(checkpointer.wal_path(0)).unwrap();
    let mut store = ShardStore::new(0, wal);
    store
        .create_execution(
            ExecutionState::new(exec_id("wf-1"), "job-1", 1_000),
            execution_started(linear_graph()),
            1_000,
            |_| {},
        )
        .unwrap();

    checkpointer.checkpoint(&mut store).unwrap();

    let loaded = ShardSnapshot::load(&checkpointer.snapshot_path(0)).unwrap().unwrap();
    assert_eq!(loaded.shard_id, 0);
    assert_eq!(loaded.executions.len(), 1);
    assert_eq!(loaded.executions[0].events.len(), 1);
}

#[test]
fn missing_snapshot_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let checkpointer = Checkpointer::new(dir.path());
    assert!(ShardSnapshot::load(&checkpointer.snapshot_path(3)).unwrap().is_none());
}

#[test]
fn maybe_checkpoint_respects_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let mut checkpointer = Checkpointer::new(dir.path());
    checkpointer.appends_threshold = 100;

    let wal = WalWriter::open(checkpointer.wal_path(0)).unwrap();
    let mut store = ShardStore::new(0, wal);
    store
        .create_execution(
            ExecutionState::new(exec_id("wf-1"), "job-1", 1_000),
            execution_started(linear_graph()),
            1_000,
            |_| {},
        )
        .unwrap();

    assert!(!checkpointer.maybe_checkpoint(&mut store).unwrap());

    checkpointer.appends_threshold = 1;
    assert!(checkpointer.maybe_checkpoint(&mut store).unwrap());
    assert_eq!(store.appends_since_checkpoint(), 0);
}
