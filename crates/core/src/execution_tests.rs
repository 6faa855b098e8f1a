// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn state() -> ExecutionState {
    let exec = ExecutionId::new("default", "wf-1", RunId::from_string("run-a"));
    ExecutionState::new(exec, "job-1", 1_000)
}

#[parameterized(
    completed = { ExecutionStatus::Completed, true },
    failed = { ExecutionStatus::Failed, true },
    cancelled = { ExecutionStatus::Cancelled, true },
    timed_out = { ExecutionStatus::TimedOut, true },
    pending = { ExecutionStatus::Pending, false },
    running = { ExecutionStatus::Running, false },
    waiting = { ExecutionStatus::Waiting, false },
)]
fn terminal_statuses(status: ExecutionStatus, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn running_records_start_time_once() {
    let mut s = state();
    s.transition(ExecutionStatus::Running, 2_000);
    assert_eq!(s.started_at_ms, Some(2_000));

    s.transition(ExecutionStatus::Waiting, 3_000);
    s.transition(ExecutionStatus::Running, 4_000);
    assert_eq!(s.started_at_ms, Some(2_000));
}

#[test]
fn terminal_state_is_sticky() {
    let mut s = state();
    s.transition(ExecutionStatus::Running, 2_000);
    s.transition(ExecutionStatus::Failed, 3_000);
    assert_eq!(s.status, ExecutionStatus::Failed);
    assert_eq!(s.finished_at_ms, Some(3_000));

    s.transition(ExecutionStatus::Completed, 4_000);
    assert_eq!(s.status, ExecutionStatus::Failed);
    assert_eq!(s.finished_at_ms, Some(3_000));
}

#[test]
fn terminal_clears_decision_bookkeeping() {
    let mut s = state();
    s.pending_decision = true;
    s.decision_inflight = Some(4);
    s.transition(ExecutionStatus::Completed, 2_000);
    assert!(!s.pending_decision);
    assert_eq!(s.decision_inflight, None);
}

#[test]
fn duration_requires_both_ends() {
    let mut s = state();
    assert_eq!(s.duration_ms(), None);
    s.transition(ExecutionStatus::Running, 2_000);
    assert_eq!(s.duration_ms(), None);
    s.transition(ExecutionStatus::Completed, 5_500);
    assert_eq!(s.duration_ms(), Some(3_500));
}

#[test]
fn execution_id_display() {
    let exec = ExecutionId::new("prod", "wf-9", RunId::from_string("run-x"));
    assert_eq!(exec.to_string(), "prod/wf-9/run-x");
}
