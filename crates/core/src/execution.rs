// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution identity and mutable per-execution state.

use crate::id::RunId;
use serde::{Deserialize, Serialize};

/// Identifies one run of one workflow within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId {
    pub namespace: String,
    pub workflow_id: String,
    pub run_id: RunId,
}

impl ExecutionId {
    pub fn new(
        namespace: impl Into<String>,
        workflow_id: impl Into<String>,
        run_id: RunId,
    ) -> Self {
        Self { namespace: namespace.into(), workflow_id: workflow_id.into(), run_id }
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.workflow_id, self.run_id)
    }
}

/// Lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Waiting,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

crate::display_as_str! {
    ExecutionStatus {
        Pending => "pending",
        Running => "running",
        Waiting => "waiting",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
        TimedOut => "timed_out",
    }
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::TimedOut)
    }
}

/// How a workflow finished when it reached a terminal Completed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    PartialFailure,
}

crate::display_as_str! {
    CompletionStatus {
        Completed => "completed",
        PartialFailure => "partial_failure",
    }
}

/// Mutable snapshot for one execution, owned by its shard.
///
/// Mutated only by the history service under the shard lock, in the same
/// transaction as the event append that justifies the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub exec: ExecutionId,
    pub job_id: String,
    pub status: ExecutionStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    /// Highest event id appended so far; 0 before the first event.
    pub last_event_id: i64,
    /// Set when an event arrived while a decision task was in flight.
    #[serde(default)]
    pub pending_decision: bool,
    /// Event id of the `DecisionTaskScheduled` currently in flight, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_inflight: Option<i64>,
    /// Consecutive decision-task failures for the current round.
    #[serde(default)]
    pub decision_failures: u32,
}

impl ExecutionState {
    pub fn new(exec: ExecutionId, job_id: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            exec,
            job_id: job_id.into(),
            status: ExecutionStatus::Pending,
            created_at_ms,
            started_at_ms: None,
            finished_at_ms: None,
            last_event_id: 0,
            pending_decision: false,
            decision_inflight: None,
            decision_failures: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition to a new status. Terminal states are sticky: once the
    /// execution is terminal the transition is ignored.
    pub fn transition(&mut self, status: ExecutionStatus, at_ms: u64) {
        if self.is_terminal() {
            return;
        }
        if status == ExecutionStatus::Running && self.started_at_ms.is_none() {
            self.started_at_ms = Some(at_ms);
        }
        if status.is_terminal() {
            self.finished_at_ms = Some(at_ms);
            self.pending_decision = false;
            self.decision_inflight = None;
        }
        self.status = status;
    }

    /// Wall-clock duration from start to finish, when both are known.
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at_ms, self.finished_at_ms) {
            (Some(s), Some(f)) => Some(f.saturating_sub(s)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
