// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tasks handed to workers by the matching service, plus the deterministic
//! execution context that rides along with activity tasks.

use crate::execution::ExecutionId;
use crate::fixture::Fixture;
use crate::id::TaskId;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Fixture interaction mode for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterministicMode {
    Capture,
    Replay,
    #[default]
    Off,
}

crate::display_as_str! {
    DeterministicMode {
        Capture => "capture",
        Replay => "replay",
        Off => "off",
    }
}

/// Deterministic context carried by every activity task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeterministicContext {
    #[serde(default)]
    pub mode: DeterministicMode,
    #[serde(default)]
    pub seed: u64,
    /// Fixtures from a prior capture run, consulted in replay mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixtures: Vec<Fixture>,
}

impl DeterministicContext {
    pub fn fixture_for(&self, fingerprint: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.request_fingerprint == fingerprint)
    }
}

/// Out-of-band executor results that steer the decider rather than the
/// node output, e.g. a long-delay timer request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecMetadata {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timer_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_at_ms: Option<u64>,
}

impl ExecMetadata {
    pub fn is_empty(&self) -> bool {
        !self.timer_requested && self.resume_at_ms.is_none()
    }
}

/// Hands a decider worker one decision round for one execution.
///
/// Short-lived; at most one decision task is in progress per execution,
/// enforced by the history service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTask {
    pub task_id: TaskId,
    pub exec: ExecutionId,
    /// Event id of the `DecisionTaskScheduled` that created this task.
    pub scheduled_event_id: i64,
    pub attempt: u32,
}

/// Hands an activity worker one node execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTask {
    pub task_id: TaskId,
    pub exec: ExecutionId,
    /// Event id of the `NodeScheduled` that created this task.
    pub scheduled_event_id: i64,
    pub node_id: String,
    pub node_type: String,
    pub config: serde_json::Value,
    pub input: serde_json::Value,
    /// First attempt number for this delivery; 1 unless redelivered.
    pub attempt: u32,
    pub retry: RetryPolicy,
    pub deterministic: DeterministicContext,
    /// When the node was scheduled, for schedule-to-close enforcement.
    #[serde(default)]
    pub scheduled_at_ms: u64,
    pub schedule_to_close_ms: u64,
    pub start_to_close_ms: u64,
}

/// What the matching service actually stores and delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    Decision(DecisionTask),
    Activity(ActivityTask),
}

impl TaskPayload {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskPayload::Decision(t) => t.task_id,
            TaskPayload::Activity(t) => t.task_id,
        }
    }

    pub fn exec(&self) -> &ExecutionId {
        match self {
            TaskPayload::Decision(t) => &t.exec,
            TaskPayload::Activity(t) => &t.exec,
        }
    }
}

crate::display_as_str! {
    TaskPayload {
        Decision(..) => "decision",
        Activity(..) => "activity",
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
