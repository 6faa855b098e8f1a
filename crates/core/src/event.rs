// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed history events.
//!
//! Serializes with `{"type": "category:name", ...fields}` format. The set
//! is closed: every consumer matches exhaustively.

use crate::attempt::ConnectorAttempt;
use crate::envelope::JobEnvelope;
use crate::execution::CompletionStatus;
use crate::fixture::Fixture;
use crate::retry::NodeError;
use crate::task::ExecMetadata;
use serde::{Deserialize, Serialize};

/// One appended event: dense id, wall-clock stamp, typed attributes.
///
/// Events are immutable after append; "pointers" between events are the
/// integer `scheduled_event_id` backlinks, never references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub event_id: i64,
    pub event_time_ms: u64,
    #[serde(flatten)]
    pub attrs: EventAttrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventAttrs {
    // -- execution --
    #[serde(rename = "execution:started")]
    ExecutionStarted { envelope: Box<JobEnvelope> },

    // -- node --
    #[serde(rename = "node:scheduled")]
    NodeScheduled {
        node_id: String,
        node_type: String,
        input: serde_json::Value,
    },

    #[serde(rename = "node:started")]
    NodeStarted {
        scheduled_event_id: i64,
        node_id: String,
        attempt: u32,
        /// Worker identity, for diagnostics.
        identity: String,
    },

    #[serde(rename = "node:completed")]
    NodeCompleted {
        scheduled_event_id: i64,
        node_id: String,
        output: serde_json::Value,
        #[serde(default, skip_serializing_if = "ExecMetadata::is_empty")]
        metadata: ExecMetadata,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attempts: Vec<ConnectorAttempt>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fixtures: Vec<Fixture>,
    },

    #[serde(rename = "node:failed")]
    NodeFailed {
        scheduled_event_id: i64,
        node_id: String,
        error: NodeError,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attempts: Vec<ConnectorAttempt>,
    },

    #[serde(rename = "node:timed_out")]
    NodeTimedOut {
        scheduled_event_id: i64,
        node_id: String,
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attempts: Vec<ConnectorAttempt>,
    },

    // -- timer --
    #[serde(rename = "timer:started")]
    TimerStarted {
        timer_id: String,
        delay_ms: u64,
        /// Node waiting on this timer, when the timer resumes a delay node.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },

    #[serde(rename = "timer:fired")]
    TimerFired { scheduled_event_id: i64, timer_id: String },

    #[serde(rename = "timer:cancelled")]
    TimerCancelled { scheduled_event_id: i64, timer_id: String },

    // -- signal --
    #[serde(rename = "signal:received")]
    SignalReceived { name: String, payload: serde_json::Value },

    // -- workflow terminal --
    #[serde(rename = "workflow:completed")]
    WorkflowCompleted { status: CompletionStatus },

    #[serde(rename = "workflow:failed")]
    WorkflowFailed { message: String },

    #[serde(rename = "workflow:cancelled")]
    WorkflowCancelled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    // -- decision --
    #[serde(rename = "decision:scheduled")]
    DecisionTaskScheduled { attempt: u32 },

    #[serde(rename = "decision:started")]
    DecisionTaskStarted { scheduled_event_id: i64, identity: String },

    #[serde(rename = "decision:completed")]
    DecisionTaskCompleted { scheduled_event_id: i64 },
}

impl EventAttrs {
    /// Event kind for log spans and metrics (the serde tag).
    pub fn kind(&self) -> &'static str {
        match self {
            EventAttrs::ExecutionStarted { .. } => "execution:started",
            EventAttrs::NodeScheduled { .. } => "node:scheduled",
            EventAttrs::NodeStarted { .. } => "node:started",
            EventAttrs::NodeCompleted { .. } => "node:completed",
            EventAttrs::NodeFailed { .. } => "node:failed",
            EventAttrs::NodeTimedOut { .. } => "node:timed_out",
            EventAttrs::TimerStarted { .. } => "timer:started",
            EventAttrs::TimerFired { .. } => "timer:fired",
            EventAttrs::TimerCancelled { .. } => "timer:cancelled",
            EventAttrs::SignalReceived { .. } => "signal:received",
            EventAttrs::WorkflowCompleted { .. } => "workflow:completed",
            EventAttrs::WorkflowFailed { .. } => "workflow:failed",
            EventAttrs::WorkflowCancelled { .. } => "workflow:cancelled",
            EventAttrs::DecisionTaskScheduled { .. } => "decision:scheduled",
            EventAttrs::DecisionTaskStarted { .. } => "decision:started",
            EventAttrs::DecisionTaskCompleted { .. } => "decision:completed",
        }
    }

    /// Backlink to the initiating event, for completion/failure events.
    pub fn scheduled_event_id(&self) -> Option<i64> {
        match self {
            EventAttrs::NodeStarted { scheduled_event_id, .. }
            | EventAttrs::NodeCompleted { scheduled_event_id, .. }
            | EventAttrs::NodeFailed { scheduled_event_id, .. }
            | EventAttrs::NodeTimedOut { scheduled_event_id, .. }
            | EventAttrs::TimerFired { scheduled_event_id, .. }
            | EventAttrs::TimerCancelled { scheduled_event_id, .. }
            | EventAttrs::DecisionTaskStarted { scheduled_event_id, .. }
            | EventAttrs::DecisionTaskCompleted { scheduled_event_id, .. } => {
                Some(*scheduled_event_id)
            }
            _ => None,
        }
    }

    /// Terminal events close the execution; nothing may be appended after.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventAttrs::WorkflowCompleted { .. }
                | EventAttrs::WorkflowFailed { .. }
                | EventAttrs::WorkflowCancelled { .. }
        )
    }

    /// One-line summary for structured logs.
    pub fn log_summary(&self) -> String {
        match self {
            EventAttrs::ExecutionStarted { envelope } => {
                format!("{} job={}", self.kind(), envelope.job_id)
            }
            EventAttrs::NodeScheduled { node_id, node_type, .. } => {
                format!("{} node={} type={}", self.kind(), node_id, node_type)
            }
            EventAttrs::NodeStarted { node_id, attempt, .. } => {
                format!("{} node={} attempt={}", self.kind(), node_id, attempt)
            }
            EventAttrs::NodeCompleted { node_id, metadata, .. } => {
                if metadata.timer_requested {
                    format!("{} node={} timer_requested", self.kind(), node_id)
                } else {
                    format!("{} node={}", self.kind(), node_id)
                }
            }
            EventAttrs::NodeFailed { node_id, error, .. } => {
                format!("{} node={} error={}", self.kind(), node_id, error.code)
            }
            EventAttrs::NodeTimedOut { node_id, .. } => {
                format!("{} node={}", self.kind(), node_id)
            }
            EventAttrs::TimerStarted { timer_id, delay_ms, .. } => {
                format!("{} timer={} delay_ms={}", self.kind(), timer_id, delay_ms)
            }
            EventAttrs::TimerFired { timer_id, .. }
            | EventAttrs::TimerCancelled { timer_id, .. } => {
                format!("{} timer={}", self.kind(), timer_id)
            }
            EventAttrs::SignalReceived { name, .. } => {
                format!("{} name={}", self.kind(), name)
            }
            EventAttrs::WorkflowCompleted { status } => {
                format!("{} status={}", self.kind(), status)
            }
            EventAttrs::WorkflowFailed { message } => {
                format!("{} message={}", self.kind(), crate::id::short(message, 80))
            }
            EventAttrs::WorkflowCancelled { .. }
            | EventAttrs::DecisionTaskScheduled { .. }
            | EventAttrs::DecisionTaskStarted { .. }
            | EventAttrs::DecisionTaskCompleted { .. } => self.kind().to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
