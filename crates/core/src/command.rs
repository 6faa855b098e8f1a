// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commands: what a decider asks the history service to do next.
//!
//! Applied atomically to history; each command produces exactly one event
//! plus its side registration (task enqueue, timer schedule, …).

use crate::execution::CompletionStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    ScheduleActivityTask {
        node_id: String,
        node_type: String,
        input: serde_json::Value,
    },
    StartTimer {
        timer_id: String,
        delay_ms: u64,
        /// Node waiting on this timer, when started for a delay node.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node_id: Option<String>,
    },
    CancelTimer {
        timer_id: String,
    },
    CompleteWorkflowExecution {
        status: CompletionStatus,
    },
    FailWorkflowExecution {
        message: String,
    },
}

impl Command {
    /// Command name for log spans.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ScheduleActivityTask { .. } => "schedule_activity",
            Command::StartTimer { .. } => "start_timer",
            Command::CancelTimer { .. } => "cancel_timer",
            Command::CompleteWorkflowExecution { .. } => "complete_workflow",
            Command::FailWorkflowExecution { .. } => "fail_workflow",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Command::ScheduleActivityTask { node_id, node_type, .. } => {
                vec![("node", node_id.clone()), ("type", node_type.clone())]
            }
            Command::StartTimer { timer_id, delay_ms, .. } => {
                vec![("timer", timer_id.clone()), ("delay_ms", delay_ms.to_string())]
            }
            Command::CancelTimer { timer_id } => vec![("timer", timer_id.clone())],
            Command::CompleteWorkflowExecution { status } => {
                vec![("status", status.to_string())]
            }
            Command::FailWorkflowExecution { message } => {
                vec![("message", crate::id::short(message, 80).to_string())]
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Command::CompleteWorkflowExecution { .. } | Command::FailWorkflowExecution { .. }
        )
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
