// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::types::{ExecutionSummary, HealthSummary};
use lf_core::{ExecutionId, ExecutionState, HistoryEvent};
use lf_matching::DeliveredTask;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Started { exec: ExecutionId },
    History { events: Vec<HistoryEvent> },
    Describe { state: ExecutionState },
    Executions { executions: Vec<ExecutionSummary> },
    /// `task` is absent when the long poll timed out empty.
    Task {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<DeliveredTask>,
    },
    /// For idempotent operations: whether this call changed anything.
    Applied { applied: bool },
    Health { health: HealthSummary },
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error { code: code.into(), message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
