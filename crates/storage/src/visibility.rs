// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Visibility rows for list/search over executions.

use lf_core::{ExecutionId, ExecutionState, ExecutionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityRow {
    pub exec: ExecutionId,
    pub job_id: String,
    pub status: ExecutionStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    pub last_event_id: i64,
}

impl VisibilityRow {
    pub fn from_state(state: &ExecutionState) -> Self {
        Self {
            exec: state.exec.clone(),
            job_id: state.job_id.clone(),
            status: state.status,
            created_at_ms: state.created_at_ms,
            finished_at_ms: state.finished_at_ms,
            last_event_id: state.last_event_id,
        }
    }
}
