// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-facing summary shapes, decoupled from internal storage rows.

use lf_core::{ExecutionId, ExecutionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub exec: ExecutionId,
    pub job_id: String,
    pub status: ExecutionStatus,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    pub last_event_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub healthy: bool,
    pub shard_count: u32,
    pub pending_timers: usize,
    pub workflow_queue_depth: usize,
    pub activity_queue_depth: usize,
    pub uptime_ms: u64,
}
