// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests understood by the engine listener.

use lf_core::{
    Command, ConnectorAttempt, DecisionTask, ExecMetadata, ExecutionId, ExecutionStatus, Fixture,
    JobEnvelope, NodeError, TaskPayload,
};
use lf_matching::TaskToken;
use lf_timer::TimerKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    // -- history --
    StartWorkflow {
        envelope: Box<JobEnvelope>,
    },
    GetHistory {
        exec: ExecutionId,
        #[serde(default)]
        from_event_id: i64,
    },
    DescribeExecution {
        exec: ExecutionId,
    },
    ListExecutions {
        namespace: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<ExecutionStatus>,
    },
    SignalWorkflow {
        exec: ExecutionId,
        name: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    CancelWorkflow {
        exec: ExecutionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    RecordDecisionTaskCompleted {
        task: DecisionTask,
        commands: Vec<Command>,
    },
    RecordActivityTaskCompleted {
        exec: ExecutionId,
        scheduled_event_id: i64,
        output: serde_json::Value,
        #[serde(default)]
        metadata: ExecMetadata,
        #[serde(default)]
        attempts: Vec<ConnectorAttempt>,
        #[serde(default)]
        fixtures: Vec<Fixture>,
    },
    RecordActivityTaskFailed {
        exec: ExecutionId,
        scheduled_event_id: i64,
        error: NodeError,
        #[serde(default)]
        attempts: Vec<ConnectorAttempt>,
    },

    // -- matching --
    PollTask {
        namespace: String,
        task_queue: String,
        identity: String,
        timeout_ms: u64,
    },
    CompleteTask {
        token: TaskToken,
    },
    FailTask {
        token: TaskToken,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        requeue_delay_ms: Option<u64>,
    },
    AddTask {
        namespace: String,
        task_queue: String,
        partition: u32,
        task: TaskPayload,
    },

    // -- timer --
    TimerSchedule {
        key: TimerKey,
        fire_at_ms: u64,
    },
    TimerCancel {
        exec: ExecutionId,
        timer_id: String,
    },

    // -- ops --
    Health,
}

impl Request {
    /// Request name for log spans.
    pub fn name(&self) -> &'static str {
        match self {
            Request::StartWorkflow { .. } => "start_workflow",
            Request::GetHistory { .. } => "get_history",
            Request::DescribeExecution { .. } => "describe_execution",
            Request::ListExecutions { .. } => "list_executions",
            Request::SignalWorkflow { .. } => "signal_workflow",
            Request::CancelWorkflow { .. } => "cancel_workflow",
            Request::RecordDecisionTaskCompleted { .. } => "record_decision_task_completed",
            Request::RecordActivityTaskCompleted { .. } => "record_activity_task_completed",
            Request::RecordActivityTaskFailed { .. } => "record_activity_task_failed",
            Request::PollTask { .. } => "poll_task",
            Request::CompleteTask { .. } => "complete_task",
            Request::FailTask { .. } => "fail_task",
            Request::AddTask { .. } => "add_task",
            Request::TimerSchedule { .. } => "timer_schedule",
            Request::TimerCancel { .. } => "timer_cancel",
            Request::Health => "health",
        }
    }
}
