// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::envelope::JobEnvelope;
use crate::event::{EventAttrs, HistoryEvent};
use crate::execution::ExecutionId;
use crate::graph::{Edge, Node, OnError, WorkflowGraph};
use crate::id::RunId;
use crate::retry::NodeError;
use crate::task::{DeterministicContext, ExecMetadata};
use serde_json::json;

// ── Graph factories ─────────────────────────────────────────────────────

pub fn node(id: &str, node_type: &str) -> Node {
    Node {
        id: id.to_string(),
        node_type: node_type.to_string(),
        config: serde_json::Value::Null,
        on_error: OnError::Stop,
    }
}

pub fn node_with_config(id: &str, node_type: &str, config: serde_json::Value) -> Node {
    Node { config, ..node(id, node_type) }
}

pub fn node_on_error(id: &str, node_type: &str, on_error: OnError) -> Node {
    Node { on_error, ..node(id, node_type) }
}

pub fn edge(source: &str, target: &str) -> Edge {
    Edge { source: source.to_string(), target: target.to_string(), source_handle: None }
}

pub fn branch_edge(source: &str, target: &str, handle: &str) -> Edge {
    Edge {
        source: source.to_string(),
        target: target.to_string(),
        source_handle: Some(handle.to_string()),
    }
}

/// `trigger_manual(t) → http_request(h)`
pub fn linear_graph() -> WorkflowGraph {
    WorkflowGraph {
        nodes: vec![node("t", "trigger_manual"), node("h", "http_request")],
        edges: vec![edge("t", "h")],
    }
}

// ── Execution / envelope factories ──────────────────────────────────────

pub fn exec_id(workflow_id: &str) -> ExecutionId {
    ExecutionId::new("default", workflow_id, RunId::from_string("run-test"))
}

pub fn envelope(workflow: WorkflowGraph) -> JobEnvelope {
    JobEnvelope {
        job_id: "job-test".to_string(),
        callback_token: "test-token".to_string(),
        execution_id: "wf-test".to_string(),
        workflow,
        trigger_data: json!({"x": 1}),
        deterministic: DeterministicContext::default(),
        callback_url: "https://control-plane.test/handle".to_string(),
        progress_url: Some("https://control-plane.test/progress".to_string()),
        namespace: String::new(),
    }
}

// ── Event factory functions ─────────────────────────────────────────────

pub fn history(attrs: Vec<EventAttrs>) -> Vec<HistoryEvent> {
    attrs
        .into_iter()
        .enumerate()
        .map(|(i, attrs)| HistoryEvent {
            event_id: i as i64 + 1,
            event_time_ms: 1_000_000 + i as u64,
            attrs,
        })
        .collect()
}

pub fn execution_started(workflow: WorkflowGraph) -> EventAttrs {
    EventAttrs::ExecutionStarted { envelope: Box::new(envelope(workflow)) }
}

pub fn node_scheduled(node_id: &str, node_type: &str) -> EventAttrs {
    EventAttrs::NodeScheduled {
        node_id: node_id.to_string(),
        node_type: node_type.to_string(),
        input: json!({}),
    }
}

pub fn node_completed(scheduled_event_id: i64, node_id: &str, output: serde_json::Value) -> EventAttrs {
    EventAttrs::NodeCompleted {
        scheduled_event_id,
        node_id: node_id.to_string(),
        output,
        metadata: ExecMetadata::default(),
        attempts: vec![],
        fixtures: vec![],
    }
}

pub fn node_completed_with_timer(
    scheduled_event_id: i64,
    node_id: &str,
    resume_at_ms: u64,
) -> EventAttrs {
    EventAttrs::NodeCompleted {
        scheduled_event_id,
        node_id: node_id.to_string(),
        output: serde_json::Value::Null,
        metadata: ExecMetadata { timer_requested: true, resume_at_ms: Some(resume_at_ms) },
        attempts: vec![],
        fixtures: vec![],
    }
}

pub fn node_failed(scheduled_event_id: i64, node_id: &str, error: NodeError) -> EventAttrs {
    EventAttrs::NodeFailed {
        scheduled_event_id,
        node_id: node_id.to_string(),
        error,
        attempts: vec![],
    }
}

pub fn timer_started(timer_id: &str, delay_ms: u64, node_id: &str) -> EventAttrs {
    EventAttrs::TimerStarted {
        timer_id: timer_id.to_string(),
        delay_ms,
        node_id: Some(node_id.to_string()),
    }
}

pub fn timer_fired(scheduled_event_id: i64, timer_id: &str) -> EventAttrs {
    EventAttrs::TimerFired { scheduled_event_id, timer_id: timer_id.to_string() }
}
