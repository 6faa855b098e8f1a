// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn events_serialize_tagged() {
    let attrs = EventAttrs::NodeFailed {
        scheduled_event_id: 3,
        node_id: "h1".into(),
        error: NodeError::non_retryable("HTTP_404", "not found"),
        attempts: vec![],
    };
    let value = serde_json::to_value(&attrs).unwrap();
    assert_eq!(value["type"], "node:failed");
    assert_eq!(value["scheduled_event_id"], 3);
    let back: EventAttrs = serde_json::from_value(value).unwrap();
    assert_eq!(back, attrs);
}

#[test]
fn history_event_flattens_attrs() {
    let event = HistoryEvent {
        event_id: 7,
        event_time_ms: 1_000,
        attrs: EventAttrs::DecisionTaskScheduled { attempt: 1 },
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["event_id"], 7);
    assert_eq!(value["type"], "decision:scheduled");
    let back: HistoryEvent = serde_json::from_value(value).unwrap();
    assert_eq!(back, event);
}

#[test]
fn scheduled_event_id_backlinks() {
    let completed = EventAttrs::NodeCompleted {
        scheduled_event_id: 4,
        node_id: "h1".into(),
        output: json!({"ok": true}),
        metadata: ExecMetadata::default(),
        attempts: vec![],
        fixtures: vec![],
    };
    assert_eq!(completed.scheduled_event_id(), Some(4));

    let scheduled = EventAttrs::NodeScheduled {
        node_id: "h1".into(),
        node_type: "http_request".into(),
        input: json!({}),
    };
    assert_eq!(scheduled.scheduled_event_id(), None);
}

#[test]
fn terminal_events() {
    assert!(EventAttrs::WorkflowCompleted { status: CompletionStatus::Completed }.is_terminal());
    assert!(EventAttrs::WorkflowFailed { message: "x".into() }.is_terminal());
    assert!(EventAttrs::WorkflowCancelled { reason: None }.is_terminal());
    assert!(!EventAttrs::DecisionTaskScheduled { attempt: 1 }.is_terminal());
}

#[test]
fn log_summary_names_the_node() {
    let attrs = EventAttrs::NodeFailed {
        scheduled_event_id: 3,
        node_id: "h1".into(),
        error: NodeError::retryable("HTTP_503", "unavailable"),
        attempts: vec![],
    };
    assert_eq!(attrs.log_summary(), "node:failed node=h1 error=HTTP_503");
}

#[test]
fn kind_matches_serde_tag() {
    let attrs = EventAttrs::TimerFired { scheduled_event_id: 9, timer_id: "d1".into() };
    let value = serde_json::to_value(&attrs).unwrap();
    assert_eq!(value["type"], attrs.kind());
}
