// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::RunId;
use serde_json::json;

fn exec() -> ExecutionId {
    ExecutionId::new("default", "wf-1", RunId::from_string("run-a"))
}

#[test]
fn deterministic_context_defaults_off() {
    let ctx: DeterministicContext = serde_json::from_value(json!({})).unwrap();
    assert_eq!(ctx.mode, DeterministicMode::Off);
    assert!(ctx.fixtures.is_empty());
}

#[test]
fn fixture_lookup_by_fingerprint() {
    let fixture = Fixture::capture("h1", json!({"a": 1}), json!({"ok": true}));
    let fp = fixture.request_fingerprint.clone();
    let ctx = DeterministicContext {
        mode: DeterministicMode::Replay,
        seed: 7,
        fixtures: vec![fixture],
    };
    assert!(ctx.fixture_for(&fp).is_some());
    assert!(ctx.fixture_for("nope").is_none());
}

#[test]
fn empty_metadata_serializes_empty() {
    let meta = ExecMetadata::default();
    assert!(meta.is_empty());
    assert_eq!(serde_json::to_value(&meta).unwrap(), json!({}));
}

#[test]
fn payload_round_trips_tagged() {
    let payload = TaskPayload::Decision(DecisionTask {
        task_id: TaskId::from_string("tsk-1"),
        exec: exec(),
        scheduled_event_id: 4,
        attempt: 1,
    });
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["kind"], "decision");
    let back: TaskPayload = serde_json::from_value(value).unwrap();
    assert_eq!(back, payload);
    assert_eq!(back.task_id(), TaskId::from_string("tsk-1"));
}
