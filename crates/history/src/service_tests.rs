// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sink::NoopSink;
use lf_core::test_support::{envelope, linear_graph};
use lf_core::{Command, CompletionStatus, ExecMetadata, FakeClock, NodeError};
use lf_matching::{MatchingConfig, MatchingService};
use lf_storage::ShardManager;
use lf_timer::TimerService;
use serde_json::json;

struct Harness {
    history: HistoryService<FakeClock>,
    matching: Arc<MatchingService<FakeClock>>,
    timers: Arc<TimerService<FakeClock>>,
    clock: FakeClock,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let store = Arc::new(ShardManager::open(dir.path(), 4).unwrap());
    let matching =
        Arc::new(MatchingService::new(MatchingConfig::default(), clock.clone()));
    let timers =
        Arc::new(TimerService::open(&dir.path().join("timers.journal"), clock.clone()).unwrap());
    let history = HistoryService::new(
        HistoryConfig::default(),
        store,
        matching.clone(),
        timers.clone(),
        Arc::new(NoopSink),
        clock.clone(),
    );
    Harness { history, matching, timers, clock, _dir: dir }
}

async fn poll_decision(h: &Harness) -> DecisionTask {
    let delivered = h
        .matching
        .poll_task("default", WORKFLOW_TASK_QUEUE, "test-decider", Duration::from_millis(100))
        .await
        .unwrap()
        .unwrap();
    match delivered.task {
        TaskPayload::Decision(task) => task,
        other => panic!("expected decision task, got {other}"),
    }
}

async fn poll_activity(h: &Harness) -> lf_core::ActivityTask {
    let delivered = h
        .matching
        .poll_task("default", "activities", "test-worker", Duration::from_millis(100))
        .await
        .unwrap()
        .unwrap();
    match delivered.task {
        TaskPayload::Activity(task) => task,
        other => panic!("expected activity task, got {other}"),
    }
}

fn kinds(history: &[HistoryEvent]) -> Vec<&'static str> {
    history.iter().map(|e| e.attrs.kind()).collect()
}

#[tokio::test]
async fn start_workflow_schedules_first_decision() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();

    let history = h.history.get_history(&exec, 0).unwrap();
    assert_eq!(kinds(&history), vec!["execution:started", "decision:scheduled"]);

    let state = h.history.describe(&exec).unwrap();
    assert_eq!(state.status, ExecutionStatus::Running);
    assert_eq!(state.decision_inflight, Some(2));

    let task = poll_decision(&h).await;
    assert_eq!(task.exec, exec);
    assert_eq!(task.scheduled_event_id, 2);
}

#[tokio::test]
async fn invalid_envelope_rejected_without_execution() {
    let h = harness();
    let mut bad = envelope(linear_graph());
    bad.callback_token = String::new();
    let err = h.history.start_workflow(bad).await.unwrap_err();
    assert!(matches!(err, HistoryError::Validation(_)));
}

#[tokio::test]
async fn event_during_decision_sets_pending_and_schedules_followup() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();
    let task = poll_decision(&h).await;

    // Signal arrives while the decision round is in flight
    h.history.signal_workflow(&exec, "poke", json!({})).await.unwrap();
    let state = h.history.describe(&exec).unwrap();
    assert!(state.pending_decision);
    assert_eq!(state.decision_inflight, Some(task.scheduled_event_id));

    // Ack the round: the follow-up is scheduled immediately
    h.history.record_decision_task_completed(&task, vec![]).await.unwrap();
    let state = h.history.describe(&exec).unwrap();
    assert!(!state.pending_decision);
    assert!(state.decision_inflight.is_some());

    // Invariant: between scheduled and completed there is no second scheduled
    let history = h.history.get_history(&exec, 0).unwrap();
    let mut inflight = false;
    for event in &history {
        match &event.attrs {
            EventAttrs::DecisionTaskScheduled { .. } => {
                assert!(!inflight, "second decision scheduled while one in flight");
                inflight = true;
            }
            EventAttrs::DecisionTaskCompleted { .. } => inflight = false,
            _ => {}
        }
    }
}

#[tokio::test]
async fn schedule_activity_command_enqueues_task_with_node_config() {
    let h = harness();
    let mut graph = linear_graph();
    graph.nodes[1].config = json!({"url": "https://api.test", "retry": {"max_attempts": 5}});
    let exec = h.history.start_workflow(envelope(graph)).await.unwrap();
    let task = poll_decision(&h).await;

    h.history
        .record_decision_task_completed(
            &task,
            vec![Command::ScheduleActivityTask {
                node_id: "h".into(),
                node_type: "http_request".into(),
                input: json!({"x": 1}),
            }],
        )
        .await
        .unwrap();

    let activity = poll_activity(&h).await;
    assert_eq!(activity.node_id, "h");
    assert_eq!(activity.retry.max_attempts, 5);
    assert_eq!(activity.config["url"], "https://api.test");
    assert_eq!(activity.attempt, 1);

    let history = h.history.get_history(&exec, 0).unwrap();
    let scheduled = &history[(activity.scheduled_event_id - 1) as usize];
    assert_eq!(scheduled.attrs.kind(), "node:scheduled");
}

#[tokio::test]
async fn complete_workflow_command_is_terminal() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();
    let task = poll_decision(&h).await;

    h.history
        .record_decision_task_completed(
            &task,
            vec![Command::CompleteWorkflowExecution { status: CompletionStatus::Completed }],
        )
        .await
        .unwrap();

    let state = h.history.describe(&exec).unwrap();
    assert_eq!(state.status, ExecutionStatus::Completed);
    assert!(state.finished_at_ms.is_some());

    // Further signals are dropped
    h.history.signal_workflow(&exec, "late", json!({})).await.unwrap();
    let history = h.history.get_history(&exec, 0).unwrap();
    assert_eq!(history.last().unwrap().attrs.kind(), "workflow:completed");
}

#[tokio::test]
async fn stale_decision_task_is_rejected() {
    let h = harness();
    let _exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();
    let task = poll_decision(&h).await;

    let mut stale = task.clone();
    stale.scheduled_event_id = 99;
    let err = h.history.record_decision_task_completed(&stale, vec![]).await.unwrap_err();
    assert!(matches!(err, HistoryError::StaleDecisionTask(_)));

    // The live task still works
    h.history.record_decision_task_completed(&task, vec![]).await.unwrap();
}

#[tokio::test]
async fn decision_failures_exhaust_to_workflow_failed() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();

    for round in 1..=3u32 {
        let task = poll_decision(&h).await;
        assert_eq!(task.attempt, round);
        h.history.record_decision_task_failed(&task, "decider panicked").await.unwrap();
    }

    let state = h.history.describe(&exec).unwrap();
    assert_eq!(state.status, ExecutionStatus::Failed);
    let history = h.history.get_history(&exec, 0).unwrap();
    match &history.last().unwrap().attrs {
        EventAttrs::WorkflowFailed { message } => {
            assert!(message.starts_with("decision_failure:"), "got {message}");
        }
        other => panic!("expected workflow:failed, got {}", other.kind()),
    }
}

#[tokio::test]
async fn activity_outcome_records_once_and_reschedules_decider() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();
    let task = poll_decision(&h).await;
    h.history
        .record_decision_task_completed(
            &task,
            vec![Command::ScheduleActivityTask {
                node_id: "t".into(),
                node_type: "trigger_manual".into(),
                input: json!({}),
            }],
        )
        .await
        .unwrap();
    let activity = poll_activity(&h).await;

    assert!(h
        .history
        .record_activity_task_started(&exec, activity.scheduled_event_id, 1, "w1")
        .await
        .unwrap());

    let recorded = h
        .history
        .record_activity_task_completed(
            &exec,
            activity.scheduled_event_id,
            json!({"ok": true}),
            ExecMetadata::default(),
            vec![],
            vec![],
        )
        .await
        .unwrap();
    assert!(recorded);

    // Redelivered duplicate is dropped
    let duplicate = h
        .history
        .record_activity_task_completed(
            &exec,
            activity.scheduled_event_id,
            json!({"ok": true}),
            ExecMetadata::default(),
            vec![],
            vec![],
        )
        .await
        .unwrap();
    assert!(!duplicate);

    let history = h.history.get_history(&exec, 0).unwrap();
    let completions = history
        .iter()
        .filter(|e| e.attrs.kind() == "node:completed")
        .count();
    assert_eq!(completions, 1);
    // The completion triggered a fresh decision round
    assert_eq!(history.last().unwrap().attrs.kind(), "decision:scheduled");
}

#[tokio::test]
async fn failed_activity_appends_node_failed() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();
    let task = poll_decision(&h).await;
    h.history
        .record_decision_task_completed(
            &task,
            vec![Command::ScheduleActivityTask {
                node_id: "h".into(),
                node_type: "http_request".into(),
                input: json!({}),
            }],
        )
        .await
        .unwrap();
    let activity = poll_activity(&h).await;

    h.history
        .record_activity_task_failed(
            &exec,
            activity.scheduled_event_id,
            NodeError::non_retryable("HTTP_500", "server exploded"),
            vec![],
        )
        .await
        .unwrap();

    let history = h.history.get_history(&exec, 0).unwrap();
    assert!(history.iter().any(|e| e.attrs.kind() == "node:failed"));
}

#[tokio::test]
async fn timer_round_trip_with_duplicate_fire() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();
    let task = poll_decision(&h).await;

    h.history
        .record_decision_task_completed(
            &task,
            vec![Command::StartTimer {
                timer_id: "delay-1".into(),
                delay_ms: 600_000,
                node_id: Some("h".into()),
            }],
        )
        .await
        .unwrap();

    let state = h.history.describe(&exec).unwrap();
    assert_eq!(state.status, ExecutionStatus::Waiting);
    assert_eq!(h.timers.pending(), 1);

    // Fire the timer
    h.clock.advance(Duration::from_secs(601));
    let due = h.timers.due_now();
    assert_eq!(due.len(), 1);
    assert!(h.history.record_timer_fired(&due[0]).await.unwrap());

    let state = h.history.describe(&exec).unwrap();
    assert_eq!(state.status, ExecutionStatus::Running);

    // Duplicate fire (crash replay) is a no-op
    assert!(!h.history.record_timer_fired(&due[0]).await.unwrap());
    let history = h.history.get_history(&exec, 0).unwrap();
    let fires = history.iter().filter(|e| e.attrs.kind() == "timer:fired").count();
    assert_eq!(fires, 1);
}

#[tokio::test]
async fn cancel_workflow_is_idempotent_and_cancels_timers() {
    let h = harness();
    let exec = h.history.start_workflow(envelope(linear_graph())).await.unwrap();
    let task = poll_decision(&h).await;
    h.history
        .record_decision_task_completed(
            &task,
            vec![Command::StartTimer {
                timer_id: "delay-1".into(),
                delay_ms: 600_000,
                node_id: None,
            }],
        )
        .await
        .unwrap();
    assert_eq!(h.timers.pending(), 1);

    assert!(h.history.cancel_workflow(&exec, Some("user".into())).await.unwrap());
    assert_eq!(h.timers.pending(), 0);
    let state = h.history.describe(&exec).unwrap();
    assert_eq!(state.status, ExecutionStatus::Cancelled);

    // Second cancel is a no-op
    assert!(!h.history.cancel_workflow(&exec, None).await.unwrap());
}
