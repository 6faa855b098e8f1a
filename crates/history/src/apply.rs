// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decision task lifecycle: start, completion (command application), and
//! failure with the retry cap.

use crate::error::HistoryError;
use crate::service::{HistoryService, RoundEffects};
use lf_core::{
    ActivityTask, Clock, Command, DecisionTask, EventAttrs, ExecutionStatus, HistoryEvent,
    JobEnvelope, RetryPolicy, TaskId,
};
use lf_timer::TimerKey;

impl<C: Clock> HistoryService<C> {
    /// Decider-side pickup: marks the decision round started and returns
    /// the full history for replay.
    pub async fn start_decision_task(
        &self,
        task: &DecisionTask,
        identity: &str,
    ) -> Result<Vec<HistoryEvent>, HistoryError> {
        let exec = &task.exec;
        let now = self.clock.epoch_ms();
        let (effects, history) =
            self.store.with_shard(exec, |shard| -> Result<_, HistoryError> {
                let mut effects = RoundEffects::default();
                let state = self.require_state(shard, exec)?;
                if state.is_terminal() || state.decision_inflight != Some(task.scheduled_event_id)
                {
                    return Err(HistoryError::StaleDecisionTask(exec.to_string()));
                }
                let outcome = shard.append(
                    exec,
                    state.last_event_id,
                    vec![EventAttrs::DecisionTaskStarted {
                        scheduled_event_id: task.scheduled_event_id,
                        identity: identity.to_string(),
                    }],
                    now,
                    |_| {},
                )?;
                effects.events.extend(outcome.events);
                let history = shard.get_history(exec, 0)?;
                Ok((effects, history))
            })?;

        if history.len() > self.config.replay_warn_events {
            tracing::warn!(
                %exec,
                events = history.len(),
                "long history; decider replay will be slow"
            );
        }
        self.perform(exec, effects).await?;
        Ok(history)
    }

    /// Apply a decider's commands atomically: one append covers the
    /// `DecisionTaskCompleted` marker and every command event. Task
    /// enqueues and timer registrations happen after the lock is released;
    /// the append is the commit point.
    pub async fn record_decision_task_completed(
        &self,
        task: &DecisionTask,
        commands: Vec<Command>,
    ) -> Result<(), HistoryError> {
        let exec = &task.exec;
        let now = self.clock.epoch_ms();

        for command in &commands {
            let fields: String = command
                .fields()
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ");
            tracing::debug!(%exec, "command {} {}", command.name(), fields);
        }

        let effects = self.store.with_shard(exec, |shard| -> Result<RoundEffects, HistoryError> {
            let mut effects = RoundEffects::default();
            let state = self.require_state(shard, exec)?;
            if state.is_terminal() {
                return Ok(effects);
            }
            if state.decision_inflight != Some(task.scheduled_event_id) {
                return Err(HistoryError::StaleDecisionTask(exec.to_string()));
            }

            let history = shard.get_history(exec, 0)?;
            let envelope = execution_envelope(&history)
                .ok_or_else(|| HistoryError::NotFound(exec.to_string()))?;

            let mut attrs = vec![EventAttrs::DecisionTaskCompleted {
                scheduled_event_id: task.scheduled_event_id,
            }];
            // Event ids are assigned densely on append; precompute them so
            // activity tasks and timer keys carry their NodeScheduled /
            // TimerStarted ids.
            let mut next_id = state.last_event_id + 1;
            let mut terminal: Option<ExecutionStatus> = None;
            let mut terminal_status = None;
            let mut started_timer = false;

            for command in commands {
                next_id += 1;
                match command {
                    Command::ScheduleActivityTask { node_id, node_type, input } => {
                        let node = envelope
                            .workflow
                            .node(&node_id)
                            .ok_or_else(|| HistoryError::UnknownNode(node_id.clone()))?;
                        attrs.push(EventAttrs::NodeScheduled {
                            node_id: node_id.clone(),
                            node_type: node_type.clone(),
                            input: input.clone(),
                        });
                        effects.activity_tasks.push(ActivityTask {
                            task_id: TaskId::new(),
                            exec: exec.clone(),
                            scheduled_event_id: next_id,
                            node_id,
                            node_type,
                            config: node.config.clone(),
                            input,
                            attempt: 1,
                            retry: RetryPolicy::from_config(&node.config),
                            deterministic: envelope.deterministic.clone(),
                            scheduled_at_ms: now,
                            schedule_to_close_ms: timeout_from(
                                &node.config,
                                "schedule_to_close_ms",
                                self.config.default_schedule_to_close_ms,
                            ),
                            start_to_close_ms: timeout_from(
                                &node.config,
                                "start_to_close_ms",
                                self.config.default_start_to_close_ms,
                            ),
                        });
                    }
                    Command::StartTimer { timer_id, delay_ms, node_id } => {
                        attrs.push(EventAttrs::TimerStarted {
                            timer_id: timer_id.clone(),
                            delay_ms,
                            node_id,
                        });
                        effects.timer_schedules.push((
                            TimerKey {
                                exec: exec.clone(),
                                timer_id,
                                scheduled_event_id: next_id,
                            },
                            now + delay_ms,
                        ));
                        started_timer = true;
                    }
                    Command::CancelTimer { timer_id } => {
                        match find_live_timer(&history, &timer_id) {
                            Some(started_id) => {
                                attrs.push(EventAttrs::TimerCancelled {
                                    scheduled_event_id: started_id,
                                    timer_id: timer_id.clone(),
                                });
                                effects.timer_cancels.push((exec.clone(), timer_id));
                            }
                            None => {
                                tracing::warn!(%exec, timer = %timer_id, "cancel for unknown timer");
                                next_id -= 1;
                            }
                        }
                    }
                    Command::CompleteWorkflowExecution { status } => {
                        attrs.push(EventAttrs::WorkflowCompleted { status });
                        terminal = Some(ExecutionStatus::Completed);
                        terminal_status = Some(status);
                    }
                    Command::FailWorkflowExecution { message } => {
                        attrs.push(EventAttrs::WorkflowFailed { message });
                        terminal = Some(ExecutionStatus::Failed);
                    }
                }
            }

            let scheduled_activities = !effects.activity_tasks.is_empty();
            let outcome = shard.append(exec, state.last_event_id, attrs, now, |s| {
                s.decision_inflight = None;
                s.decision_failures = 0;
                match terminal {
                    Some(status) => s.transition(status, now),
                    None if started_timer && !scheduled_activities => {
                        s.transition(ExecutionStatus::Waiting, now)
                    }
                    None => s.transition(ExecutionStatus::Running, now),
                }
            })?;
            effects.events.extend(outcome.events);

            if let Some(status) = terminal_status {
                tracing::info!(%exec, %status, "workflow completed");
            }

            // Events that arrived mid-round get their follow-up now.
            let state = self.require_state(shard, exec)?;
            if state.pending_decision && !state.is_terminal() {
                self.schedule_decision_locked(shard, exec, now, &mut effects)?;
            }
            effects.state = shard.get_state(exec);
            Ok(effects)
        })?;

        self.perform(exec, effects).await
    }

    /// A decider blew up (or its result could not be parsed). Retries up to
    /// the policy cap; beyond it the workflow fails with a decision_failure.
    pub async fn record_decision_task_failed(
        &self,
        task: &DecisionTask,
        error: &str,
    ) -> Result<(), HistoryError> {
        let exec = &task.exec;
        let now = self.clock.epoch_ms();
        let effects = self.store.with_shard(exec, |shard| -> Result<RoundEffects, HistoryError> {
            let mut effects = RoundEffects::default();
            let state = self.require_state(shard, exec)?;
            if state.is_terminal() || state.decision_inflight != Some(task.scheduled_event_id) {
                return Ok(effects);
            }

            let failures = state.decision_failures + 1;
            if failures >= self.config.decision_retry_limit {
                tracing::error!(%exec, failures, error, "decision task failed terminally");
                let outcome = shard.append(
                    exec,
                    state.last_event_id,
                    vec![EventAttrs::WorkflowFailed {
                        message: format!("decision_failure: {error}"),
                    }],
                    now,
                    |s| {
                        s.decision_inflight = None;
                        s.decision_failures = failures;
                        s.transition(ExecutionStatus::Failed, now);
                    },
                )?;
                effects.events.extend(outcome.events);
            } else {
                tracing::warn!(%exec, failures, error, "decision task failed, retrying");
                shard.update_state(exec, |s| {
                    s.decision_inflight = None;
                    s.decision_failures = failures;
                })?;
                self.schedule_decision_locked(shard, exec, now, &mut effects)?;
            }
            effects.state = shard.get_state(exec);
            Ok(effects)
        })?;

        self.perform(exec, effects).await
    }
}

/// The envelope that started this execution (always event 1).
pub(crate) fn execution_envelope(history: &[HistoryEvent]) -> Option<&JobEnvelope> {
    history.first().and_then(|e| match &e.attrs {
        EventAttrs::ExecutionStarted { envelope } => Some(envelope.as_ref()),
        _ => None,
    })
}

/// Event id of the live `TimerStarted` for `timer_id`, if any.
fn find_live_timer(history: &[HistoryEvent], timer_id: &str) -> Option<i64> {
    crate::service::live_timers(history)
        .into_iter()
        .find(|e| matches!(&e.attrs, EventAttrs::TimerStarted { timer_id: t, .. } if t == timer_id))
        .map(|e| e.event_id)
}

/// Per-node timeout override from `config.timeouts`, else the default.
pub(crate) fn timeout_from(config: &serde_json::Value, key: &str, default_ms: u64) -> u64 {
    config
        .get("timeouts")
        .and_then(|t| t.get(key))
        .and_then(|v| v.as_u64())
        .unwrap_or(default_ms)
}
