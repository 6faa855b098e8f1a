// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core of the history service: execution lifecycle and the
//! one-decision-in-flight invariant.

use crate::error::HistoryError;
use crate::sink::ProgressSink;
use lf_core::{
    shard_for, Clock, DecisionTask, EventAttrs, ExecutionId, ExecutionState, ExecutionStatus,
    HistoryEvent, JobEnvelope, RunId, TaskId, TaskPayload,
};
use lf_matching::{MatchingService, QueueKey};
use lf_storage::{ShardManager, ShardStore};
use lf_timer::{TimerKey, TimerService};
use std::sync::Arc;
use std::time::Duration;

/// Queue name decision tasks go to; activity tasks use the configured
/// activity queue.
pub const WORKFLOW_TASK_QUEUE: &str = "workflow";

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Activity task queue name.
    pub task_queue: String,
    /// Consecutive decision-task failures tolerated before the workflow is
    /// failed with a decision_failure.
    pub decision_retry_limit: u32,
    pub default_schedule_to_close_ms: u64,
    pub default_start_to_close_ms: u64,
    /// Replaying histories longer than this logs a slow-replay warning.
    pub replay_warn_events: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            task_queue: "activities".to_string(),
            decision_retry_limit: 3,
            default_schedule_to_close_ms: 300_000,
            default_start_to_close_ms: 60_000,
            replay_warn_events: 500,
        }
    }
}

impl HistoryConfig {
    lf_core::setters! {
        into task_queue: String;
        set decision_retry_limit: u32;
        set default_schedule_to_close_ms: u64;
        set default_start_to_close_ms: u64;
    }
}

/// Side effects collected under the shard lock and performed after it is
/// released (task enqueues, timer registrations, sink notifications).
#[derive(Default)]
pub(crate) struct RoundEffects {
    pub events: Vec<HistoryEvent>,
    pub state: Option<ExecutionState>,
    pub decision_task: Option<DecisionTask>,
    pub activity_tasks: Vec<lf_core::ActivityTask>,
    pub timer_schedules: Vec<(TimerKey, u64)>,
    pub timer_cancels: Vec<(ExecutionId, String)>,
}

pub struct HistoryService<C: Clock> {
    pub(crate) config: HistoryConfig,
    pub(crate) store: Arc<ShardManager>,
    pub(crate) matching: Arc<MatchingService<C>>,
    pub(crate) timers: Arc<TimerService<C>>,
    pub(crate) sink: Arc<dyn ProgressSink>,
    pub(crate) clock: C,
}

impl<C: Clock> HistoryService<C> {
    pub fn new(
        config: HistoryConfig,
        store: Arc<ShardManager>,
        matching: Arc<MatchingService<C>>,
        timers: Arc<TimerService<C>>,
        sink: Arc<dyn ProgressSink>,
        clock: C,
    ) -> Self {
        Self { config, store, matching, timers, sink, clock }
    }

    /// Get a reference to the clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Validate the envelope, append `ExecutionStarted`, and schedule the
    /// first decision round.
    pub async fn start_workflow(&self, envelope: JobEnvelope) -> Result<ExecutionId, HistoryError> {
        envelope.validate()?;

        let workflow_id = if envelope.execution_id.is_empty() {
            envelope.job_id.clone()
        } else {
            envelope.execution_id.clone()
        };
        let exec =
            ExecutionId::new(envelope.namespace_or_default(), workflow_id, RunId::new());
        let now = self.clock.epoch_ms();
        let job_id = envelope.job_id.clone();

        let effects = self.store.with_shard(&exec, |shard| -> Result<RoundEffects, HistoryError> {
            let mut effects = RoundEffects::default();
            let state = ExecutionState::new(exec.clone(), job_id.clone(), now);
            let outcome = shard.create_execution(
                state,
                EventAttrs::ExecutionStarted { envelope: Box::new(envelope) },
                now,
                |s| s.transition(ExecutionStatus::Running, now),
            )?;
            effects.events.extend(outcome.events);
            self.schedule_decision_locked(shard, &exec, now, &mut effects)?;
            effects.state = shard.get_state(&exec);
            Ok(effects)
        })?;

        tracing::info!(%exec, job = %job_id, "workflow started");
        self.perform(&exec, effects).await?;
        Ok(exec)
    }

    /// Append a `SignalReceived` event and run a decision round.
    pub async fn signal_workflow(
        &self,
        exec: &ExecutionId,
        name: &str,
        payload: serde_json::Value,
    ) -> Result<(), HistoryError> {
        let now = self.clock.epoch_ms();
        let effects = self.store.with_shard(exec, |shard| -> Result<RoundEffects, HistoryError> {
            let mut effects = RoundEffects::default();
            let state = self.require_state(shard, exec)?;
            if state.is_terminal() {
                return Ok(effects);
            }
            let outcome = shard.append(
                exec,
                state.last_event_id,
                vec![EventAttrs::SignalReceived {
                    name: name.to_string(),
                    payload,
                }],
                now,
                |_| {},
            )?;
            effects.events.extend(outcome.events);
            self.schedule_decision_locked(shard, exec, now, &mut effects)?;
            effects.state = shard.get_state(exec);
            Ok(effects)
        })?;
        self.perform(exec, effects).await
    }

    /// Terminal cancel. Idempotent: cancelling a terminal execution is a
    /// no-op. Pending timers for the execution are cancelled too.
    pub async fn cancel_workflow(
        &self,
        exec: &ExecutionId,
        reason: Option<String>,
    ) -> Result<bool, HistoryError> {
        let now = self.clock.epoch_ms();
        let effects = self.store.with_shard(exec, |shard| -> Result<RoundEffects, HistoryError> {
            let mut effects = RoundEffects::default();
            let state = self.require_state(shard, exec)?;
            if state.is_terminal() {
                return Ok(effects);
            }
            let history = shard.get_history(exec, 0)?;
            let outcome = shard.append(
                exec,
                state.last_event_id,
                vec![EventAttrs::WorkflowCancelled { reason: reason.clone() }],
                now,
                |s| s.transition(ExecutionStatus::Cancelled, now),
            )?;
            effects.events.extend(outcome.events);
            for event in live_timers(&history) {
                if let EventAttrs::TimerStarted { timer_id, .. } = &event.attrs {
                    effects.timer_cancels.push((exec.clone(), timer_id.clone()));
                }
            }
            effects.state = shard.get_state(exec);
            Ok(effects)
        })?;

        let cancelled = !effects.events.is_empty();
        if cancelled {
            tracing::info!(%exec, "workflow cancelled");
        }
        self.perform(exec, effects).await?;
        Ok(cancelled)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_history(
        &self,
        exec: &ExecutionId,
        from_event_id: i64,
    ) -> Result<Vec<HistoryEvent>, HistoryError> {
        Ok(self.store.with_shard(exec, |shard| shard.get_history(exec, from_event_id))?)
    }

    pub fn describe(&self, exec: &ExecutionId) -> Result<ExecutionState, HistoryError> {
        self.store
            .with_shard(exec, |shard| shard.get_state(exec))
            .ok_or_else(|| HistoryError::NotFound(exec.to_string()))
    }

    // ── Decision scheduling primitive ───────────────────────────────────

    /// Schedule a decision task unless one is already in flight (then just
    /// set the pending flag) or the execution is terminal.
    pub(crate) fn schedule_decision_locked(
        &self,
        shard: &mut ShardStore,
        exec: &ExecutionId,
        now: u64,
        effects: &mut RoundEffects,
    ) -> Result<(), HistoryError> {
        let state = self.require_state(shard, exec)?;
        if state.is_terminal() {
            return Ok(());
        }
        if state.decision_inflight.is_some() {
            shard.update_state(exec, |s| s.pending_decision = true)?;
            return Ok(());
        }

        let attempt = state.decision_failures + 1;
        let scheduled_event_id = state.last_event_id + 1;
        let outcome = shard.append(
            exec,
            state.last_event_id,
            vec![EventAttrs::DecisionTaskScheduled { attempt }],
            now,
            |s| {
                s.pending_decision = false;
                s.decision_inflight = Some(scheduled_event_id);
            },
        )?;
        effects.events.extend(outcome.events);
        effects.decision_task = Some(DecisionTask {
            task_id: TaskId::new(),
            exec: exec.clone(),
            scheduled_event_id,
            attempt,
        });
        Ok(())
    }

    pub(crate) fn require_state(
        &self,
        shard: &ShardStore,
        exec: &ExecutionId,
    ) -> Result<ExecutionState, HistoryError> {
        shard.get_state(exec).ok_or_else(|| HistoryError::NotFound(exec.to_string()))
    }

    // ── Post-lock side effects ──────────────────────────────────────────

    pub(crate) async fn perform(
        &self,
        exec: &ExecutionId,
        effects: RoundEffects,
    ) -> Result<(), HistoryError> {
        for (cancel_exec, timer_id) in &effects.timer_cancels {
            self.timers.cancel(cancel_exec, timer_id)?;
        }
        for (key, fire_at_ms) in effects.timer_schedules {
            self.timers.schedule(key, fire_at_ms)?;
        }
        if let Some(task) = effects.decision_task {
            let key = QueueKey {
                namespace: exec.namespace.clone(),
                task_queue: WORKFLOW_TASK_QUEUE.to_string(),
                partition: shard_for(&exec.workflow_id, self.matching.partitions()),
            };
            self.enqueue_with_retry(key, TaskPayload::Decision(task)).await?;
        }
        for task in effects.activity_tasks {
            let key = QueueKey {
                namespace: exec.namespace.clone(),
                task_queue: self.config.task_queue.clone(),
                partition: shard_for(&exec.workflow_id, self.matching.partitions()),
            };
            self.enqueue_with_retry(key, TaskPayload::Activity(task)).await?;
        }

        for event in &effects.events {
            self.sink.event_appended(exec, event).await;
        }
        if let Some(state) = &effects.state {
            if state.is_terminal() {
                let history = self.get_history(exec, 0)?;
                self.sink.execution_finished(exec, state, &history).await;
            }
        }
        Ok(())
    }

    /// Bounded retry against transient queue backpressure.
    async fn enqueue_with_retry(
        &self,
        key: QueueKey,
        payload: TaskPayload,
    ) -> Result<(), HistoryError> {
        let mut backpressure = None;
        for delay_ms in [0u64, 10, 50, 250] {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            match self.matching.add_task(key.clone(), payload.clone()) {
                Ok(()) => return Ok(()),
                Err(e @ lf_matching::MatchingError::ResourceExhausted { .. }) => {
                    tracing::warn!(queue = %key, "task queue full, backing off");
                    backpressure = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        match backpressure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

/// `TimerStarted` events without a matching fire or cancel.
pub(crate) fn live_timers(history: &[HistoryEvent]) -> Vec<&HistoryEvent> {
    history
        .iter()
        .filter(|e| matches!(e.attrs, EventAttrs::TimerStarted { .. }))
        .filter(|started| {
            !history.iter().any(|e| {
                matches!(
                    &e.attrs,
                    EventAttrs::TimerFired { scheduled_event_id, .. }
                    | EventAttrs::TimerCancelled { scheduled_event_id, .. }
                        if *scheduled_event_id == started.event_id
                )
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
