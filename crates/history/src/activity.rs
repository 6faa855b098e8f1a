// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity and timer outcome recording.

use crate::error::HistoryError;
use crate::service::{HistoryService, RoundEffects};
use lf_core::{
    Clock, ConnectorAttempt, ErrorKind, EventAttrs, ExecMetadata, ExecutionId, ExecutionStatus,
    Fixture, HistoryEvent, NodeError,
};
use lf_timer::TimerKey;

impl<C: Clock> HistoryService<C> {
    /// Record the pickup of an activity task. Returns `false` when the
    /// execution is already terminal (the worker should drop the task).
    pub async fn record_activity_task_started(
        &self,
        exec: &ExecutionId,
        scheduled_event_id: i64,
        attempt: u32,
        identity: &str,
    ) -> Result<bool, HistoryError> {
        let now = self.clock.epoch_ms();
        let effects = self.store.with_shard(exec, |shard| -> Result<RoundEffects, HistoryError> {
            let mut effects = RoundEffects::default();
            let state = self.require_state(shard, exec)?;
            if state.is_terminal() {
                return Ok(effects);
            }
            let history = shard.get_history(exec, 0)?;
            let Some(node_id) = scheduled_node(&history, scheduled_event_id) else {
                tracing::warn!(%exec, scheduled_event_id, "start for unknown node schedule");
                return Ok(effects);
            };
            let outcome = shard.append(
                exec,
                state.last_event_id,
                vec![EventAttrs::NodeStarted {
                    scheduled_event_id,
                    node_id,
                    attempt,
                    identity: identity.to_string(),
                }],
                now,
                |_| {},
            )?;
            effects.events.extend(outcome.events);
            effects.state = shard.get_state(exec);
            Ok(effects)
        })?;
        let recorded = !effects.events.is_empty();
        self.perform(exec, effects).await?;
        Ok(recorded)
    }

    /// Record a node's successful outcome and run a decision round.
    /// Duplicate completions (queue redelivery) and completions for
    /// terminal executions are ignored.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_activity_task_completed(
        &self,
        exec: &ExecutionId,
        scheduled_event_id: i64,
        output: serde_json::Value,
        metadata: ExecMetadata,
        attempts: Vec<ConnectorAttempt>,
        fixtures: Vec<Fixture>,
    ) -> Result<bool, HistoryError> {
        let attrs = move |node_id: String| EventAttrs::NodeCompleted {
            scheduled_event_id,
            node_id,
            output,
            metadata,
            attempts,
            fixtures,
        };
        self.record_node_outcome(exec, scheduled_event_id, attrs).await
    }

    /// Record a node's terminal failure. Timeout-kind errors append
    /// `NodeTimedOut`; everything else appends `NodeFailed`.
    pub async fn record_activity_task_failed(
        &self,
        exec: &ExecutionId,
        scheduled_event_id: i64,
        error: NodeError,
        attempts: Vec<ConnectorAttempt>,
    ) -> Result<bool, HistoryError> {
        let attrs = move |node_id: String| {
            if error.kind == ErrorKind::Timeout {
                EventAttrs::NodeTimedOut {
                    scheduled_event_id,
                    node_id,
                    message: error.message,
                    attempts,
                }
            } else {
                EventAttrs::NodeFailed { scheduled_event_id, node_id, error, attempts }
            }
        };
        self.record_node_outcome(exec, scheduled_event_id, attrs).await
    }

    /// A timer fired. Duplicate fires are deduplicated by the store; a
    /// dropped duplicate does not schedule another decision round.
    pub async fn record_timer_fired(&self, key: &TimerKey) -> Result<bool, HistoryError> {
        let exec = &key.exec;
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
                vec![EventAttrs::TimerFired {
                    scheduled_event_id: key.scheduled_event_id,
                    timer_id: key.timer_id.clone(),
                }],
                now,
                |s| s.transition(ExecutionStatus::Running, now),
            )?;
            if outcome.events.is_empty() {
                return Ok(effects);
            }
            effects.events.extend(outcome.events);
            self.schedule_decision_locked(shard, exec, now, &mut effects)?;
            effects.state = shard.get_state(exec);
            Ok(effects)
        })?;
        let recorded = !effects.events.is_empty();
        self.perform(exec, effects).await?;
        Ok(recorded)
    }

    pub(crate) fn is_outcome_for(attrs: &EventAttrs, scheduled_event_id: i64) -> bool {
        matches!(
            attrs,
            EventAttrs::NodeCompleted { scheduled_event_id: id, .. }
            | EventAttrs::NodeFailed { scheduled_event_id: id, .. }
            | EventAttrs::NodeTimedOut { scheduled_event_id: id, .. }
                if *id == scheduled_event_id
        )
    }

    async fn record_node_outcome(
        &self,
        exec: &ExecutionId,
        scheduled_event_id: i64,
        attrs: impl FnOnce(String) -> EventAttrs,
    ) -> Result<bool, HistoryError> {
        let now = self.clock.epoch_ms();
        let effects = self.store.with_shard(exec, |shard| -> Result<RoundEffects, HistoryError> {
            let mut effects = RoundEffects::default();
            let state = self.require_state(shard, exec)?;
            if state.is_terminal() {
                // In-flight activities of a cancelled/failed execution land
                // here; their results are dropped.
                return Ok(effects);
            }
            let history = shard.get_history(exec, 0)?;
            let Some(node_id) = scheduled_node(&history, scheduled_event_id) else {
                tracing::warn!(%exec, scheduled_event_id, "outcome for unknown node schedule");
                return Ok(effects);
            };
            if history.iter().any(|e| Self::is_outcome_for(&e.attrs, scheduled_event_id)) {
                tracing::debug!(%exec, scheduled_event_id, "duplicate node outcome dropped");
                return Ok(effects);
            }

            let event = attrs(node_id);
            let outcome = shard.append(exec, state.last_event_id, vec![event], now, |_| {})?;
            effects.events.extend(outcome.events);
            self.schedule_decision_locked(shard, exec, now, &mut effects)?;
            effects.state = shard.get_state(exec);
            Ok(effects)
        })?;
        let recorded = !effects.events.is_empty();
        self.perform(exec, effects).await?;
        Ok(recorded)
    }
}

/// Node id of the `NodeScheduled` event with this id.
fn scheduled_node(history: &[HistoryEvent], scheduled_event_id: i64) -> Option<String> {
    history
        .iter()
        .find(|e| e.event_id == scheduled_event_id)
        .and_then(|e| match &e.attrs {
            EventAttrs::NodeScheduled { node_id, .. } => Some(node_id.clone()),
            _ => None,
        })
}
