// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation.
//!
//! Task queues are transient: a restart loses whatever was enqueued but
//! not finished. The event log is the durable truth, so reconciliation
//! rebuilds the lost work from it: every non-terminal execution gets its
//! unfinished activities re-enqueued and a fresh decision round. Duplicate
//! outcomes from tasks that did survive are dropped by the usual
//! idempotent recording.

use crate::apply::{execution_envelope, timeout_from};
use crate::error::HistoryError;
use crate::service::{HistoryService, RoundEffects};
use lf_core::{ActivityTask, Clock, EventAttrs, RetryPolicy, TaskId};

impl<C: Clock> HistoryService<C> {
    /// Reconcile all executions after a restart. Returns how many
    /// executions were touched. Run before the worker pool starts polling.
    pub async fn reconcile(&self) -> Result<usize, HistoryError> {
        let now = self.clock.epoch_ms();
        let mut touched = 0usize;
        for exec in self.store.non_terminal() {
            let effects =
                self.store.with_shard(&exec, |shard| -> Result<RoundEffects, HistoryError> {
                    let mut effects = RoundEffects::default();
                    let state = self.require_state(shard, &exec)?;
                    if state.is_terminal() {
                        return Ok(effects);
                    }
                    let history = shard.get_history(&exec, 0)?;
                    let Some(envelope) = execution_envelope(&history) else {
                        tracing::warn!(%exec, "non-terminal execution without start event");
                        return Ok(effects);
                    };

                    // Re-issue tasks for nodes scheduled but never resolved.
                    for event in &history {
                        let EventAttrs::NodeScheduled { node_id, node_type, input } = &event.attrs
                        else {
                            continue;
                        };
                        let resolved = history
                            .iter()
                            .any(|e| Self::is_outcome_for(&e.attrs, event.event_id));
                        if resolved {
                            continue;
                        }
                        let Some(node) = envelope.workflow.node(node_id) else { continue };
                        effects.activity_tasks.push(ActivityTask {
                            task_id: TaskId::new(),
                            exec: exec.clone(),
                            scheduled_event_id: event.event_id,
                            node_id: node_id.clone(),
                            node_type: node_type.clone(),
                            config: node.config.clone(),
                            input: input.clone(),
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

                    // Any in-flight decision round died with the old
                    // process; clear it and run a fresh one.
                    shard.update_state(&exec, |s| s.decision_inflight = None)?;
                    self.schedule_decision_locked(shard, &exec, now, &mut effects)?;
                    Ok(effects)
                })?;

            let pending = effects.activity_tasks.len();
            if pending > 0 || effects.decision_task.is_some() {
                touched += 1;
                tracing::info!(%exec, pending_activities = pending, "reconciled execution");
            }
            self.perform(&exec, effects).await?;
        }
        Ok(touched)
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
