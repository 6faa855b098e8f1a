// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool: long-poll loops for decision and activity tasks.

use crate::decider::decide;
use crate::runner::{ActivityOutcome, ActivityRunner};
use lf_core::{Clock, TaskPayload};
use lf_history::{HistoryError, HistoryService, WORKFLOW_TASK_QUEUE};
use lf_matching::{DeliveredTask, MatchingService};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub namespace: String,
    /// Activity queue to poll; decision tasks always come from "workflow".
    pub task_queue: String,
    pub decider_workers: usize,
    pub activity_workers: usize,
    pub long_poll_ms: u64,
    pub identity_prefix: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            task_queue: "activities".to_string(),
            decider_workers: 2,
            activity_workers: 4,
            long_poll_ms: 10_000,
            identity_prefix: "lf-worker".to_string(),
        }
    }
}

impl WorkerConfig {
    lf_core::setters! {
        into namespace: String;
        into task_queue: String;
        into identity_prefix: String;
        set decider_workers: usize;
        set activity_workers: usize;
        set long_poll_ms: u64;
    }
}

pub struct WorkerPool<C: Clock + 'static> {
    config: WorkerConfig,
    history: Arc<HistoryService<C>>,
    matching: Arc<MatchingService<C>>,
    runner: Arc<ActivityRunner>,
}

impl<C: Clock + 'static> WorkerPool<C> {
    pub fn new(
        config: WorkerConfig,
        history: Arc<HistoryService<C>>,
        matching: Arc<MatchingService<C>>,
        runner: Arc<ActivityRunner>,
    ) -> Self {
        Self { config, history, matching, runner }
    }

    /// Spawn all poll loops; they run until `shutdown` fires.
    pub fn spawn(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for i in 0..self.config.decider_workers {
            let identity = format!("{}-decider-{i}", self.config.identity_prefix);
            handles.push(tokio::spawn(decider_loop(
                identity,
                self.config.clone(),
                self.history.clone(),
                self.matching.clone(),
                shutdown.clone(),
            )));
        }
        for i in 0..self.config.activity_workers {
            let identity = format!("{}-activity-{i}", self.config.identity_prefix);
            handles.push(tokio::spawn(activity_loop(
                identity,
                self.config.clone(),
                self.history.clone(),
                self.matching.clone(),
                self.runner.clone(),
                shutdown.clone(),
            )));
        }
        tracing::info!(
            deciders = self.config.decider_workers,
            activities = self.config.activity_workers,
            "worker pool started"
        );
        handles
    }
}

async fn decider_loop<C: Clock>(
    identity: String,
    config: WorkerConfig,
    history: Arc<HistoryService<C>>,
    matching: Arc<MatchingService<C>>,
    shutdown: CancellationToken,
) {
    let long_poll = Duration::from_millis(config.long_poll_ms);
    loop {
        let delivered = tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = matching.poll_task(&config.namespace, WORKFLOW_TASK_QUEUE, &identity, long_poll) => polled,
        };
        let delivered = match delivered {
            Ok(Some(delivered)) => delivered,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(worker = %identity, error = %e, "decision poll failed");
                continue;
            }
        };
        handle_decision_task(&identity, &history, &matching, delivered).await;
    }
    tracing::debug!(worker = %identity, "decider loop stopped");
}

async fn handle_decision_task<C: Clock>(
    identity: &str,
    history: &HistoryService<C>,
    matching: &MatchingService<C>,
    delivered: DeliveredTask,
) {
    let TaskPayload::Decision(task) = delivered.task else {
        tracing::error!(worker = identity, "activity task on workflow queue, dropping");
        let _ = matching.complete_task(&delivered.token);
        return;
    };

    let events = match history.start_decision_task(&task, identity).await {
        Ok(events) => events,
        Err(HistoryError::StaleDecisionTask(_)) | Err(HistoryError::NotFound(_)) => {
            // Superseded round; nothing to decide.
            let _ = matching.complete_task(&delivered.token);
            return;
        }
        Err(e) => {
            tracing::warn!(worker = identity, exec = %task.exec, error = %e, "decision start failed");
            let _ = matching.fail_task(
                &delivered.token,
                Some(e.to_string()),
                Some(Duration::from_millis(500)),
            );
            return;
        }
    };

    let result = match decide(&events) {
        Ok(commands) => history.record_decision_task_completed(&task, commands).await,
        Err(e) => history.record_decision_task_failed(&task, &e.to_string()).await,
    };

    match result {
        Ok(()) | Err(HistoryError::StaleDecisionTask(_)) => {
            let _ = matching.complete_task(&delivered.token);
        }
        Err(e) => {
            tracing::warn!(worker = identity, exec = %task.exec, error = %e, "decision ack failed");
            let _ = matching.fail_task(
                &delivered.token,
                Some(e.to_string()),
                Some(Duration::from_millis(500)),
            );
        }
    }
}

async fn activity_loop<C: Clock>(
    identity: String,
    config: WorkerConfig,
    history: Arc<HistoryService<C>>,
    matching: Arc<MatchingService<C>>,
    runner: Arc<ActivityRunner>,
    shutdown: CancellationToken,
) {
    let long_poll = Duration::from_millis(config.long_poll_ms);
    loop {
        let delivered = tokio::select! {
            _ = shutdown.cancelled() => break,
            polled = matching.poll_task(&config.namespace, &config.task_queue, &identity, long_poll) => polled,
        };
        let delivered = match delivered {
            Ok(Some(delivered)) => delivered,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(worker = %identity, error = %e, "activity poll failed");
                continue;
            }
        };
        handle_activity_task(&identity, &history, &matching, &runner, &shutdown, delivered).await;
    }
    tracing::debug!(worker = %identity, "activity loop stopped");
}

async fn handle_activity_task<C: Clock>(
    identity: &str,
    history: &HistoryService<C>,
    matching: &MatchingService<C>,
    runner: &ActivityRunner,
    shutdown: &CancellationToken,
    delivered: DeliveredTask,
) {
    let TaskPayload::Activity(task) = delivered.task else {
        tracing::error!(worker = identity, "decision task on activity queue, dropping");
        let _ = matching.complete_task(&delivered.token);
        return;
    };

    // Schedule-to-close: a task that sat queued past its budget is timed
    // out instead of executed.
    let now = history.clock().epoch_ms();
    if task.scheduled_at_ms > 0 && now > task.scheduled_at_ms + task.schedule_to_close_ms {
        tracing::warn!(
            worker = identity,
            exec = %task.exec,
            node = %task.node_id,
            "schedule_to_close exceeded"
        );
        let timed_out = history
            .record_activity_task_failed(
                &task.exec,
                task.scheduled_event_id,
                lf_core::NodeError::timeout(
                    lf_core::error_code::SCHEDULE_TO_CLOSE,
                    format!("node '{}' exceeded schedule_to_close", task.node_id),
                ),
                vec![],
            )
            .await;
        match timed_out {
            Ok(_) => {
                let _ = matching.complete_task(&delivered.token);
            }
            Err(e) => {
                tracing::warn!(worker = identity, error = %e, "timeout report failed");
                let _ = matching.fail_task(&delivered.token, Some(e.to_string()), None);
            }
        }
        return;
    }

    let live = match history
        .record_activity_task_started(&task.exec, task.scheduled_event_id, task.attempt, identity)
        .await
    {
        Ok(live) => live,
        Err(e) => {
            tracing::warn!(worker = identity, exec = %task.exec, error = %e, "activity start failed");
            let _ = matching.fail_task(
                &delivered.token,
                Some(e.to_string()),
                Some(Duration::from_millis(500)),
            );
            return;
        }
    };
    if !live {
        // Execution is already terminal; drop the task.
        let _ = matching.complete_task(&delivered.token);
        return;
    }

    let outcome = runner.run(&task, shutdown, identity).await;
    tracing::info!(
        worker = identity,
        exec = %task.exec,
        node = %task.node_id,
        "activity {}",
        outcome.summary()
    );

    // Report to history first: if the worker dies before the matching ack,
    // the redelivered task dedups against the recorded outcome.
    let recorded = match outcome {
        ActivityOutcome::Completed { output, metadata, attempts, fixtures } => {
            history
                .record_activity_task_completed(
                    &task.exec,
                    task.scheduled_event_id,
                    output,
                    metadata,
                    attempts,
                    fixtures,
                )
                .await
        }
        ActivityOutcome::Failed { error, attempts } => {
            history
                .record_activity_task_failed(&task.exec, task.scheduled_event_id, error, attempts)
                .await
        }
    };

    match recorded {
        Ok(_) => {
            let _ = matching.complete_task(&delivered.token);
        }
        Err(e) => {
            tracing::warn!(worker = identity, exec = %task.exec, error = %e, "activity report failed");
            let _ = matching.fail_task(
                &delivered.token,
                Some(e.to_string()),
                Some(Duration::from_millis(500)),
            );
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
