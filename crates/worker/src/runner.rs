// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs one activity task through the executor registry with the
//! per-node retry policy.

use lf_core::{
    error_code, short, ActivityTask, ConnectorAttempt, ErrorKind, ExecMetadata, Fixture,
    NodeError,
};
use lf_executors::{ExecContext, ExecRequest, ExecResponse, ExecutorRegistry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Final outcome of one activity task: one of these per `NodeScheduled`.
#[derive(Debug)]
pub enum ActivityOutcome {
    Completed {
        output: serde_json::Value,
        metadata: ExecMetadata,
        attempts: Vec<ConnectorAttempt>,
        fixtures: Vec<Fixture>,
    },
    Failed {
        error: NodeError,
        attempts: Vec<ConnectorAttempt>,
    },
}

/// Two-phase init: the runner is constructed without a registry and gets
/// it injected exactly once before the pool starts.
pub struct ActivityRunner {
    registry: OnceLock<Arc<ExecutorRegistry>>,
}

impl Default for ActivityRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityRunner {
    pub fn new() -> Self {
        Self { registry: OnceLock::new() }
    }

    /// Inject the executor registry. Returns `false` if one was already
    /// installed (the second call is ignored).
    pub fn set_registry(&self, registry: Arc<ExecutorRegistry>) -> bool {
        self.registry.set(registry).is_ok()
    }

    /// Drive one task to its terminal outcome: attempt loop with
    /// exponential backoff and seeded jitter, under the task's
    /// start-to-close deadline and the worker's cancellation context.
    pub async fn run(
        &self,
        task: &ActivityTask,
        cancel: &CancellationToken,
        identity: &str,
    ) -> ActivityOutcome {
        let Some(registry) = self.registry.get() else {
            return ActivityOutcome::Failed {
                error: NodeError::retryable(
                    "WORKER_UNINITIALIZED",
                    "executor registry not installed",
                ),
                attempts: vec![],
            };
        };
        let Some(executor) = registry.get(&task.node_type) else {
            return ActivityOutcome::Failed {
                error: NodeError::non_retryable(
                    "UNKNOWN_NODE_TYPE",
                    format!("no executor registered for '{}'", task.node_type),
                ),
                attempts: vec![],
            };
        };

        let deadline = Instant::now() + Duration::from_millis(task.start_to_close_ms);
        let ctx = ExecContext::new(cancel.clone(), identity);
        let mut rng = StdRng::seed_from_u64(task.deterministic.seed ^ u64::from(task.attempt));
        let mut attempts: Vec<ConnectorAttempt> = Vec::new();
        let mut attempt = task.attempt;

        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()).filter(|d| !d.is_zero()) else {
                return ActivityOutcome::Failed {
                    error: NodeError::timeout(
                        error_code::START_TO_CLOSE,
                        format!("node '{}' exceeded start_to_close", task.node_id),
                    ),
                    attempts,
                };
            };

            let request = ExecRequest {
                node_id: task.node_id.clone(),
                node_type: task.node_type.clone(),
                config: task.config.clone(),
                input: task.input.clone(),
                attempt,
                deterministic: task.deterministic.clone(),
            };

            tracing::debug!(
                node = %task.node_id,
                node_type = %task.node_type,
                attempt,
                "executing node"
            );
            let response: Option<ExecResponse> =
                match tokio::time::timeout(remaining, executor.execute(&ctx, request)).await {
                    Ok(response) => Some(response),
                    Err(_) => None,
                };

            let Some(response) = response else {
                return ActivityOutcome::Failed {
                    error: NodeError::timeout(
                        error_code::START_TO_CLOSE,
                        format!("node '{}' exceeded start_to_close", task.node_id),
                    ),
                    attempts,
                };
            };

            attempts.extend(response.attempts.clone());
            for line in &response.logs {
                tracing::debug!(node = %task.node_id, "{line}");
            }

            match response.error {
                None => {
                    return ActivityOutcome::Completed {
                        output: response.output,
                        metadata: response.metadata,
                        attempts,
                        fixtures: response.fixtures,
                    };
                }
                Some(error) => {
                    let retry =
                        error.kind == ErrorKind::Retryable && task.retry.allows(attempt);
                    tracing::debug!(
                        node = %task.node_id,
                        attempt,
                        error = %error,
                        retry,
                        "node attempt failed"
                    );
                    if !retry {
                        return ActivityOutcome::Failed { error, attempts };
                    }

                    let jitter = rng.gen_range(0..=task.retry.jitter_ms);
                    let delay = task.retry.base_delay(attempt) + Duration::from_millis(jitter);
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            return ActivityOutcome::Failed {
                                error: NodeError::cancelled(),
                                attempts,
                            };
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl ActivityOutcome {
    /// Log tail for the worker loop.
    pub fn summary(&self) -> String {
        match self {
            ActivityOutcome::Completed { attempts, .. } => {
                format!("completed attempts={}", attempts.len())
            }
            ActivityOutcome::Failed { error, attempts } => {
                format!("failed error={} attempts={}", short(&error.code, 40), attempts.len())
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
