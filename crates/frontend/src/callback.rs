// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback bridge to the control plane.
//!
//! Progress callbacks are best-effort; terminal callbacks are retried with
//! jittered backoff and are idempotent on `(job_id, terminal_status)`.

use crate::error::FrontendError;
use async_trait::async_trait;
use lf_core::{
    ConnectorAttempt, EventAttrs, ExecutionId, ExecutionState, Fixture, HistoryEvent,
};
use lf_history::ProgressSink;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self { request_timeout_ms: 10_000, max_attempts: 4, base_delay_ms: 250, jitter_ms: 100 }
    }
}

/// Interim progress update posted to `progress_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressCallback {
    pub job_id: String,
    pub execution_id: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub percent: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<ConnectorAttempt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixtures: Vec<Fixture>,
    pub timestamp_ms: u64,
}

/// Per-node outcome inside the terminal callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub node_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Final result posted to `callback_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalCallback {
    pub job_id: String,
    pub execution_id: String,
    pub status: String,
    pub nodes: Vec<NodeOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<ConnectorAttempt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixtures: Vec<Fixture>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct JobMeta {
    job_id: String,
    callback_token: String,
    progress_url: Option<String>,
    node_total: usize,
    node_completed: usize,
}

#[derive(Default)]
struct BridgeState {
    jobs: HashMap<ExecutionId, JobMeta>,
    sent_terminal: HashSet<(String, String)>,
}

pub struct CallbackBridge {
    client: reqwest::Client,
    config: CallbackConfig,
    state: Mutex<BridgeState>,
}

impl CallbackBridge {
    pub fn new(config: CallbackConfig) -> Result<Self, FrontendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                FrontendError::Io(std::io::Error::other(format!("http client init: {e}")))
            })?;
        Ok(Self { client, config, state: Mutex::new(BridgeState::default()) })
    }

    /// Fire one progress POST; failures are logged, never retried.
    async fn post_progress(&self, url: &str, token: &str, payload: &ProgressCallback) {
        let result = self
            .client
            .post(url)
            .header("X-Callback-Token", token)
            .json(payload)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(url, status = %response.status(), "progress callback rejected");
            }
            Err(e) => tracing::warn!(url, error = %e, "progress callback failed"),
        }
    }

    /// Terminal POST with jittered backoff up to the attempt cap.
    async fn post_terminal(
        &self,
        url: &str,
        token: &str,
        payload: &TerminalCallback,
    ) -> Result<(), FrontendError> {
        let mut last_error = String::new();
        for attempt in 1..=self.config.max_attempts {
            let result = self
                .client
                .post(url)
                .header("X-Callback-Token", token)
                .json(payload)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => last_error = format!("status {}", response.status()),
                Err(e) => last_error = e.to_string(),
            }
            if attempt < self.config.max_attempts {
                let jitter = rand::thread_rng().gen_range(0..=self.config.jitter_ms);
                let delay = self.config.base_delay_ms * 2u64.saturating_pow(attempt - 1) + jitter;
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
        Err(FrontendError::CallbackExhausted {
            url: url.to_string(),
            attempts: self.config.max_attempts,
            last_error,
        })
    }
}

#[async_trait]
impl ProgressSink for CallbackBridge {
    async fn event_appended(&self, exec: &ExecutionId, event: &HistoryEvent) {
        // Learn the job from its starting event.
        if let EventAttrs::ExecutionStarted { envelope } = &event.attrs {
            self.state.lock().jobs.insert(
                exec.clone(),
                JobMeta {
                    job_id: envelope.job_id.clone(),
                    callback_token: envelope.callback_token.clone(),
                    progress_url: envelope.progress_url.clone(),
                    node_total: envelope.workflow.nodes.len(),
                    node_completed: 0,
                },
            );
            return;
        }

        let (node_id, attempts, fixtures, completes) = match &event.attrs {
            EventAttrs::NodeScheduled { node_id, .. } => {
                (Some(node_id.clone()), vec![], vec![], false)
            }
            EventAttrs::NodeStarted { node_id, .. } => {
                (Some(node_id.clone()), vec![], vec![], false)
            }
            EventAttrs::NodeCompleted { node_id, attempts, fixtures, .. } => {
                (Some(node_id.clone()), attempts.clone(), fixtures.clone(), true)
            }
            EventAttrs::NodeFailed { node_id, attempts, .. }
            | EventAttrs::NodeTimedOut { node_id, attempts, .. } => {
                (Some(node_id.clone()), attempts.clone(), vec![], true)
            }
            EventAttrs::TimerStarted { .. } | EventAttrs::TimerFired { .. } => {
                (None, vec![], vec![], false)
            }
            _ => return,
        };

        let (url, token, payload) = {
            let mut state = self.state.lock();
            let Some(meta) = state.jobs.get_mut(exec) else { return };
            if completes {
                meta.node_completed += 1;
            }
            let Some(url) = meta.progress_url.clone() else { return };
            let percent = if meta.node_total == 0 {
                0
            } else {
                ((meta.node_completed * 100) / meta.node_total).min(100) as u8
            };
            let payload = ProgressCallback {
                job_id: meta.job_id.clone(),
                execution_id: exec.to_string(),
                event: event.attrs.kind().to_string(),
                node_id,
                percent,
                attempts,
                fixtures,
                timestamp_ms: event.event_time_ms,
            };
            (url, meta.callback_token.clone(), payload)
        };

        self.post_progress(&url, &token, &payload).await;
    }

    async fn execution_finished(
        &self,
        exec: &ExecutionId,
        state: &ExecutionState,
        history: &[HistoryEvent],
    ) {
        let Some(payload) = assemble_terminal(exec, state, history) else {
            tracing::warn!(%exec, "terminal callback skipped: no starting envelope");
            return;
        };
        let Some(EventAttrs::ExecutionStarted { envelope }) =
            history.first().map(|e| &e.attrs)
        else {
            return;
        };

        {
            let mut bridge = self.state.lock();
            let dedupe_key = (payload.job_id.clone(), payload.status.clone());
            if !bridge.sent_terminal.insert(dedupe_key) {
                tracing::debug!(%exec, "terminal callback already sent");
                return;
            }
            bridge.jobs.remove(exec);
        }

        if let Err(e) = self
            .post_terminal(&envelope.callback_url, &envelope.callback_token, &payload)
            .await
        {
            tracing::error!(%exec, error = %e, "terminal callback undeliverable");
        }
    }
}

/// Build the terminal payload from the full history.
pub(crate) fn assemble_terminal(
    exec: &ExecutionId,
    state: &ExecutionState,
    history: &[HistoryEvent],
) -> Option<TerminalCallback> {
    let EventAttrs::ExecutionStarted { envelope } = &history.first()?.attrs else {
        return None;
    };

    // scheduled_event_id → node_id as scheduled
    let mut nodes: HashMap<i64, NodeOutcome> = HashMap::new();
    let mut order: Vec<i64> = Vec::new();
    let mut all_attempts: Vec<ConnectorAttempt> = Vec::new();
    let mut all_fixtures: Vec<Fixture> = Vec::new();
    let mut status = state.status.as_str().to_string();
    let mut terminal_error = None;

    for event in history {
        match &event.attrs {
            EventAttrs::NodeScheduled { node_id, .. } => {
                nodes.insert(
                    event.event_id,
                    NodeOutcome {
                        node_id: node_id.clone(),
                        status: "scheduled".to_string(),
                        output: None,
                        error_code: None,
                        error_message: None,
                    },
                );
                order.push(event.event_id);
            }
            EventAttrs::NodeCompleted { scheduled_event_id, output, attempts, fixtures, .. } => {
                if let Some(outcome) = nodes.get_mut(scheduled_event_id) {
                    outcome.status = "completed".to_string();
                    outcome.output = Some(output.clone());
                }
                all_attempts.extend(attempts.clone());
                all_fixtures.extend(fixtures.clone());
            }
            EventAttrs::NodeFailed { scheduled_event_id, error, attempts, .. } => {
                if let Some(outcome) = nodes.get_mut(scheduled_event_id) {
                    outcome.status = "failed".to_string();
                    outcome.error_code = Some(error.code.clone());
                    outcome.error_message = Some(error.message.clone());
                }
                all_attempts.extend(attempts.clone());
            }
            EventAttrs::NodeTimedOut { scheduled_event_id, message, attempts, .. } => {
                if let Some(outcome) = nodes.get_mut(scheduled_event_id) {
                    outcome.status = "timed_out".to_string();
                    outcome.error_message = Some(message.clone());
                }
                all_attempts.extend(attempts.clone());
            }
            EventAttrs::WorkflowCompleted { status: completion } => {
                status = completion.as_str().to_string();
            }
            EventAttrs::WorkflowFailed { message } => {
                status = "failed".to_string();
                terminal_error = Some(message.clone());
            }
            EventAttrs::WorkflowCancelled { reason } => {
                status = "cancelled".to_string();
                terminal_error = reason.clone();
            }
            _ => {}
        }
    }

    Some(TerminalCallback {
        job_id: envelope.job_id.clone(),
        execution_id: exec.to_string(),
        status,
        nodes: order.into_iter().filter_map(|id| nodes.remove(&id)).collect(),
        attempts: all_attempts,
        fixtures: all_fixtures,
        duration_ms: state.duration_ms(),
        error: terminal_error,
    })
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
