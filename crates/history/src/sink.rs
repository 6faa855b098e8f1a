// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress sink: how history reaches the frontend without depending on it.

use async_trait::async_trait;
use lf_core::{ExecutionId, ExecutionState, HistoryEvent};

/// Implemented by the frontend callback bridge; history calls it after the
/// shard lock is released.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// A new event was appended (node transitions, timers, decisions).
    async fn event_appended(&self, exec: &ExecutionId, event: &HistoryEvent);

    /// The execution reached a terminal state. `history` is the complete
    /// event log, for assembling the terminal callback payload.
    async fn execution_finished(
        &self,
        exec: &ExecutionId,
        state: &ExecutionState,
        history: &[HistoryEvent],
    );
}

/// Sink for tests and headless deployments.
pub struct NoopSink;

#[async_trait]
impl ProgressSink for NoopSink {
    async fn event_appended(&self, _exec: &ExecutionId, _event: &HistoryEvent) {}

    async fn execution_finished(
        &self,
        _exec: &ExecutionId,
        _state: &ExecutionState,
        _history: &[HistoryEvent],
    ) {
    }
}
