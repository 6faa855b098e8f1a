// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delay executor.
//!
//! Short delays sleep inline under the attempt's cancellation context.
//! Anything past the inline threshold must not hold a worker slot: the
//! executor returns immediately with `timer_requested` and a resume time,
//! which the decider turns into a durable timer.

use crate::executor::{ExecContext, ExecRequest, ExecResponse, NodeExecutor};
use async_trait::async_trait;
use lf_core::{Clock, ExecMetadata, NodeError};
use serde_json::json;
use std::time::Duration;

/// Longest delay an executor will block a worker for.
pub const INLINE_DELAY_CAP_MS: u64 = 30_000;

pub struct DelayExecutor<C: Clock> {
    clock: C,
    inline_cap_ms: u64,
}

impl<C: Clock> DelayExecutor<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, inline_cap_ms: INLINE_DELAY_CAP_MS }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn with_inline_cap_ms(mut self, cap_ms: u64) -> Self {
        self.inline_cap_ms = cap_ms;
        self
    }
}

#[async_trait]
impl<C: Clock + 'static> NodeExecutor for DelayExecutor<C> {
    fn node_type(&self) -> &'static str {
        "delay"
    }

    async fn execute(&self, ctx: &ExecContext, req: ExecRequest) -> ExecResponse {
        let Some(duration_ms) = req.config.get("duration_ms").and_then(|v| v.as_u64()) else {
            return ExecResponse::failed(NodeError::non_retryable(
                "INVALID_CONFIG",
                "delay requires config.duration_ms",
            ));
        };

        if duration_ms > self.inline_cap_ms {
            let resume_at_ms = self.clock.epoch_ms() + duration_ms;
            let mut response = ExecResponse::ok(serde_json::Value::Null);
            response.metadata =
                ExecMetadata { timer_requested: true, resume_at_ms: Some(resume_at_ms) };
            response.logs.push(format!("requested durable timer for {duration_ms}ms"));
            return response;
        }

        tokio::select! {
            _ = ctx.cancel.cancelled() => ExecResponse::failed(NodeError::cancelled()),
            _ = tokio::time::sleep(Duration::from_millis(duration_ms)) => {
                ExecResponse::ok(json!({ "waited_ms": duration_ms }))
            }
        }
    }
}

#[cfg(test)]
#[path = "delay_tests.rs"]
mod tests;
