// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The executor contract.

use async_trait::async_trait;
use lf_core::{ConnectorAttempt, DeterministicContext, ExecMetadata, Fixture, NodeError};
use tokio_util::sync::CancellationToken;

/// Ambient context for one attempt: cancellation and worker identity.
#[derive(Clone)]
pub struct ExecContext {
    pub cancel: CancellationToken,
    pub identity: String,
}

impl ExecContext {
    pub fn new(cancel: CancellationToken, identity: impl Into<String>) -> Self {
        Self { cancel, identity: identity.into() }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn test() -> Self {
        Self { cancel: CancellationToken::new(), identity: "test-worker".to_string() }
    }
}

/// One attempt at one node.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub node_id: String,
    pub node_type: String,
    pub config: serde_json::Value,
    pub input: serde_json::Value,
    /// 1-based attempt number, carried into connector attempt records.
    pub attempt: u32,
    pub deterministic: DeterministicContext,
}

/// Everything an attempt produced. `error` is the only failure channel.
#[derive(Debug, Clone, Default)]
pub struct ExecResponse {
    pub output: serde_json::Value,
    pub error: Option<NodeError>,
    pub attempts: Vec<ConnectorAttempt>,
    pub fixtures: Vec<Fixture>,
    pub logs: Vec<String>,
    pub metadata: ExecMetadata,
}

impl ExecResponse {
    pub fn ok(output: serde_json::Value) -> Self {
        Self { output, ..Default::default() }
    }

    pub fn failed(error: NodeError) -> Self {
        Self { error: Some(error), ..Default::default() }
    }

    pub fn with_attempt(mut self, attempt: ConnectorAttempt) -> Self {
        self.attempts.push(attempt);
        self
    }

    pub fn with_fixture(mut self, fixture: Fixture) -> Self {
        self.fixtures.push(fixture);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A node executor. One per node type; aliases share an instance.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    fn node_type(&self) -> &'static str;

    async fn execute(&self, ctx: &ExecContext, req: ExecRequest) -> ExecResponse;
}
