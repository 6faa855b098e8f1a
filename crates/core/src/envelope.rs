// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job envelope: what the control plane puts on the ingress stream.

use crate::graph::{GraphError, WorkflowGraph};
use crate::task::DeterministicContext;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("missing job_id")]
    MissingJobId,
    #[error("missing callback_token")]
    MissingCallbackToken,
    #[error("missing callback_url")]
    MissingCallbackUrl,
    #[error("invalid workflow graph: {0}")]
    InvalidGraph(#[from] GraphError),
}

/// One job from the control plane. The workflow definition travels inside
/// the envelope; the engine never stores definitions separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub job_id: String,
    pub callback_token: String,
    /// Control-plane workflow id; becomes `ExecutionId::workflow_id`.
    pub execution_id: String,
    pub workflow: WorkflowGraph,
    #[serde(default)]
    pub trigger_data: serde_json::Value,
    #[serde(default)]
    pub deterministic: DeterministicContext,
    pub callback_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_url: Option<String>,
    #[serde(default)]
    pub namespace: String,
}

impl JobEnvelope {
    /// Ingress validation: malformed envelopes are rejected before any
    /// execution is started.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.job_id.is_empty() {
            return Err(EnvelopeError::MissingJobId);
        }
        if self.callback_token.is_empty() {
            return Err(EnvelopeError::MissingCallbackToken);
        }
        if self.callback_url.is_empty() {
            return Err(EnvelopeError::MissingCallbackUrl);
        }
        self.workflow.validate()?;
        Ok(())
    }

    /// Namespace with the documented default applied.
    pub fn namespace_or_default(&self) -> &str {
        if self.namespace.is_empty() {
            "default"
        } else {
            &self.namespace
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
