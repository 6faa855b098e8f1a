// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connector attempt records: one outbound interaction with an external
//! dependency, with timing and outcome. Fed back to the control plane for
//! reliability metrics and cost accounting.

use serde::{Deserialize, Serialize};

/// Outcome of one connector attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    ClientError,
    ServerError,
    Timeout,
    NetworkError,
    Cancelled,
}

crate::display_as_str! {
    AttemptOutcome {
        Success => "success",
        ClientError => "client_error",
        ServerError => "server_error",
        Timeout => "timeout",
        NetworkError => "network_error",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorAttempt {
    pub node_id: String,
    /// Connector key, e.g. "http" or "slack".
    pub connector: String,
    /// Operation within the connector, e.g. "POST" or "send_message".
    pub operation: String,
    /// 1-based, strictly increasing per node.
    pub attempt_no: u32,
    pub outcome: AttemptOutcome,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConnectorAttempt {
    pub fn new(
        node_id: impl Into<String>,
        connector: impl Into<String>,
        operation: impl Into<String>,
        attempt_no: u32,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            connector: connector.into(),
            operation: operation.into(),
            attempt_no,
            outcome: AttemptOutcome::Success,
            duration_ms: 0,
            status_code: None,
            request_fingerprint: None,
            idempotency_key: None,
            error_code: None,
            error_message: None,
        }
    }

    crate::setters! {
        set outcome: AttemptOutcome;
        set duration_ms: u64;
        opt status_code: u16;
        opt request_fingerprint: String;
        opt idempotency_key: String;
        opt error_code: String;
        opt error_message: String;
    }
}

#[cfg(test)]
#[path = "attempt_tests.rs"]
mod tests;
