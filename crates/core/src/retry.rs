// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node retry policy and the executor error taxonomy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Well-known error codes carried in [`NodeError::code`].
pub mod error_code {
    pub const MISSING_REPLAY_FIXTURE: &str = "MISSING_REPLAY_FIXTURE";
    pub const CANCELLED: &str = "CANCELLED";
    pub const SSRF_BLOCKED: &str = "SSRF_BLOCKED";
    pub const START_TO_CLOSE: &str = "START_TO_CLOSE_TIMEOUT";
    pub const SCHEDULE_TO_CLOSE: &str = "SCHEDULE_TO_CLOSE_TIMEOUT";
}

/// How an executor failure should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Retryable,
    NonRetryable,
    Timeout,
}

crate::display_as_str! {
    ErrorKind {
        Retryable => "RETRYABLE",
        NonRetryable => "NON_RETRYABLE",
        Timeout => "TIMEOUT",
    }
}

/// Terminal error of one node execution, carried inside events and
/// executor responses (never as a transport-level failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl NodeError {
    pub fn retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Retryable, code: code.into(), message: message.into() }
    }

    pub fn non_retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::NonRetryable, code: code.into(), message: message.into() }
    }

    pub fn timeout(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Timeout, code: code.into(), message: message.into() }
    }

    pub fn cancelled() -> Self {
        Self::non_retryable(error_code::CANCELLED, "execution cancelled")
    }

    /// Only `Retryable` failures get another attempt; `Timeout` already
    /// consumed the node's time budget.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Retryable
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.kind, self.code, self.message)
    }
}

/// Exponential backoff with a cap and bounded jitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "defaults::initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "defaults::backoff_coefficient")]
    pub backoff_coefficient: f64,
    #[serde(default = "defaults::max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "defaults::jitter_ms")]
    pub jitter_ms: u64,
}

mod defaults {
    pub fn initial_interval_ms() -> u64 {
        250
    }
    pub fn backoff_coefficient() -> f64 {
        2.0
    }
    pub fn max_interval_ms() -> u64 {
        30_000
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn jitter_ms() -> u64 {
        100
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: defaults::initial_interval_ms(),
            backoff_coefficient: defaults::backoff_coefficient(),
            max_interval_ms: defaults::max_interval_ms(),
            max_attempts: defaults::max_attempts(),
            jitter_ms: defaults::jitter_ms(),
        }
    }
}

impl RetryPolicy {
    /// Read a policy from a node's `config.retry` object; absent fields
    /// fall back to the defaults above.
    pub fn from_config(config: &serde_json::Value) -> Self {
        config
            .get("retry")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Base delay before the attempt after `attempt` (1-based), without
    /// jitter. The caller adds jitter in `[0, jitter_ms]` from its own
    /// randomness source so this stays a pure function.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let scaled = self.initial_interval_ms as f64 * self.backoff_coefficient.powi(exp as i32);
        let capped = scaled.min(self.max_interval_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
