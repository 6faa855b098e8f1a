// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    first = { 1, 250 },
    second = { 2, 500 },
    third = { 3, 1_000 },
    capped = { 12, 30_000 },
)]
fn backoff_doubles_until_cap(attempt: u32, expected_ms: u64) {
    let policy = RetryPolicy::default();
    assert_eq!(policy.base_delay(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn allows_stops_at_max_attempts() {
    let policy = RetryPolicy { max_attempts: 3, ..Default::default() };
    assert!(policy.allows(1));
    assert!(policy.allows(2));
    assert!(!policy.allows(3));
}

#[test]
fn from_config_reads_retry_object() {
    let policy = RetryPolicy::from_config(&json!({
        "url": "https://example.com",
        "retry": {"max_attempts": 5, "initial_interval_ms": 10}
    }));
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.initial_interval_ms, 10);
    // Unset fields keep defaults
    assert_eq!(policy.max_interval_ms, 30_000);
}

#[test]
fn from_config_defaults_when_absent() {
    let policy = RetryPolicy::from_config(&json!({"url": "https://example.com"}));
    assert_eq!(policy, RetryPolicy::default());
}

#[parameterized(
    retryable = { NodeError::retryable("E", "m"), true },
    non_retryable = { NodeError::non_retryable("E", "m"), false },
    timeout = { NodeError::timeout("E", "m"), false },
)]
fn only_retryable_errors_retry(err: NodeError, retryable: bool) {
    assert_eq!(err.is_retryable(), retryable);
}

#[test]
fn error_kind_serializes_screaming() {
    let json = serde_json::to_string(&ErrorKind::NonRetryable).unwrap();
    assert_eq!(json, "\"NON_RETRYABLE\"");
}
