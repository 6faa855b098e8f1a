// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::{DeterministicContext, FakeClock};
use serde_json::Value;

fn request(config: Value) -> ExecRequest {
    ExecRequest {
        node_id: "d1".into(),
        node_type: "delay".into(),
        config,
        input: Value::Null,
        attempt: 1,
        deterministic: DeterministicContext::default(),
    }
}

#[tokio::test]
async fn short_delay_sleeps_inline() {
    let executor = DelayExecutor::new(FakeClock::new());
    let response = executor
        .execute(&ExecContext::test(), request(json!({"duration_ms": 5})))
        .await;
    assert!(response.is_success());
    assert_eq!(response.output, json!({"waited_ms": 5}));
    assert!(!response.metadata.timer_requested);
}

#[tokio::test]
async fn long_delay_requests_timer_immediately() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let executor = DelayExecutor::new(clock);

    // Ten minutes: way past the inline cap
    let response = executor
        .execute(&ExecContext::test(), request(json!({"duration_ms": 600_000})))
        .await;

    assert!(response.is_success());
    assert!(response.metadata.timer_requested);
    assert_eq!(response.metadata.resume_at_ms, Some(1_600_000));
}

#[tokio::test]
async fn inline_cap_is_configurable_for_tests() {
    let executor = DelayExecutor::new(FakeClock::new()).with_inline_cap_ms(1);
    let response = executor
        .execute(&ExecContext::test(), request(json!({"duration_ms": 50})))
        .await;
    assert!(response.metadata.timer_requested);
}

#[tokio::test]
async fn cancellation_interrupts_inline_sleep() {
    let executor = DelayExecutor::new(FakeClock::new());
    let ctx = ExecContext::test();
    ctx.cancel.cancel();

    let response = executor
        .execute(&ctx, request(json!({"duration_ms": 10_000})))
        .await;
    assert_eq!(response.error.unwrap().code, lf_core::error_code::CANCELLED);
}

#[tokio::test]
async fn missing_duration_is_config_error() {
    let executor = DelayExecutor::new(FakeClock::new());
    let response = executor.execute(&ExecContext::test(), request(json!({}))).await;
    assert_eq!(response.error.unwrap().code, "INVALID_CONFIG");
}
