// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::DeterministicContext;
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor() -> HttpExecutor {
    HttpExecutor::new(HttpConfig::default().ssrf(SsrfPolicy { allow_private: true }))
        .unwrap()
}

fn request(url: &str) -> ExecRequest {
    ExecRequest {
        node_id: "h1".into(),
        node_type: "http_request".into(),
        config: json!({"url": url, "method": "GET"}),
        input: Value::Null,
        attempt: 1,
        deterministic: DeterministicContext::default(),
    }
}

#[tokio::test]
async fn success_returns_json_output_with_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let response = executor().execute(&ExecContext::test(), request(&server.uri())).await;

    assert!(response.is_success());
    assert_eq!(response.output, json!({"ok": true}));
    assert_eq!(response.attempts.len(), 1);
    let attempt = &response.attempts[0];
    assert_eq!(attempt.outcome, AttemptOutcome::Success);
    assert_eq!(attempt.status_code, Some(200));
    assert_eq!(attempt.attempt_no, 1);
    assert!(attempt.idempotency_key.is_some());
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = executor().execute(&ExecContext::test(), request(&server.uri())).await;

    let error = response.error.unwrap();
    assert!(error.is_retryable());
    assert_eq!(error.code, "HTTP_503");
    assert_eq!(response.attempts[0].outcome, AttemptOutcome::ServerError);
}

#[tokio::test]
async fn client_error_is_non_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let response = executor().execute(&ExecContext::test(), request(&server.uri())).await;

    let error = response.error.unwrap();
    assert_eq!(error.kind, lf_core::ErrorKind::NonRetryable);
    assert_eq!(error.code, "HTTP_404");
    assert_eq!(response.attempts[0].outcome, AttemptOutcome::ClientError);
}

#[tokio::test]
async fn capture_mode_emits_fixture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": 7})))
        .mount(&server)
        .await;

    let mut req = request(&server.uri());
    req.deterministic.mode = DeterministicMode::Capture;
    let response = executor().execute(&ExecContext::test(), req).await;

    assert_eq!(response.fixtures.len(), 1);
    let fixture = &response.fixtures[0];
    assert_eq!(fixture.response, json!({"n": 7}));
    assert_eq!(fixture.node_id, "h1");
    assert_eq!(
        Some(fixture.request_fingerprint.as_str()),
        response.attempts[0].request_fingerprint.as_deref()
    );
}

#[tokio::test]
async fn replay_hit_answers_from_fixture_without_network() {
    // No server at all: a hit must not touch the network
    let mut req = request("http://fixtures.invalid/");
    let request_value = json!({
        "method": "GET",
        "url": "http://fixtures.invalid/",
        "headers": Value::Null,
        "body": Value::Null,
    });
    let fixture = lf_core::Fixture::capture("h1", request_value, json!({"ok": true}));
    req.deterministic.mode = DeterministicMode::Replay;
    req.deterministic.fixtures = vec![fixture];

    let response = executor().execute(&ExecContext::test(), req).await;
    assert!(response.is_success());
    assert_eq!(response.output, json!({"ok": true}));
    assert!(response.attempts.is_empty());
}

#[tokio::test]
async fn replay_miss_fails_non_retryable() {
    let mut req = request("http://fixtures.invalid/");
    req.deterministic.mode = DeterministicMode::Replay;

    let response = executor().execute(&ExecContext::test(), req).await;
    let error = response.error.unwrap();
    assert_eq!(error.code, error_code::MISSING_REPLAY_FIXTURE);
    assert_eq!(error.kind, lf_core::ErrorKind::NonRetryable);
}

#[tokio::test]
async fn ssrf_blocks_loopback_with_zero_bytes_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    // Default policy: loopback is blocked
    let strict = HttpExecutor::new(HttpConfig::default()).unwrap();
    let response = strict.execute(&ExecContext::test(), request(&server.uri())).await;

    let error = response.error.unwrap();
    assert_eq!(error.code, error_code::SSRF_BLOCKED);
    assert_eq!(error.kind, lf_core::ErrorKind::NonRetryable);
    assert_eq!(response.attempts[0].outcome, AttemptOutcome::NetworkError);

    // Nothing reached the server
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn missing_url_is_config_error() {
    let executor = executor();
    let mut req = request("http://unused.invalid/");
    req.config = json!({});
    let response = executor.execute(&ExecContext::test(), req).await;
    assert_eq!(response.error.unwrap().code, "INVALID_CONFIG");
}
