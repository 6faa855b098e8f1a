// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP request executor.
//!
//! One `execute` call performs one attempt; the activity worker drives
//! retries. Every attempt emits a connector-attempt record, and in capture
//! mode a deterministic fixture keyed by the canonical request fingerprint.

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::bulkhead::Bulkhead;
use crate::executor::{ExecContext, ExecRequest, ExecResponse, NodeExecutor};
use crate::registry::RegistryError;
use crate::ssrf::SsrfPolicy;
use async_trait::async_trait;
use lf_core::{
    canonical_fingerprint, error_code, short, AttemptOutcome, ConnectorAttempt,
    DeterministicMode, Fixture, NodeError, SystemClock,
};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Outbound connection pool cap, per host.
    pub pool_max_per_host: usize,
    /// Bulkhead slots per host.
    pub bulkhead_slots: usize,
    pub bulkhead_acquire_timeout_ms: u64,
    pub breaker: BreakerConfig,
    pub ssrf: SsrfPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            pool_max_per_host: 8,
            bulkhead_slots: 16,
            bulkhead_acquire_timeout_ms: 1_000,
            breaker: BreakerConfig::default(),
            ssrf: SsrfPolicy::default(),
        }
    }
}

impl HttpConfig {
    lf_core::setters! {
        set request_timeout_ms: u64;
        set connect_timeout_ms: u64;
        set pool_max_per_host: usize;
        set bulkhead_slots: usize;
        set ssrf: SsrfPolicy;
    }
}

pub struct HttpExecutor {
    client: reqwest::Client,
    config: HttpConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker<SystemClock>>>>,
    bulkheads: Mutex<HashMap<String, Arc<Bulkhead>>>,
}

impl HttpExecutor {
    pub fn new(config: HttpConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_max_idle_per_host(config.pool_max_per_host)
            .build()
            .map_err(|e| RegistryError::HttpInit(e.to_string()))?;
        Ok(Self {
            client,
            config,
            breakers: Mutex::new(HashMap::new()),
            bulkheads: Mutex::new(HashMap::new()),
        })
    }

    fn breaker_for(&self, host: &str) -> Arc<CircuitBreaker<SystemClock>> {
        self.breakers
            .lock()
            .entry(host.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(host, self.config.breaker.clone(), SystemClock))
            })
            .clone()
    }

    fn bulkhead_for(&self, host: &str) -> Arc<Bulkhead> {
        self.bulkheads
            .lock()
            .entry(host.to_string())
            .or_insert_with(|| {
                Arc::new(Bulkhead::new(
                    host,
                    self.config.bulkhead_slots,
                    Duration::from_millis(self.config.bulkhead_acquire_timeout_ms),
                ))
            })
            .clone()
    }
}

#[async_trait]
impl NodeExecutor for HttpExecutor {
    fn node_type(&self) -> &'static str {
        "http_request"
    }

    async fn execute(&self, ctx: &ExecContext, req: ExecRequest) -> ExecResponse {
        let Some(url_str) = req.config.get("url").and_then(|v| v.as_str()) else {
            return ExecResponse::failed(NodeError::non_retryable(
                "INVALID_CONFIG",
                "http_request requires config.url",
            ));
        };
        let method_str = req
            .config
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let headers = req.config.get("headers").cloned().unwrap_or(serde_json::Value::Null);
        let body = match req.config.get("body") {
            Some(b) => b.clone(),
            // forward_input lets a node POST its upstream output directly
            None if req.config.get("forward_input").and_then(|v| v.as_bool()).unwrap_or(false) => {
                req.input.clone()
            }
            None => serde_json::Value::Null,
        };

        let request_value = json!({
            "method": method_str,
            "url": url_str,
            "headers": headers,
            "body": body,
        });
        let fingerprint = canonical_fingerprint(&request_value);
        let idempotency_key =
            format!("{}-{}-{}", req.node_id, short(&fingerprint, 16), req.attempt);

        // Replay answers from fixtures before any side effect.
        if req.deterministic.mode == DeterministicMode::Replay {
            return match req.deterministic.fixture_for(&fingerprint) {
                Some(fixture) => {
                    let mut response = ExecResponse::ok(fixture.response.clone());
                    response.logs.push(format!("replayed fixture {}", short(&fingerprint, 16)));
                    response
                }
                None => ExecResponse::failed(NodeError::non_retryable(
                    error_code::MISSING_REPLAY_FIXTURE,
                    format!("no fixture for request fingerprint {}", short(&fingerprint, 16)),
                )),
            };
        }

        let Ok(method) = reqwest::Method::from_bytes(method_str.as_bytes()) else {
            return ExecResponse::failed(NodeError::non_retryable(
                "INVALID_CONFIG",
                format!("invalid http method: {method_str}"),
            ));
        };
        let url = match reqwest::Url::parse(url_str) {
            Ok(url) => url,
            Err(e) => {
                return ExecResponse::failed(NodeError::non_retryable(
                    "INVALID_URL",
                    format!("{url_str}: {e}"),
                ));
            }
        };
        let Some(host) = url.host_str().map(str::to_string) else {
            return ExecResponse::failed(NodeError::non_retryable(
                "INVALID_URL",
                format!("{url_str}: missing host"),
            ));
        };
        let port = url.port_or_known_default().unwrap_or(443);

        let attempt_base = ConnectorAttempt::new(&req.node_id, "http", &method_str, req.attempt)
            .request_fingerprint(fingerprint.clone())
            .idempotency_key(idempotency_key.clone());

        // DNS resolve + address policy before dialing.
        if let Err(e) = self.config.ssrf.resolve_and_check(&host, port).await {
            let attempt = attempt_base
                .clone()
                .outcome(AttemptOutcome::NetworkError)
                .error_code(e.code.clone())
                .error_message(e.message.clone());
            return ExecResponse::failed(e).with_attempt(attempt);
        }

        let breaker = self.breaker_for(&host);
        if !breaker.allow() {
            return ExecResponse::failed(NodeError::retryable(
                "CIRCUIT_OPEN",
                format!("circuit open for {host}"),
            ));
        }
        let bulkhead = self.bulkhead_for(&host);
        let _permit = match bulkhead.acquire().await {
            Ok(permit) => permit,
            Err(e) => return ExecResponse::failed(e),
        };

        let mut header_map = HeaderMap::new();
        if let Some(obj) = headers.as_object() {
            for (name, value) in obj {
                let parsed = HeaderName::from_bytes(name.as_bytes()).ok().zip(
                    value.as_str().and_then(|v| HeaderValue::from_str(v).ok()),
                );
                match parsed {
                    Some((name, value)) => {
                        header_map.insert(name, value);
                    }
                    None => tracing::warn!(node = %req.node_id, header = %name, "skipping invalid header"),
                }
            }
        }

        let mut builder = self
            .client
            .request(method, url)
            .headers(header_map)
            .header("Idempotency-Key", &idempotency_key)
            .timeout(Duration::from_millis(self.config.request_timeout_ms));
        if !body.is_null() {
            builder = builder.json(&body);
        }

        let started = Instant::now();
        let result = tokio::select! {
            _ = ctx.cancel.cancelled() => {
                let attempt = attempt_base
                    .clone()
                    .outcome(AttemptOutcome::Cancelled)
                    .duration_ms(started.elapsed().as_millis() as u64)
                    .error_code(error_code::CANCELLED.to_string());
                return ExecResponse::failed(NodeError::cancelled()).with_attempt(attempt);
            }
            result = builder.send() => result,
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Err(e) if e.is_timeout() => {
                breaker.record_failure();
                let error = NodeError::timeout("HTTP_TIMEOUT", format!("{host}: {e}"));
                let attempt = attempt_base
                    .outcome(AttemptOutcome::Timeout)
                    .duration_ms(duration_ms)
                    .error_code(error.code.clone())
                    .error_message(error.message.clone());
                ExecResponse::failed(error).with_attempt(attempt)
            }
            Err(e) => {
                breaker.record_failure();
                let error = NodeError::retryable("NETWORK_ERROR", format!("{host}: {e}"));
                let attempt = attempt_base
                    .outcome(AttemptOutcome::NetworkError)
                    .duration_ms(duration_ms)
                    .error_code(error.code.clone())
                    .error_message(error.message.clone());
                ExecResponse::failed(error).with_attempt(attempt)
            }
            Ok(response) => {
                let status = response.status();
                let body_text = response.text().await.unwrap_or_default();
                let output: serde_json::Value = serde_json::from_str(&body_text)
                    .unwrap_or_else(|_| json!({ "body": body_text }));

                if status.is_success() {
                    breaker.record_success();
                    let attempt = attempt_base
                        .outcome(AttemptOutcome::Success)
                        .duration_ms(duration_ms)
                        .status_code(status.as_u16());
                    let mut result = ExecResponse::ok(output.clone()).with_attempt(attempt);
                    if req.deterministic.mode == DeterministicMode::Capture {
                        result = result
                            .with_fixture(Fixture::capture(&req.node_id, request_value, output));
                    }
                    result
                } else if status.is_client_error() {
                    // The dependency is healthy; the request is wrong.
                    breaker.record_success();
                    let error = NodeError::non_retryable(
                        format!("HTTP_{}", status.as_u16()),
                        format!("{method_str} {url_str} returned {status}"),
                    );
                    let attempt = attempt_base
                        .outcome(AttemptOutcome::ClientError)
                        .duration_ms(duration_ms)
                        .status_code(status.as_u16())
                        .error_code(error.code.clone());
                    ExecResponse::failed(error).with_attempt(attempt)
                } else {
                    breaker.record_failure();
                    let error = NodeError::retryable(
                        format!("HTTP_{}", status.as_u16()),
                        format!("{method_str} {url_str} returned {status}"),
                    );
                    let attempt = attempt_base
                        .outcome(AttemptOutcome::ServerError)
                        .duration_ms(duration_ms)
                        .status_code(status.as_u16())
                        .error_code(error.code.clone());
                    ExecResponse::failed(error).with_attempt(attempt)
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
