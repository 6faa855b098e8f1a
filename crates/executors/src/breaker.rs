// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit breaker per external dependency.
//!
//! Closed → Open when the rolling failure count reaches the threshold
//! within the window; Open → HalfOpen after `open_timeout_ms`; HalfOpen
//! closes after `success_threshold` successes and re-opens on any failure.

use lf_core::Clock;
use parking_lot::Mutex;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub window_ms: u64,
    pub open_timeout_ms: u64,
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window_ms: 60_000,
            open_timeout_ms: 30_000,
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

lf_core::display_as_str! {
    BreakerState {
        Closed => "closed",
        Open => "open",
        HalfOpen => "half_open",
    }
}

struct Inner {
    state: BreakerState,
    /// Failure timestamps inside the rolling window.
    failures: VecDeque<u64>,
    opened_at_ms: u64,
    half_open_successes: u32,
}

pub struct CircuitBreaker<C: Clock> {
    name: String,
    config: BreakerConfig,
    clock: C,
    inner: Mutex<Inner>,
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn new(name: impl Into<String>, config: BreakerConfig, clock: C) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failures: VecDeque::new(),
                opened_at_ms: 0,
                half_open_successes: 0,
            }),
        }
    }

    /// Whether a request may proceed. Transitions Open → HalfOpen once the
    /// open timeout has passed.
    pub fn allow(&self) -> bool {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                if now.saturating_sub(inner.opened_at_ms) >= self.config.open_timeout_ms {
                    tracing::info!(breaker = %self.name, "circuit half-open");
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.success_threshold {
                    tracing::info!(breaker = %self.name, "circuit closed");
                    inner.state = BreakerState::Closed;
                    inner.failures.clear();
                }
            }
            BreakerState::Closed => {}
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                tracing::warn!(breaker = %self.name, "probe failed, circuit re-opened");
                inner.state = BreakerState::Open;
                inner.opened_at_ms = now;
            }
            BreakerState::Closed => {
                inner.failures.push_back(now);
                let horizon = now.saturating_sub(self.config.window_ms);
                while inner.failures.front().is_some_and(|t| *t < horizon) {
                    inner.failures.pop_front();
                }
                if inner.failures.len() as u32 >= self.config.failure_threshold {
                    tracing::warn!(breaker = %self.name, "failure threshold reached, circuit open");
                    inner.state = BreakerState::Open;
                    inner.opened_at_ms = now;
                    inner.failures.clear();
                }
            }
            BreakerState::Open => {}
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
