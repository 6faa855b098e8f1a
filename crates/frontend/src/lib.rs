// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lf-frontend: ingress and egress for the execution plane.
//!
//! Consumes job envelopes from the control plane's redis stream, starts
//! executions, streams node-level progress back over callbacks and the
//! live pub/sub channel, and serves the HTTP inspection surface.

mod callback;
mod consumer;
mod error;
mod http;
mod stream;

pub use callback::{CallbackBridge, CallbackConfig, NodeOutcome, TerminalCallback};
pub use consumer::{ConsumerConfig, JobConsumer};
pub use error::FrontendError;
pub use http::{router, serve, HttpState};
pub use stream::{FanoutSink, LiveEvent, LiveStream};
