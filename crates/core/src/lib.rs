// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lf-core: Domain model for the LinkFlow execution plane.
//!
//! Pure types shared by every engine service: event history, commands,
//! workflow graphs, tasks, retry policies, and deterministic fixtures.
//! No I/O lives here.

pub mod macros;

pub mod attempt;
pub mod clock;
pub mod command;
pub mod envelope;
pub mod event;
pub mod execution;
pub mod fixture;
pub mod graph;
pub mod id;
pub mod retry;
pub mod shard;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use attempt::{AttemptOutcome, ConnectorAttempt};
pub use clock::{Clock, FakeClock, SystemClock, FAKE_EPOCH_MS};
pub use command::Command;
pub use envelope::{EnvelopeError, JobEnvelope};
pub use event::{EventAttrs, HistoryEvent};
pub use execution::{CompletionStatus, ExecutionId, ExecutionState, ExecutionStatus};
pub use fixture::{canonical_fingerprint, canonical_json, Fixture};
pub use graph::{Edge, GraphError, Node, OnError, WorkflowGraph};
pub use id::{short, RunId, TaskId};
pub use retry::{error_code, ErrorKind, NodeError, RetryPolicy};
pub use shard::shard_for;
pub use task::{
    ActivityTask, DecisionTask, DeterministicContext, DeterministicMode, ExecMetadata, TaskPayload,
};
