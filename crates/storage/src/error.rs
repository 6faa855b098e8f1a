// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency failure: the caller's view of the history is
    /// stale. Decision rounds restart on this.
    #[error("append conflict: expected last_event_id {expected}, found {actual}")]
    Conflict { expected: i64, actual: i64 },

    /// The execution reached a terminal event; nothing may be appended.
    #[error("execution is closed: {0}")]
    ExecutionClosed(String),

    #[error("execution already exists: {0}")]
    AlreadyExists(String),

    #[error("execution not found: {0}")]
    NotFound(String),

    /// Local retries exhausted; retryable at the caller.
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    /// System errors worth retrying from the history service; conflicts
    /// restart the decision round instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}
