// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lf_core::EnvelopeError;
use lf_matching::MatchingError;
use lf_storage::StoreError;
use lf_timer::TimerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid envelope: {0}")]
    Validation(#[from] EnvelopeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error(transparent)]
    Timer(#[from] TimerError),

    /// A decider acked a decision task that is no longer in flight
    /// (superseded after a failure or a reclaim). The result is dropped.
    #[error("stale decision task for {0}")]
    StaleDecisionTask(String),

    #[error("execution not found: {0}")]
    NotFound(String),

    /// The decider referenced a node id missing from the graph.
    #[error("unknown node in command: {0}")]
    UnknownNode(String),
}
