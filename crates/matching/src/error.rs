// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchingError {
    /// The target partition queue is full; producers back off.
    #[error("queue {queue} partition {partition} is full")]
    ResourceExhausted { queue: String, partition: u32 },

    /// Token signature did not verify.
    #[error("invalid task token")]
    InvalidToken,
}
