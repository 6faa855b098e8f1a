// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lf-matching: partitioned task queues for decision and activity tasks.
//!
//! At-least-once delivery: a polled task turns invisible until it is acked,
//! nacked, or its visibility timeout lapses and the reclaim sweep re-delivers
//! it. FIFO within a partition, no ordering across partitions.

mod error;
mod service;
mod token;

pub use error::MatchingError;
pub use service::{DeadTask, DeliveredTask, MatchingConfig, MatchingService, QueueKey};
pub use token::{TaskToken, TokenPayload, TokenSigner};
