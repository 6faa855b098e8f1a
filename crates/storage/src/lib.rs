// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lf-storage: sharded event & state store.
//!
//! Each shard owns the event history and mutable state for its executions.
//! Durability is an append-only JSONL WAL per shard plus a zstd snapshot
//! written on checkpoint; recovery is snapshot load + WAL replay.

mod error;
mod manager;
mod shard;
mod snapshot;
mod visibility;
mod wal;

pub use error::StoreError;
pub use manager::ShardManager;
pub use shard::{AppendOutcome, ShardStore};
pub use snapshot::Checkpointer;
pub use visibility::VisibilityRow;
pub use wal::{WalReader, WalRecord, WalWriter};
