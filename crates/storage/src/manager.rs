// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shard routing and recovery.

use crate::error::StoreError;
use crate::shard::ShardStore;
use crate::snapshot::{Checkpointer, ShardSnapshot};
use crate::visibility::VisibilityRow;
use crate::wal::{WalReader, WalWriter};
use lf_core::{shard_for, ExecutionId, ExecutionStatus};
use parking_lot::Mutex;
use std::path::Path;

/// Owns all shards of this process. Each shard is single-writer behind its
/// own mutex; callers hold the lock for a whole read-decide-append round.
pub struct ShardManager {
    shards: Vec<Mutex<ShardStore>>,
    checkpointer: Checkpointer,
}

impl ShardManager {
    /// Open (and recover) `shard_count` shards under `dir`.
    ///
    /// Recovery per shard: load the snapshot if present, then replay the
    /// WAL tail on top of it.
    pub fn open(dir: &Path, shard_count: u32) -> Result<Self, StoreError> {
        let checkpointer = Checkpointer::new(dir);
        let mut shards = Vec::with_capacity(shard_count as usize);
        for shard_id in 0..shard_count {
            let wal_path = checkpointer.wal_path(shard_id);
            let records = WalReader::replay(&wal_path)?;
            let wal = WalWriter::open(&wal_path)?;
            let mut store = ShardStore::new(shard_id, wal);
            if let Some(snapshot) = ShardSnapshot::load(&checkpointer.snapshot_path(shard_id))? {
                store.apply_snapshot(snapshot);
            }
            let replayed = records.len();
            for record in records {
                store.apply_record(record);
            }
            if replayed > 0 {
                tracing::info!(shard = shard_id, records = replayed, "replayed wal tail");
            }
            shards.push(Mutex::new(store));
        }
        Ok(Self { shards, checkpointer })
    }

    pub fn shard_count(&self) -> u32 {
        self.shards.len() as u32
    }

    /// Run `f` holding the shard lock for this execution. The lock spans
    /// the whole closure so a read-then-append round is race-free against
    /// other writers of the same shard.
    pub fn with_shard<T>(
        &self,
        exec: &ExecutionId,
        f: impl FnOnce(&mut ShardStore) -> T,
    ) -> T {
        let shard_id = shard_for(&exec.workflow_id, self.shard_count());
        let mut guard = self.shards[shard_id as usize].lock();
        f(&mut guard)
    }

    /// Checkpoint any shard past its append threshold.
    pub fn checkpoint_due(&self) -> Result<(), StoreError> {
        for shard in &self.shards {
            let mut guard = shard.lock();
            self.checkpointer.maybe_checkpoint(&mut guard)?;
        }
        Ok(())
    }

    /// Snapshot everything (shutdown path).
    pub fn checkpoint_all(&self) -> Result<(), StoreError> {
        for shard in &self.shards {
            let mut guard = shard.lock();
            self.checkpointer.checkpoint(&mut guard)?;
        }
        Ok(())
    }

    /// Executions that have not reached a terminal state, across all
    /// namespaces. Used by startup reconciliation.
    pub fn non_terminal(&self) -> Vec<ExecutionId> {
        self.shards
            .iter()
            .flat_map(|shard| {
                let guard = shard.lock();
                guard
                    .states()
                    .filter(|s| !s.is_terminal())
                    .map(|s| s.exec.clone())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Visibility scan across shards, newest first.
    pub fn list(
        &self,
        namespace: &str,
        status: Option<ExecutionStatus>,
    ) -> Vec<VisibilityRow> {
        let mut rows: Vec<VisibilityRow> = self
            .shards
            .iter()
            .flat_map(|shard| {
                let guard = shard.lock();
                guard
                    .states()
                    .filter(|s| s.exec.namespace == namespace)
                    .filter(|s| status.is_none_or(|want| s.status == want))
                    .map(VisibilityRow::from_state)
                    .collect::<Vec<_>>()
            })
            .collect();
        rows.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        rows
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
