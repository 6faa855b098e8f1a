// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shard snapshots: zstd-compressed JSON image of a shard, written on
//! checkpoint so WAL replay stays bounded.

use crate::error::StoreError;
use crate::shard::ShardStore;
use crate::wal::with_io_retry;
use lf_core::{ExecutionState, HistoryEvent};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SnapshotEntry {
    pub state: ExecutionState,
    pub events: Vec<HistoryEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ShardSnapshot {
    pub shard_id: u32,
    pub executions: Vec<SnapshotEntry>,
}

impl ShardSnapshot {
    pub(crate) fn write(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;
        // Write-then-rename so a crash never leaves a torn snapshot.
        let tmp = path.with_extension("tmp");
        with_io_retry(|| std::fs::write(&tmp, &compressed))?;
        with_io_retry(|| std::fs::rename(&tmp, path))?;
        Ok(())
    }

    pub(crate) fn load(path: &Path) -> Result<Option<Self>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let compressed = with_io_retry(|| std::fs::read(path))?;
        let json = zstd::decode_all(compressed.as_slice())?;
        Ok(Some(serde_json::from_slice(&json)?))
    }
}

/// Decides when a shard is worth snapshotting and performs the
/// snapshot + WAL reset pair.
pub struct Checkpointer {
    dir: PathBuf,
    /// Appends between checkpoints before the next one triggers.
    pub appends_threshold: u64,
}

impl Checkpointer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), appends_threshold: 512 }
    }

    pub fn snapshot_path(&self, shard_id: u32) -> PathBuf {
        self.dir.join(format!("shard-{shard_id:03}.snapshot.zst"))
    }

    pub fn wal_path(&self, shard_id: u32) -> PathBuf {
        self.dir.join(format!("shard-{shard_id:03}.wal"))
    }

    /// Snapshot the shard if it has accumulated enough appends.
    pub fn maybe_checkpoint(&self, store: &mut ShardStore) -> Result<bool, StoreError> {
        if store.appends_since_checkpoint() < self.appends_threshold {
            return Ok(false);
        }
        self.checkpoint(store)?;
        Ok(true)
    }

    /// Unconditional snapshot + WAL reset (also used at shutdown).
    pub fn checkpoint(&self, store: &mut ShardStore) -> Result<(), StoreError> {
        let snapshot = store.to_snapshot();
        let path = self.snapshot_path(snapshot.shard_id);
        snapshot.write(&path)?;
        store.mark_checkpointed()?;
        tracing::info!(shard = store.shard_id(), path = %path.display(), "checkpointed shard");
        Ok(())
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
