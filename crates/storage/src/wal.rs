// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only write-ahead log, one JSON record per line.

use crate::error::StoreError;
use lf_core::{ExecutionId, ExecutionState, HistoryEvent};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// IO retry schedule for transient filesystem errors.
const IO_RETRIES: [Duration; 3] =
    [Duration::from_millis(5), Duration::from_millis(25), Duration::from_millis(125)];

pub(crate) fn with_io_retry<T>(
    mut op: impl FnMut() -> std::io::Result<T>,
) -> Result<T, StoreError> {
    for delay in IO_RETRIES {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) => {
                tracing::warn!(error = %e, "storage io failed, retrying");
                std::thread::sleep(delay);
            }
        }
    }
    op().map_err(StoreError::Io)
}

/// One durable record. Replayed in order on recovery: `State` overwrites
/// the execution's snapshot, `Append` extends its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum WalRecord {
    Append { exec: ExecutionId, events: Vec<HistoryEvent> },
    State { state: ExecutionState },
}

/// Appender with per-batch flush. Batches within one shard transaction are
/// written back-to-back before the flush so event append and state update
/// land atomically with respect to recovery.
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl WalWriter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            with_io_retry(|| std::fs::create_dir_all(parent))?;
        }
        let file =
            with_io_retry(|| OpenOptions::new().create(true).append(true).open(&path))?;
        Ok(Self { path, writer: BufWriter::new(file) })
    }

    /// Append a batch of records and flush once.
    pub fn append(&mut self, records: &[WalRecord]) -> Result<(), StoreError> {
        for record in records {
            let line = serde_json::to_string(record)?;
            with_io_retry(|| {
                self.writer.write_all(line.as_bytes())?;
                self.writer.write_all(b"\n")
            })?;
        }
        with_io_retry(|| self.writer.flush())?;
        with_io_retry(|| self.writer.get_ref().sync_data())?;
        Ok(())
    }

    /// Truncate after a snapshot has captured everything so far.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        let file = with_io_retry(|| {
            OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)
        })?;
        self.writer = BufWriter::new(file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sequential reader for recovery. Tolerates a torn final line (crash mid
/// write): the partial record is dropped with a warning.
pub struct WalReader;

impl WalReader {
    pub fn replay(path: &Path) -> Result<Vec<WalRecord>, StoreError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = with_io_retry(|| File::open(path))?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = lineno + 1,
                        error = %e,
                        "dropping torn wal record"
                    );
                    break;
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
