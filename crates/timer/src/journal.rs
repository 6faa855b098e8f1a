// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer journal: append-only record of schedule/cancel/fired operations.
//!
//! Replay rebuilds the scheduler after a restart. Compaction rewrites the
//! file with only the live entries once dead records pile up.

use crate::scheduler::{Scheduler, TimerKey};
use crate::service::TimerError;
use lf_core::ExecutionId;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalRecord {
    Schedule { key: TimerKey, fire_at_ms: u64 },
    Cancel { exec: ExecutionId, timer_id: String },
    Fired { exec: ExecutionId, timer_id: String },
}

pub struct TimerJournal {
    path: PathBuf,
    writer: BufWriter<File>,
    records_since_compaction: u64,
}

/// Dead records tolerated before the next append triggers compaction.
const COMPACTION_THRESHOLD: u64 = 4_096;

impl TimerJournal {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TimerError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, writer: BufWriter::new(file), records_since_compaction: 0 })
    }

    /// Replay the journal into a fresh scheduler.
    pub fn replay(path: &Path) -> Result<Scheduler, TimerError> {
        let mut scheduler = Scheduler::new();
        if !path.exists() {
            return Ok(scheduler);
        }
        let reader = BufReader::new(File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: JournalRecord = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "dropping torn timer record");
                    break;
                }
            };
            match record {
                JournalRecord::Schedule { key, fire_at_ms } => scheduler.schedule(key, fire_at_ms),
                JournalRecord::Cancel { exec, timer_id } => {
                    scheduler.cancel(&exec, &timer_id);
                }
                JournalRecord::Fired { exec, timer_id } => {
                    scheduler.cancel(&exec, &timer_id);
                }
            }
        }
        Ok(scheduler)
    }

    pub fn append(&mut self, record: &JournalRecord) -> Result<(), TimerError> {
        let line = serde_json::to_string(record)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.records_since_compaction += 1;
        Ok(())
    }

    /// Rewrite the journal with only the scheduler's live entries when
    /// enough dead records have accumulated.
    pub fn maybe_compact(&mut self, scheduler: &Scheduler) -> Result<bool, TimerError> {
        if self.records_since_compaction < COMPACTION_THRESHOLD {
            return Ok(false);
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for (key, fire_at_ms) in scheduler.live_entries() {
                let line =
                    serde_json::to_string(&JournalRecord::Schedule { key, fire_at_ms })?;
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.records_since_compaction = 0;
        tracing::info!(path = %self.path.display(), live = scheduler.len(), "compacted timer journal");
        Ok(true)
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
