// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One shard: event history plus mutable state for its executions.
//!
//! Single-writer: callers hold the shard lock (see `ShardManager`) for the
//! whole read-decide-append round; readers get cloned snapshots.

use crate::error::StoreError;
use crate::snapshot::{ShardSnapshot, SnapshotEntry};
use crate::wal::{WalRecord, WalWriter};
use lf_core::{EventAttrs, ExecutionId, ExecutionState, HistoryEvent};
use std::collections::HashMap;

struct ExecutionRecord {
    state: ExecutionState,
    events: Vec<HistoryEvent>,
}

/// Result of a successful append.
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub last_event_id: i64,
    /// The newly appended events with their assigned ids. Empty when every
    /// candidate was dropped as an idempotent duplicate.
    pub events: Vec<HistoryEvent>,
}

pub struct ShardStore {
    shard_id: u32,
    executions: HashMap<ExecutionId, ExecutionRecord>,
    wal: WalWriter,
    appends_since_checkpoint: u64,
}

impl ShardStore {
    pub fn new(shard_id: u32, wal: WalWriter) -> Self {
        Self { shard_id, executions: HashMap::new(), wal, appends_since_checkpoint: 0 }
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Create an execution with its first event. The state passed in is the
    /// pre-event snapshot; `patch` runs after the event ids are assigned.
    pub fn create_execution(
        &mut self,
        state: ExecutionState,
        first: EventAttrs,
        now_ms: u64,
        patch: impl FnOnce(&mut ExecutionState),
    ) -> Result<AppendOutcome, StoreError> {
        if self.executions.contains_key(&state.exec) {
            return Err(StoreError::AlreadyExists(state.exec.to_string()));
        }
        let exec = state.exec.clone();
        self.executions.insert(exec.clone(), ExecutionRecord { state, events: Vec::new() });
        let outcome = self.append(&exec, 0, vec![first], now_ms, patch);
        if outcome.is_err() {
            self.executions.remove(&exec);
        }
        outcome
    }

    /// Append events with optimistic concurrency, atomically with a state
    /// mutation. `expected_last_event_id` must match the current value or
    /// the append fails with `Conflict` and nothing changes.
    pub fn append(
        &mut self,
        exec: &ExecutionId,
        expected_last_event_id: i64,
        attrs: Vec<EventAttrs>,
        now_ms: u64,
        patch: impl FnOnce(&mut ExecutionState),
    ) -> Result<AppendOutcome, StoreError> {
        let record = self
            .executions
            .get_mut(exec)
            .ok_or_else(|| StoreError::NotFound(exec.to_string()))?;

        if record.state.last_event_id != expected_last_event_id {
            return Err(StoreError::Conflict {
                expected: expected_last_event_id,
                actual: record.state.last_event_id,
            });
        }
        if record.state.is_terminal() {
            return Err(StoreError::ExecutionClosed(exec.to_string()));
        }

        // Duplicate timer fires (crash between fire and journal compaction)
        // are dropped by scheduled_event_id.
        let attrs: Vec<EventAttrs> = attrs
            .into_iter()
            .filter(|a| match a {
                EventAttrs::TimerFired { scheduled_event_id, .. } => {
                    let duplicate = record.events.iter().any(|e| {
                        matches!(
                            &e.attrs,
                            EventAttrs::TimerFired { scheduled_event_id: prior, .. }
                                if prior == scheduled_event_id
                        )
                    });
                    if duplicate {
                        tracing::debug!(%exec, scheduled_event_id, "dropping duplicate timer fire");
                    }
                    !duplicate
                }
                _ => true,
            })
            .collect();

        if attrs.is_empty() {
            return Ok(AppendOutcome {
                last_event_id: record.state.last_event_id,
                events: Vec::new(),
            });
        }

        let mut next_id = record.state.last_event_id;
        let events: Vec<HistoryEvent> = attrs
            .into_iter()
            .map(|attrs| {
                next_id += 1;
                HistoryEvent { event_id: next_id, event_time_ms: now_ms, attrs }
            })
            .collect();

        // Stage the new state; commit memory only after the WAL accepts the
        // batch so a failed write leaves the shard untouched.
        let mut new_state = record.state.clone();
        new_state.last_event_id = next_id;
        patch(&mut new_state);

        self.wal.append(&[
            WalRecord::Append { exec: exec.clone(), events: events.clone() },
            WalRecord::State { state: new_state.clone() },
        ])?;

        record.state = new_state;
        record.events.extend(events.clone());
        self.appends_since_checkpoint += 1;

        for event in &events {
            tracing::debug!(
                %exec,
                shard = self.shard_id,
                event_id = event.event_id,
                "appended {}",
                event.attrs.log_summary()
            );
        }

        Ok(AppendOutcome { last_event_id: next_id, events })
    }

    /// Dense, monotonic slice of history from `from_event_id` (exclusive of
    /// nothing: pass 0 for everything).
    pub fn get_history(
        &self,
        exec: &ExecutionId,
        from_event_id: i64,
    ) -> Result<Vec<HistoryEvent>, StoreError> {
        let record = self
            .executions
            .get(exec)
            .ok_or_else(|| StoreError::NotFound(exec.to_string()))?;
        Ok(record.events.iter().filter(|e| e.event_id > from_event_id).cloned().collect())
    }

    pub fn get_state(&self, exec: &ExecutionId) -> Option<ExecutionState> {
        self.executions.get(exec).map(|r| r.state.clone())
    }

    /// Mutate state without appending an event (decision bookkeeping only).
    /// Still WAL-logged so recovery sees the same flags.
    pub fn update_state(
        &mut self,
        exec: &ExecutionId,
        patch: impl FnOnce(&mut ExecutionState),
    ) -> Result<ExecutionState, StoreError> {
        let record = self
            .executions
            .get_mut(exec)
            .ok_or_else(|| StoreError::NotFound(exec.to_string()))?;
        patch(&mut record.state);
        self.wal.append(&[WalRecord::State { state: record.state.clone() }])?;
        Ok(record.state.clone())
    }

    pub fn states(&self) -> impl Iterator<Item = &ExecutionState> {
        self.executions.values().map(|r| &r.state)
    }

    pub fn appends_since_checkpoint(&self) -> u64 {
        self.appends_since_checkpoint
    }

    // ── Recovery & checkpoint ───────────────────────────────────────────

    pub(crate) fn apply_record(&mut self, record: WalRecord) {
        match record {
            WalRecord::Append { exec, events } => {
                let entry = self.executions.entry(exec.clone()).or_insert_with(|| {
                    ExecutionRecord {
                        state: ExecutionState::new(exec, "", 0),
                        events: Vec::new(),
                    }
                });
                entry.events.extend(events);
            }
            WalRecord::State { state } => {
                let entry =
                    self.executions.entry(state.exec.clone()).or_insert_with(|| ExecutionRecord {
                        state: state.clone(),
                        events: Vec::new(),
                    });
                entry.state = state;
            }
        }
    }

    pub(crate) fn to_snapshot(&self) -> ShardSnapshot {
        ShardSnapshot {
            shard_id: self.shard_id,
            executions: self
                .executions
                .values()
                .map(|r| SnapshotEntry { state: r.state.clone(), events: r.events.clone() })
                .collect(),
        }
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: ShardSnapshot) {
        self.executions = snapshot
            .executions
            .into_iter()
            .map(|e| {
                (e.state.exec.clone(), ExecutionRecord { state: e.state, events: e.events })
            })
            .collect();
    }

    /// Reset the WAL after the snapshot has been persisted.
    pub(crate) fn mark_checkpointed(&mut self) -> Result<(), StoreError> {
        self.wal.reset()?;
        self.appends_since_checkpoint = 0;
        Ok(())
    }
}

#[cfg(test)]
#[path = "shard_tests.rs"]
mod tests;
