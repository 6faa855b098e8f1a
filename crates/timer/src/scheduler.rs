// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory timer wheel: a min-heap with lazy deletion.

use lf_core::ExecutionId;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Identifies one pending timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerKey {
    pub exec: ExecutionId,
    pub timer_id: String,
    /// Event id of the `TimerStarted` event, echoed back on fire so the
    /// append is idempotent.
    pub scheduled_event_id: i64,
}

impl TimerKey {
    fn slot(&self) -> String {
        format!("{}#{}", self.exec, self.timer_id)
    }
}

impl std::fmt::Display for TimerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.exec, self.timer_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    fire_at_ms: u64,
    slot: String,
    key: TimerKey,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.fire_at_ms, &self.slot).cmp(&(other.fire_at_ms, &other.slot))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of pending timers. Cancel and reschedule are lazy: stale heap
/// entries are skipped when popped.
#[derive(Default)]
pub struct Scheduler {
    heap: BinaryHeap<Reverse<Entry>>,
    /// Live fire time per slot; heap entries that disagree are stale.
    live: HashMap<String, u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or move) a timer. Rescheduling the same slot replaces the
    /// previous entry.
    pub fn schedule(&mut self, key: TimerKey, fire_at_ms: u64) {
        let slot = key.slot();
        self.live.insert(slot.clone(), fire_at_ms);
        self.heap.push(Reverse(Entry { fire_at_ms, slot, key }));
    }

    pub fn cancel(&mut self, exec: &ExecutionId, timer_id: &str) -> bool {
        self.live.remove(&format!("{exec}#{timer_id}")).is_some()
    }

    /// Pop every timer due at `now_ms`, skipping cancelled and superseded
    /// entries.
    pub fn due(&mut self, now_ms: u64) -> Vec<TimerKey> {
        let mut fired = Vec::new();
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.fire_at_ms > now_ms {
                break;
            }
            let Some(Reverse(entry)) = self.heap.pop() else { break };
            match self.live.get(&entry.slot) {
                Some(live_at) if *live_at == entry.fire_at_ms => {
                    self.live.remove(&entry.slot);
                    fired.push(entry.key);
                }
                _ => {} // cancelled or rescheduled
            }
        }
        fired
    }

    /// Earliest live deadline, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.live.values().min().copied()
    }

    pub fn has_timers(&self) -> bool {
        !self.live.is_empty()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live entries, for journal compaction.
    pub(crate) fn live_entries(&self) -> Vec<(TimerKey, u64)> {
        let mut entries: Vec<(TimerKey, u64)> = self
            .heap
            .iter()
            .filter(|Reverse(e)| self.live.get(&e.slot) == Some(&e.fire_at_ms))
            .map(|Reverse(e)| (e.key.clone(), e.fire_at_ms))
            .collect();
        entries.sort_by(|a, b| (a.1, a.0.slot()).cmp(&(b.1, b.0.slot())));
        entries.dedup_by(|a, b| a.0.slot() == b.0.slot());
        entries
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
