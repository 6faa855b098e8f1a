// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer service: durable scheduling plus the tick loop.

use crate::journal::{JournalRecord, TimerJournal};
use crate::scheduler::{Scheduler, TimerKey};
use lf_core::{Clock, ExecutionId};
use parking_lot::Mutex;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer journal io: {0}")]
    Io(#[from] std::io::Error),
    #[error("timer journal encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Idle sleep when no timer is pending.
const IDLE_TICK: Duration = Duration::from_secs(5);

pub struct TimerService<C: Clock> {
    clock: C,
    inner: Mutex<(Scheduler, TimerJournal)>,
    /// Woken whenever an earlier deadline may exist.
    rescheduled: Notify,
}

impl<C: Clock> TimerService<C> {
    /// Open the journal and replay it; pending timers survive restarts.
    pub fn open(path: &Path, clock: C) -> Result<Self, TimerError> {
        let scheduler = TimerJournal::replay(path)?;
        let journal = TimerJournal::open(path)?;
        if scheduler.has_timers() {
            tracing::info!(pending = scheduler.len(), "recovered pending timers");
        }
        Ok(Self { clock, inner: Mutex::new((scheduler, journal)), rescheduled: Notify::new() })
    }

    pub fn schedule(&self, key: TimerKey, fire_at_ms: u64) -> Result<(), TimerError> {
        {
            let mut inner = self.inner.lock();
            inner.1.append(&JournalRecord::Schedule { key: key.clone(), fire_at_ms })?;
            inner.0.schedule(key, fire_at_ms);
        }
        self.rescheduled.notify_waiters();
        Ok(())
    }

    pub fn cancel(&self, exec: &ExecutionId, timer_id: &str) -> Result<bool, TimerError> {
        let mut inner = self.inner.lock();
        let cancelled = inner.0.cancel(exec, timer_id);
        if cancelled {
            inner.1.append(&JournalRecord::Cancel {
                exec: exec.clone(),
                timer_id: timer_id.to_string(),
            })?;
        }
        Ok(cancelled)
    }

    /// Pop everything due now. The journal is marked per fire only after
    /// `mark_fired`, so a crash between pop and delivery re-fires — which
    /// history tolerates.
    pub fn due_now(&self) -> Vec<TimerKey> {
        self.inner.lock().0.due(self.clock.epoch_ms())
    }

    /// Record a delivered fire and compact the journal when due.
    pub fn mark_fired(&self, key: &TimerKey) -> Result<(), TimerError> {
        let mut inner = self.inner.lock();
        inner.1.append(&JournalRecord::Fired {
            exec: key.exec.clone(),
            timer_id: key.timer_id.clone(),
        })?;
        let (scheduler, journal) = &mut *inner;
        journal.maybe_compact(scheduler)?;
        Ok(())
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.inner.lock().0.next_deadline()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().0.len()
    }

    /// Tick loop: sleeps until the next deadline (or a reschedule wake) and
    /// delivers due fires through `deliver`. Runs until `shutdown`.
    pub async fn run<F, Fut>(&self, shutdown: CancellationToken, deliver: F)
    where
        F: Fn(TimerKey) -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let sleep_for = match self.next_deadline() {
                Some(deadline_ms) => {
                    Duration::from_millis(deadline_ms.saturating_sub(self.clock.epoch_ms()))
                }
                None => IDLE_TICK,
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.rescheduled.notified() => continue,
                _ = tokio::time::sleep(sleep_for) => {}
            }

            for key in self.due_now() {
                tracing::debug!(timer = %key, "timer fired");
                deliver(key.clone()).await;
                if let Err(e) = self.mark_fired(&key) {
                    tracing::warn!(timer = %key, error = %e, "failed to journal timer fire");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
