// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The matching service: bounded partitioned queues with reservation
//! semantics.

use crate::error::MatchingError;
use crate::token::{TaskToken, TokenPayload, TokenSigner};
use lf_core::{Clock, TaskId, TaskPayload};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Fully-qualified queue partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    pub namespace: String,
    pub task_queue: String,
    pub partition: u32,
}

impl std::fmt::Display for QueueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.task_queue, self.partition)
    }
}

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub partitions: u32,
    /// Per-partition bound; producers see `ResourceExhausted` beyond it.
    pub queue_capacity: usize,
    pub visibility_timeout_ms: u64,
    /// Deliveries beyond this move the task to the dead-letter queue.
    pub max_redeliveries: u32,
    pub token_secret: Vec<u8>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            queue_capacity: 1024,
            visibility_timeout_ms: 30_000,
            max_redeliveries: 3,
            token_secret: b"linkflow-dev-secret".to_vec(),
        }
    }
}

impl MatchingConfig {
    lf_core::setters! {
        set partitions: u32;
        set queue_capacity: usize;
        set visibility_timeout_ms: u64;
        set max_redeliveries: u32;
        into token_secret: Vec<u8>;
    }
}

/// A task handed to a worker, with its reservation token.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeliveredTask {
    pub token: TaskToken,
    pub task: TaskPayload,
    /// 1-based delivery count (redeliveries increment it).
    pub delivery: u32,
}

/// A task that exhausted its redeliveries.
#[derive(Debug, Clone)]
pub struct DeadTask {
    pub key: QueueKey,
    pub task: TaskPayload,
    pub deliveries: u32,
    pub reason: Option<String>,
    pub dead_at_ms: u64,
}

struct QueuedTask {
    task: TaskPayload,
    deliveries: u32,
}

struct InFlightTask {
    key: QueueKey,
    task: TaskPayload,
    deliveries: u32,
    invisible_until_ms: u64,
}

struct DelayedTask {
    ready_at_ms: u64,
    key: QueueKey,
    entry: QueuedTask,
}

#[derive(Default)]
struct Inner {
    ready: HashMap<QueueKey, VecDeque<QueuedTask>>,
    in_flight: HashMap<TaskId, InFlightTask>,
    delayed: Vec<DelayedTask>,
    dlq: Vec<DeadTask>,
}

pub struct MatchingService<C: Clock> {
    config: MatchingConfig,
    clock: C,
    signer: TokenSigner,
    inner: Mutex<Inner>,
    wakeups: Mutex<HashMap<(String, String), Arc<Notify>>>,
}

impl<C: Clock> MatchingService<C> {
    pub fn new(config: MatchingConfig, clock: C) -> Self {
        let signer = TokenSigner::new(config.token_secret.clone());
        Self {
            config,
            clock,
            signer,
            inner: Mutex::new(Inner::default()),
            wakeups: Mutex::new(HashMap::new()),
        }
    }

    pub fn partitions(&self) -> u32 {
        self.config.partitions
    }

    /// Enqueue a task. Bounded: full partitions reject the producer.
    pub fn add_task(&self, key: QueueKey, task: TaskPayload) -> Result<(), MatchingError> {
        {
            let mut inner = self.inner.lock();
            let queue = inner.ready.entry(key.clone()).or_default();
            if queue.len() >= self.config.queue_capacity {
                return Err(MatchingError::ResourceExhausted {
                    queue: format!("{}/{}", key.namespace, key.task_queue),
                    partition: key.partition,
                });
            }
            tracing::debug!(queue = %key, task = %task, "task enqueued");
            queue.push_back(QueuedTask { task, deliveries: 0 });
        }
        self.wakeup(&key.namespace, &key.task_queue).notify_waiters();
        Ok(())
    }

    /// Long-poll for the next task on any partition of `task_queue`.
    ///
    /// Returns `None` when `long_poll_timeout` lapses with nothing to hand
    /// out. Delivered tasks are invisible until acked, nacked, or reclaimed.
    pub async fn poll_task(
        &self,
        namespace: &str,
        task_queue: &str,
        identity: &str,
        long_poll_timeout: Duration,
    ) -> Result<Option<DeliveredTask>, MatchingError> {
        let deadline = tokio::time::Instant::now() + long_poll_timeout;
        loop {
            if let Some(delivered) = self.try_deliver(namespace, task_queue)? {
                tracing::debug!(
                    queue = task_queue,
                    identity,
                    task = %delivered.task,
                    delivery = delivered.delivery,
                    "task delivered"
                );
                return Ok(Some(delivered));
            }

            let notify = self.wakeup(namespace, task_queue);
            let notified = notify.notified();
            // Re-check after arming the waiter: an add_task between the
            // first check and notified() would otherwise be missed.
            if let Some(delivered) = self.try_deliver(namespace, task_queue)? {
                return Ok(Some(delivered));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    fn try_deliver(
        &self,
        namespace: &str,
        task_queue: &str,
    ) -> Result<Option<DeliveredTask>, MatchingError> {
        let now_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        for partition in 0..self.config.partitions {
            let key = QueueKey {
                namespace: namespace.to_string(),
                task_queue: task_queue.to_string(),
                partition,
            };
            let Some(queue) = inner.ready.get_mut(&key) else { continue };
            let Some(mut entry) = queue.pop_front() else { continue };

            entry.deliveries += 1;
            let deliveries = entry.deliveries;
            let token = self.signer.sign(TokenPayload {
                task_id: entry.task.task_id(),
                namespace: key.namespace.clone(),
                task_queue: key.task_queue.clone(),
                partition,
                delivery: deliveries,
                nonce: format!("{now_ms:x}-{deliveries}"),
            })?;
            inner.in_flight.insert(
                entry.task.task_id(),
                InFlightTask {
                    key,
                    task: entry.task.clone(),
                    deliveries,
                    invisible_until_ms: now_ms + self.config.visibility_timeout_ms,
                },
            );
            return Ok(Some(DeliveredTask { token, task: entry.task, delivery: deliveries }));
        }
        Ok(None)
    }

    /// Ack a task. Idempotent on token: a second complete (or a complete
    /// racing a reclaim) returns `false` without error. A token from a
    /// superseded delivery is stale and cannot ack the live reservation.
    pub fn complete_task(&self, token: &TaskToken) -> Result<bool, MatchingError> {
        self.signer.verify(token)?;
        let mut inner = self.inner.lock();
        let current = inner
            .in_flight
            .get(&token.task_id())
            .is_some_and(|t| t.deliveries == token.payload.delivery);
        if current {
            inner.in_flight.remove(&token.task_id());
            tracing::debug!(task_id = %token.task_id(), "task completed");
        }
        Ok(current)
    }

    /// Nack a task. Requeues after `requeue_delay`, or dead-letters once the
    /// redelivery budget is spent.
    pub fn fail_task(
        &self,
        token: &TaskToken,
        reason: Option<String>,
        requeue_delay: Option<Duration>,
    ) -> Result<(), MatchingError> {
        self.signer.verify(token)?;
        let now_ms = self.clock.epoch_ms();
        let mut wake: Option<(String, String)> = None;
        {
            let mut inner = self.inner.lock();
            let current = inner
                .in_flight
                .get(&token.task_id())
                .is_some_and(|t| t.deliveries == token.payload.delivery);
            if !current {
                // Already acked, reclaimed, or superseded; nothing to do.
                return Ok(());
            }
            let Some(in_flight) = inner.in_flight.remove(&token.task_id()) else {
                return Ok(());
            };

            if in_flight.deliveries >= self.config.max_redeliveries {
                tracing::warn!(
                    task_id = %token.task_id(),
                    deliveries = in_flight.deliveries,
                    "task dead-lettered"
                );
                inner.dlq.push(DeadTask {
                    key: in_flight.key,
                    task: in_flight.task,
                    deliveries: in_flight.deliveries,
                    reason,
                    dead_at_ms: now_ms,
                });
            } else {
                let entry =
                    QueuedTask { task: in_flight.task, deliveries: in_flight.deliveries };
                match requeue_delay {
                    Some(delay) if !delay.is_zero() => inner.delayed.push(DelayedTask {
                        ready_at_ms: now_ms + delay.as_millis() as u64,
                        key: in_flight.key,
                        entry,
                    }),
                    _ => {
                        wake = Some((
                            in_flight.key.namespace.clone(),
                            in_flight.key.task_queue.clone(),
                        ));
                        inner.ready.entry(in_flight.key).or_default().push_back(entry);
                    }
                }
            }
        }
        if let Some((namespace, task_queue)) = wake {
            self.wakeup(&namespace, &task_queue).notify_waiters();
        }
        Ok(())
    }

    /// Sweep: re-deliver tasks whose visibility timeout lapsed and promote
    /// delayed requeues that are due. Returns how many tasks went back to
    /// ready queues.
    pub fn reclaim(&self) -> usize {
        let now_ms = self.clock.epoch_ms();
        let mut woken: Vec<(String, String)> = Vec::new();
        let mut moved = 0usize;
        {
            let mut inner = self.inner.lock();

            let due: Vec<TaskId> = inner
                .in_flight
                .iter()
                .filter(|(_, t)| t.invisible_until_ms <= now_ms)
                .map(|(id, _)| *id)
                .collect();
            for task_id in due {
                let Some(in_flight) = inner.in_flight.remove(&task_id) else { continue };
                if in_flight.deliveries >= self.config.max_redeliveries {
                    tracing::warn!(%task_id, "expired task dead-lettered");
                    inner.dlq.push(DeadTask {
                        key: in_flight.key,
                        task: in_flight.task,
                        deliveries: in_flight.deliveries,
                        reason: Some("visibility timeout".to_string()),
                        dead_at_ms: now_ms,
                    });
                } else {
                    tracing::debug!(%task_id, "reclaiming expired task");
                    woken.push((
                        in_flight.key.namespace.clone(),
                        in_flight.key.task_queue.clone(),
                    ));
                    inner.ready.entry(in_flight.key).or_default().push_back(QueuedTask {
                        task: in_flight.task,
                        deliveries: in_flight.deliveries,
                    });
                    moved += 1;
                }
            }

            let mut still_waiting = Vec::new();
            for delayed in inner.delayed.drain(..).collect::<Vec<_>>() {
                if delayed.ready_at_ms <= now_ms {
                    woken.push((
                        delayed.key.namespace.clone(),
                        delayed.key.task_queue.clone(),
                    ));
                    inner.ready.entry(delayed.key).or_default().push_back(delayed.entry);
                    moved += 1;
                } else {
                    still_waiting.push(delayed);
                }
            }
            inner.delayed = still_waiting;
        }
        woken.sort();
        woken.dedup();
        for (namespace, task_queue) in woken {
            self.wakeup(&namespace, &task_queue).notify_waiters();
        }
        moved
    }

    /// Total ready depth across partitions, for health reporting.
    pub fn depth(&self, namespace: &str, task_queue: &str) -> usize {
        let inner = self.inner.lock();
        inner
            .ready
            .iter()
            .filter(|(k, _)| k.namespace == namespace && k.task_queue == task_queue)
            .map(|(_, q)| q.len())
            .sum()
    }

    pub fn dead_letters(&self) -> Vec<DeadTask> {
        self.inner.lock().dlq.clone()
    }

    fn wakeup(&self, namespace: &str, task_queue: &str) -> Arc<Notify> {
        let mut wakeups = self.wakeups.lock();
        wakeups
            .entry((namespace.to_string(), task_queue.to_string()))
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
