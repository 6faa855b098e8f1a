// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live event streaming: per-execution broadcast channels plus redis
//! pub/sub for the control plane's SSE bridge.

use async_trait::async_trait;
use lf_core::{Clock, EventAttrs, ExecutionId, ExecutionState, HistoryEvent};
use lf_history::ProgressSink;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Channel capacity per execution; slow subscribers drop old events.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveEvent {
    pub event: String,
    pub execution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_key: Option<String>,
    pub data: serde_json::Value,
    pub timestamp: u64,
}

struct Channel {
    tx: broadcast::Sender<LiveEvent>,
    last_activity_ms: u64,
}

pub struct LiveStream<C: Clock> {
    clock: C,
    channels: Mutex<HashMap<String, Channel>>,
    redis: Option<ConnectionManager>,
    /// Channels idle past this are dropped by `prune`.
    quiescence_ms: u64,
}

impl<C: Clock> LiveStream<C> {
    pub fn new(clock: C, redis: Option<ConnectionManager>, quiescence_ms: u64) -> Self {
        Self { clock, channels: Mutex::new(HashMap::new()), redis, quiescence_ms }
    }

    fn redis_channel(execution_id: &str) -> String {
        format!("lf:exec:{execution_id}")
    }

    pub async fn publish(&self, event: LiveEvent) {
        let key = event.execution_id.clone();
        {
            let mut channels = self.channels.lock();
            let channel = channels.entry(key.clone()).or_insert_with(|| Channel {
                tx: broadcast::channel(CHANNEL_CAPACITY).0,
                last_activity_ms: 0,
            });
            channel.last_activity_ms = self.clock.epoch_ms();
            // No in-process subscribers is fine
            let _ = channel.tx.send(event.clone());
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            match serde_json::to_string(&event) {
                Ok(payload) => {
                    let result: Result<(), redis::RedisError> = redis::cmd("PUBLISH")
                        .arg(Self::redis_channel(&key))
                        .arg(payload)
                        .query_async(&mut conn)
                        .await;
                    if let Err(e) = result {
                        tracing::warn!(execution = %key, error = %e, "live publish failed");
                    }
                }
                Err(e) => tracing::warn!(execution = %key, error = %e, "live event encoding"),
            }
        }
    }

    pub fn subscribe(&self, execution_id: &str) -> broadcast::Receiver<LiveEvent> {
        let mut channels = self.channels.lock();
        let channel =
            channels.entry(execution_id.to_string()).or_insert_with(|| Channel {
                tx: broadcast::channel(CHANNEL_CAPACITY).0,
                last_activity_ms: self.clock.epoch_ms(),
            });
        channel.tx.subscribe()
    }

    /// Drop channels quiet past the quiescence window with no subscribers.
    pub fn prune(&self) -> usize {
        let horizon = self.clock.epoch_ms().saturating_sub(self.quiescence_ms);
        let mut channels = self.channels.lock();
        let before = channels.len();
        channels.retain(|_, c| c.last_activity_ms >= horizon || c.tx.receiver_count() > 0);
        before - channels.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }
}

fn node_key(attrs: &EventAttrs) -> Option<String> {
    match attrs {
        EventAttrs::NodeScheduled { node_id, .. }
        | EventAttrs::NodeStarted { node_id, .. }
        | EventAttrs::NodeCompleted { node_id, .. }
        | EventAttrs::NodeFailed { node_id, .. }
        | EventAttrs::NodeTimedOut { node_id, .. } => Some(node_id.clone()),
        _ => None,
    }
}

#[async_trait]
impl<C: Clock + 'static> ProgressSink for LiveStream<C> {
    async fn event_appended(&self, exec: &ExecutionId, event: &HistoryEvent) {
        let data = serde_json::to_value(&event.attrs).unwrap_or(serde_json::Value::Null);
        self.publish(LiveEvent {
            event: event.attrs.kind().to_string(),
            execution_id: exec.to_string(),
            node_key: node_key(&event.attrs),
            data,
            timestamp: event.event_time_ms,
        })
        .await;
    }

    async fn execution_finished(
        &self,
        exec: &ExecutionId,
        state: &ExecutionState,
        _history: &[HistoryEvent],
    ) {
        self.publish(LiveEvent {
            event: "execution:finished".to_string(),
            execution_id: exec.to_string(),
            node_key: None,
            data: serde_json::json!({ "status": state.status.as_str() }),
            timestamp: self.clock.epoch_ms(),
        })
        .await;
    }
}

/// Fan one history notification out to several sinks (callback bridge +
/// live stream in the default deployment).
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ProgressSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ProgressSink for FanoutSink {
    async fn event_appended(&self, exec: &ExecutionId, event: &HistoryEvent) {
        for sink in &self.sinks {
            sink.event_appended(exec, event).await;
        }
    }

    async fn execution_finished(
        &self,
        exec: &ExecutionId,
        state: &ExecutionState,
        history: &[HistoryEvent],
    ) {
        for sink in &self.sinks {
            sink.execution_finished(exec, state, history).await;
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
