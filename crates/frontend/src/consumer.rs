// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job consumer: reads envelopes from the control plane's redis stream
//! with a consumer group, at-least-once.
//!
//! Malformed envelopes go straight to the dead-letter stream; transient
//! start failures leave the entry pending so the group redelivers it;
//! entries idle past the reclaim window are claimed back, and entries
//! delivered more than `max_deliveries` times are dead-lettered.

use crate::error::FrontendError;
use lf_core::{Clock, JobEnvelope};
use lf_history::{HistoryError, HistoryService};
use redis::aio::ConnectionManager;
use redis::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub block_ms: u64,
    pub batch: usize,
    /// Entries pending longer than this are reclaimed from dead consumers.
    pub idle_reclaim_ms: u64,
    pub max_deliveries: u32,
    pub dlq_stream: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            stream: "lf:jobs".to_string(),
            group: "lf-engine".to_string(),
            consumer: "lf-frontend-0".to_string(),
            block_ms: 2_000,
            batch: 16,
            idle_reclaim_ms: 60_000,
            max_deliveries: 5,
            dlq_stream: "lf:jobs:dead".to_string(),
        }
    }
}

impl ConsumerConfig {
    lf_core::setters! {
        into stream: String;
        into group: String;
        into consumer: String;
        set block_ms: u64;
        set idle_reclaim_ms: u64;
        set max_deliveries: u32;
    }
}

pub struct JobConsumer<C: Clock> {
    redis: ConnectionManager,
    config: ConsumerConfig,
    history: Arc<HistoryService<C>>,
}

impl<C: Clock> JobConsumer<C> {
    pub async fn connect(
        redis_url: &str,
        config: ConsumerConfig,
        history: Arc<HistoryService<C>>,
    ) -> Result<Self, FrontendError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis, config, history })
    }

    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), FrontendError> {
        self.ensure_group().await?;
        // The blocking read is never raced against other futures: a
        // half-finished XREADGROUP on the shared connection would corrupt
        // the multiplexed stream. The block interval bounds shutdown
        // latency instead, and the reclaim sweep runs between reads.
        let reclaim_every = Duration::from_millis((self.config.idle_reclaim_ms / 2).max(1_000));
        let mut last_reclaim = tokio::time::Instant::now();
        while !shutdown.is_cancelled() {
            match self.read_batch().await {
                Ok(entries) => {
                    for (entry_id, fields) in entries {
                        self.handle_entry(&entry_id, &fields).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "job stream read failed");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
            if last_reclaim.elapsed() >= reclaim_every {
                last_reclaim = tokio::time::Instant::now();
                if let Err(e) = self.reclaim().await {
                    tracing::warn!(error = %e, "job reclaim sweep failed");
                }
            }
        }
        Ok(())
    }

    async fn ensure_group(&self) -> Result<(), FrontendError> {
        let mut conn = self.redis.clone();
        let result: Result<Value, redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_batch(&self) -> Result<Vec<(String, HashMap<String, Vec<u8>>)>, FrontendError> {
        let mut conn = self.redis.clone();
        let reply: Value = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.group)
            .arg(&self.config.consumer)
            .arg("COUNT")
            .arg(self.config.batch)
            .arg("BLOCK")
            .arg(self.config.block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream)
            .arg(">")
            .query_async(&mut conn)
            .await?;
        Ok(parse_stream_reply(&reply, &self.config.stream))
    }

    async fn handle_entry(&self, entry_id: &str, fields: &HashMap<String, Vec<u8>>) {
        let Some(payload) = fields.get("payload") else {
            tracing::warn!(entry_id, "entry without payload field");
            self.dead_letter(entry_id, b"", "missing payload field").await;
            return;
        };

        let envelope: JobEnvelope = match serde_json::from_slice(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(entry_id, error = %e, "malformed envelope");
                self.dead_letter(entry_id, payload, &format!("malformed envelope: {e}")).await;
                return;
            }
        };

        match self.history.start_workflow(envelope).await {
            Ok(exec) => {
                tracing::info!(entry_id, %exec, "job accepted");
                self.ack(entry_id).await;
            }
            Err(HistoryError::Validation(e)) => {
                tracing::warn!(entry_id, error = %e, "envelope rejected");
                self.dead_letter(entry_id, payload, &e.to_string()).await;
            }
            Err(e) => {
                // Transient: leave the entry pending so the group
                // redelivers it after the idle window.
                tracing::warn!(entry_id, error = %e, "start failed, leaving for redelivery");
            }
        }
    }

    /// Reclaim sweep: XPENDING for idle entries, dead-letter the
    /// over-delivered, claim and re-process the rest.
    async fn reclaim(&self) -> Result<(), FrontendError> {
        let mut conn = self.redis.clone();
        let reply: Value = redis::cmd("XPENDING")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg("IDLE")
            .arg(self.config.idle_reclaim_ms)
            .arg("-")
            .arg("+")
            .arg(32)
            .query_async(&mut conn)
            .await?;

        for pending in parse_pending_reply(&reply) {
            let claimed = self.claim(&pending.entry_id).await?;
            let Some(fields) = claimed else { continue };
            if pending.deliveries > self.config.max_deliveries {
                tracing::warn!(
                    entry_id = %pending.entry_id,
                    deliveries = pending.deliveries,
                    "job entry dead-lettered"
                );
                let payload = fields.get("payload").cloned().unwrap_or_default();
                self.dead_letter(&pending.entry_id, &payload, "max deliveries exceeded").await;
            } else {
                tracing::info!(entry_id = %pending.entry_id, "reclaimed idle job entry");
                self.handle_entry(&pending.entry_id, &fields).await;
            }
        }
        Ok(())
    }

    async fn claim(
        &self,
        entry_id: &str,
    ) -> Result<Option<HashMap<String, Vec<u8>>>, FrontendError> {
        let mut conn = self.redis.clone();
        let reply: Value = redis::cmd("XCLAIM")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg(&self.config.consumer)
            .arg(0)
            .arg(entry_id)
            .query_async(&mut conn)
            .await?;
        Ok(parse_entries(&reply).into_iter().next().map(|(_, fields)| fields))
    }

    async fn ack(&self, entry_id: &str) {
        let mut conn = self.redis.clone();
        let result: Result<Value, redis::RedisError> = redis::cmd("XACK")
            .arg(&self.config.stream)
            .arg(&self.config.group)
            .arg(entry_id)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            tracing::warn!(entry_id, error = %e, "ack failed");
        }
    }

    async fn dead_letter(&self, entry_id: &str, payload: &[u8], reason: &str) {
        let mut conn = self.redis.clone();
        let result: Result<Value, redis::RedisError> = redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("*")
            .arg("origin_id")
            .arg(entry_id)
            .arg("reason")
            .arg(reason)
            .arg("payload")
            .arg(payload)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            tracing::error!(entry_id, error = %e, "dead-letter append failed");
        }
        self.ack(entry_id).await;
    }
}

// ── Reply parsing ───────────────────────────────────────────────────────
// Defensive helpers over redis::Value; unexpected shapes parse to empty.

fn as_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::BulkString(bytes) => Some(bytes.clone()),
        Value::SimpleString(s) => Some(s.as_bytes().to_vec()),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    as_bytes(value).map(|b| String::from_utf8_lossy(&b).into_owned())
}

/// `XREADGROUP` reply: `[[stream, [[id, [k, v, ...]], ...]], ...]`.
pub(crate) fn parse_stream_reply(
    reply: &Value,
    stream: &str,
) -> Vec<(String, HashMap<String, Vec<u8>>)> {
    let Some(streams) = as_array(reply) else { return Vec::new() };
    for entry in streams {
        let Some(pair) = as_array(entry) else { continue };
        let (Some(name), Some(entries)) = (pair.first(), pair.get(1)) else { continue };
        if as_string(name).as_deref() != Some(stream) {
            continue;
        }
        return parse_entries(entries);
    }
    Vec::new()
}

/// Entry list: `[[id, [field, value, ...]], ...]`.
pub(crate) fn parse_entries(value: &Value) -> Vec<(String, HashMap<String, Vec<u8>>)> {
    let Some(items) = as_array(value) else { return Vec::new() };
    items
        .iter()
        .filter_map(|item| {
            let pair = as_array(item)?;
            let entry_id = as_string(pair.first()?)?;
            let raw_fields = as_array(pair.get(1)?)?;
            let mut fields = HashMap::new();
            for chunk in raw_fields.chunks(2) {
                if let (Some(k), Some(v)) = (chunk.first(), chunk.get(1)) {
                    if let (Some(k), Some(v)) = (as_string(k), as_bytes(v)) {
                        fields.insert(k, v);
                    }
                }
            }
            Some((entry_id, fields))
        })
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct PendingEntry {
    pub entry_id: String,
    pub consumer: String,
    pub idle_ms: u64,
    pub deliveries: u32,
}

/// `XPENDING ... IDLE` reply: `[[id, consumer, idle, deliveries], ...]`.
pub(crate) fn parse_pending_reply(reply: &Value) -> Vec<PendingEntry> {
    let Some(rows) = as_array(reply) else { return Vec::new() };
    rows.iter()
        .filter_map(|row| {
            let parts = as_array(row)?;
            Some(PendingEntry {
                entry_id: as_string(parts.first()?)?,
                consumer: as_string(parts.get(1)?)?,
                idle_ms: match parts.get(2)? {
                    Value::Int(n) => *n as u64,
                    _ => 0,
                },
                deliveries: match parts.get(3)? {
                    Value::Int(n) => *n as u32,
                    _ => 0,
                },
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
