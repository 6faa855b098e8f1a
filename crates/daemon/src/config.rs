// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: CLI flags with env fallbacks and documented
//! defaults.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lfd", version, about = "LinkFlow execution-plane daemon")]
pub struct Cli {
    /// RPC listener port (engine wire protocol)
    #[arg(long, env = "LF_PORT", default_value_t = 7233)]
    pub port: u16,

    /// HTTP inspection surface port
    #[arg(long, env = "LF_HTTP_PORT", default_value_t = 7280)]
    pub http_port: u16,

    /// Redis URL for job ingress and live event pub/sub
    #[arg(long, env = "LF_REDIS_URL", default_value = "redis://127.0.0.1:6379/0")]
    pub redis_url: String,

    /// Number of history shards; must stay stable across restarts
    #[arg(long, env = "LF_SHARD_COUNT", default_value_t = 16)]
    pub shard_count: u32,

    /// Activity task queue name
    #[arg(long, env = "LF_TASK_QUEUE", default_value = "activities")]
    pub task_queue: String,

    /// Namespace this daemon's workers poll
    #[arg(long, env = "LF_NAMESPACE", default_value = "default")]
    pub namespace: String,

    #[arg(long, env = "LF_DECIDER_WORKERS", default_value_t = 2)]
    pub decider_workers: usize,

    #[arg(long, env = "LF_ACTIVITY_WORKERS", default_value_t = 4)]
    pub activity_workers: usize,

    /// Durable state directory (shard WALs, snapshots, timer journal)
    #[arg(long, env = "LF_STATE_DIR", default_value = "/var/lib/linkflow")]
    pub state_dir: PathBuf,

    /// Secret for task-token signatures; a random default is generated
    /// when unset. Tokens then do not survive restarts, and in-flight
    /// tasks are reclaimed instead.
    #[arg(long, env = "LF_CALLBACK_SECRET")]
    pub callback_secret: Option<String>,

    /// Skip the redis job consumer (workflows start via RPC only)
    #[arg(long, env = "LF_DISABLE_INGRESS", default_value_t = false)]
    pub disable_ingress: bool,

    /// Allow outbound HTTP to private address ranges (dev only)
    #[arg(long, env = "LF_ALLOW_PRIVATE_NETWORKS", default_value_t = false)]
    pub allow_private_networks: bool,

    /// Log file directory; stderr-only when unset
    #[arg(long, env = "LF_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub http_port: u16,
    pub redis_url: String,
    pub shard_count: u32,
    pub task_queue: String,
    pub namespace: String,
    pub decider_workers: usize,
    pub activity_workers: usize,
    pub state_dir: PathBuf,
    pub token_secret: Vec<u8>,
    pub ingress_enabled: bool,
    pub allow_private_networks: bool,
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> Config {
        let token_secret = match self.callback_secret {
            Some(secret) => secret.into_bytes(),
            None => {
                // Process-local random secret
                lf_core::TaskId::new().as_str().as_bytes().to_vec()
            }
        };
        Config {
            port: self.port,
            http_port: self.http_port,
            redis_url: self.redis_url,
            shard_count: self.shard_count,
            task_queue: self.task_queue,
            namespace: self.namespace,
            decider_workers: self.decider_workers,
            activity_workers: self.activity_workers,
            state_dir: self.state_dir,
            token_secret,
            ingress_enabled: !self.disable_ingress,
            allow_private_networks: self.allow_private_networks,
            log_dir: self.log_dir,
        }
    }
}

impl Config {
    pub fn shards_dir(&self) -> PathBuf {
        self.state_dir.join("shards")
    }

    pub fn timer_journal(&self) -> PathBuf {
        self.state_dir.join("timers.journal")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
