// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: construct the services, wire them together, spawn
//! the background loops, and tear everything down in order.

use crate::config::Config;
use crate::listener;
use lf_core::SystemClock;
use lf_executors::{builtin_registry, install_default_registry, HttpConfig, SsrfPolicy};
use lf_frontend::{
    CallbackBridge, CallbackConfig, ConsumerConfig, FanoutSink, HttpState, JobConsumer,
    LiveStream,
};
use lf_history::{HistoryConfig, HistoryService};
use lf_matching::{MatchingConfig, MatchingService};
use lf_storage::ShardManager;
use lf_timer::TimerService;
use lf_worker::{ActivityRunner, WorkerConfig, WorkerPool};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] lf_storage::StoreError),

    #[error(transparent)]
    Timer(#[from] lf_timer::TimerError),

    #[error(transparent)]
    Registry(#[from] lf_executors::RegistryError),

    #[error(transparent)]
    History(#[from] lf_history::HistoryError),

    #[error(transparent)]
    Frontend(#[from] lf_frontend::FrontendError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Live quiescence window for per-execution channels.
const LIVE_QUIESCENCE_MS: u64 = 5 * 60 * 1_000;
const RECLAIM_INTERVAL: Duration = Duration::from_secs(5);
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(30);
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Everything the daemon hosts, for the listener and tests.
pub struct Engine {
    pub config: Config,
    pub store: Arc<ShardManager>,
    pub matching: Arc<MatchingService<SystemClock>>,
    pub timers: Arc<TimerService<SystemClock>>,
    pub history: Arc<HistoryService<SystemClock>>,
    pub live: Arc<LiveStream<SystemClock>>,
    pub started_at: Instant,
    pub shutdown: CancellationToken,
}

/// Construct and start every service. Returns the engine handle plus the
/// background task handles to join on shutdown.
pub async fn startup(config: Config) -> Result<(Arc<Engine>, Vec<JoinHandle<()>>), LifecycleError> {
    let clock = SystemClock;
    std::fs::create_dir_all(&config.state_dir)?;

    // Storage and timers recover their durable state first.
    let store = Arc::new(ShardManager::open(&config.shards_dir(), config.shard_count)?);
    let timers = Arc::new(TimerService::open(&config.timer_journal(), clock.clone())?);
    let matching = Arc::new(MatchingService::new(
        MatchingConfig::default().token_secret(config.token_secret.clone()),
        clock.clone(),
    ));

    // Frontend sinks: callbacks to the control plane + live streaming.
    let redis = match redis::Client::open(config.redis_url.as_str()) {
        Ok(client) => match redis::aio::ConnectionManager::new(client).await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, live events are in-process only");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "invalid redis url, live events are in-process only");
            None
        }
    };
    let bridge = Arc::new(CallbackBridge::new(CallbackConfig::default())?);
    let live = Arc::new(LiveStream::new(clock.clone(), redis.clone(), LIVE_QUIESCENCE_MS));
    let sink = Arc::new(FanoutSink::new(vec![bridge.clone(), live.clone()]));

    let history = Arc::new(HistoryService::new(
        HistoryConfig::default().task_queue(config.task_queue.clone()),
        store.clone(),
        matching.clone(),
        timers.clone(),
        sink,
        clock.clone(),
    ));

    // Executor registry: built once, installed process-wide, then injected
    // into the activity runner before any worker starts.
    let registry = Arc::new(builtin_registry(HttpConfig::default().ssrf(SsrfPolicy {
        allow_private: config.allow_private_networks,
    }))?);
    install_default_registry(registry.clone())?;
    let runner = Arc::new(ActivityRunner::new());
    runner.set_registry(registry);

    // Re-issue work lost with the previous process before anyone polls.
    let reconciled = history.reconcile().await?;
    if reconciled > 0 {
        tracing::info!(executions = reconciled, "reconciled after restart");
    }

    let shutdown = CancellationToken::new();
    let mut handles = Vec::new();

    // Worker pool
    let pool = WorkerPool::new(
        WorkerConfig::default()
            .namespace(config.namespace.clone())
            .task_queue(config.task_queue.clone())
            .decider_workers(config.decider_workers)
            .activity_workers(config.activity_workers),
        history.clone(),
        matching.clone(),
        runner,
    );
    handles.extend(pool.spawn(shutdown.clone()));

    // Timer tick loop → history
    {
        let timers = timers.clone();
        let history = history.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            timers
                .run(shutdown, move |key| {
                    let history = history.clone();
                    async move {
                        if let Err(e) = history.record_timer_fired(&key).await {
                            tracing::warn!(timer = %key, error = %e, "timer fire not recorded");
                        }
                    }
                })
                .await;
        }));
    }

    // Matching reclaim sweep
    {
        let matching = matching.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(RECLAIM_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tick.tick() => {
                        let moved = matching.reclaim();
                        if moved > 0 {
                            tracing::info!(moved, "reclaimed expired tasks");
                        }
                    }
                }
            }
        }));
    }

    // Storage checkpoint loop
    {
        let store = store.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(CHECKPOINT_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tick.tick() => {
                        if let Err(e) = store.checkpoint_due() {
                            tracing::warn!(error = %e, "shard checkpoint failed");
                        }
                    }
                }
            }
        }));
    }

    // Live channel pruning
    {
        let live = live.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tick.tick() => {
                        let dropped = live.prune();
                        if dropped > 0 {
                            tracing::debug!(dropped, "pruned quiescent live channels");
                        }
                    }
                }
            }
        }));
    }

    // Job ingress
    if config.ingress_enabled {
        let consumer = JobConsumer::connect(
            &config.redis_url,
            ConsumerConfig::default(),
            history.clone(),
        )
        .await;
        match consumer {
            Ok(consumer) => {
                let shutdown = shutdown.clone();
                handles.push(tokio::spawn(async move {
                    if let Err(e) = consumer.run(shutdown).await {
                        tracing::error!(error = %e, "job consumer stopped");
                    }
                }));
            }
            Err(e) => {
                tracing::error!(error = %e, "job consumer unavailable; RPC ingress only");
            }
        }
    }

    let engine = Arc::new(Engine {
        config,
        store,
        matching,
        timers,
        history,
        live,
        started_at: Instant::now(),
        shutdown: shutdown.clone(),
    });

    // HTTP inspection surface
    {
        let state = Arc::new(HttpState {
            history: engine.history.clone(),
            started_at: engine.started_at,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], engine.config.http_port));
        let router = lf_frontend::router(state);
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = lf_frontend::serve(addr, router, shutdown).await {
                tracing::error!(error = %e, "http surface stopped");
            }
        }));
    }

    // Wire RPC listener
    {
        let engine = engine.clone();
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = listener::run(engine, shutdown).await {
                tracing::error!(error = %e, "rpc listener stopped");
            }
        }));
    }

    tracing::info!(
        port = engine.config.port,
        http_port = engine.config.http_port,
        shards = engine.config.shard_count,
        "lfd started"
    );
    Ok((engine, handles))
}

/// Orderly teardown: stop the loops, then checkpoint storage.
pub async fn shutdown(engine: Arc<Engine>, handles: Vec<JoinHandle<()>>) {
    tracing::info!("shutting down");
    engine.shutdown.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "background task panicked during shutdown");
        }
    }
    if let Err(e) = engine.store.checkpoint_all() {
        tracing::error!(error = %e, "final checkpoint failed");
    }
    tracing::info!("shutdown complete");
}
