// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire RPC listener: serves the engine surface over framed JSON.

use crate::lifecycle::Engine;
use lf_core::{ExecutionStatus, SystemClock};
use lf_history::{HistoryError, HistoryService, WORKFLOW_TASK_QUEUE};
use lf_matching::QueueKey;
use lf_wire::{read_message, write_message, ExecutionSummary, HealthSummary, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

pub async fn run(engine: Arc<Engine>, shutdown: CancellationToken) -> std::io::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], engine.config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "rpc listener ready");

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted?,
        };
        tracing::debug!(%peer, "rpc connection accepted");
        let engine = engine.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, engine, shutdown).await {
                tracing::debug!(%peer, error = %e, "rpc connection closed");
            }
        });
    }
    Ok(())
}

async fn serve_connection(
    stream: TcpStream,
    engine: Arc<Engine>,
    shutdown: CancellationToken,
) -> Result<(), lf_wire::ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();
    loop {
        let request: Option<Request> = tokio::select! {
            _ = shutdown.cancelled() => break,
            request = read_message(&mut reader) => request?,
        };
        let Some(request) = request else { break };
        let name = request.name();
        let response = dispatch(&engine, request).await;
        if response.is_error() {
            tracing::debug!(request = name, "request failed");
        }
        write_message(&mut writer, &response).await?;
    }
    Ok(())
}

fn history_error(e: HistoryError) -> Response {
    let code = match &e {
        HistoryError::Validation(_) => "INVALID_ARGUMENT",
        HistoryError::NotFound(_) => "NOT_FOUND",
        HistoryError::StaleDecisionTask(_) => "STALE_DECISION_TASK",
        HistoryError::UnknownNode(_) => "INVALID_ARGUMENT",
        HistoryError::Store(e) if e.is_retryable() => "UNAVAILABLE",
        HistoryError::Store(_) => "FAILED_PRECONDITION",
        HistoryError::Matching(_) => "RESOURCE_EXHAUSTED",
        HistoryError::Timer(_) => "UNAVAILABLE",
    };
    Response::error(code, e.to_string())
}

async fn dispatch(engine: &Engine, request: Request) -> Response {
    let history: &HistoryService<SystemClock> = &engine.history;
    match request {
        Request::StartWorkflow { envelope } => match history.start_workflow(*envelope).await {
            Ok(exec) => Response::Started { exec },
            Err(e) => history_error(e),
        },
        Request::GetHistory { exec, from_event_id } => {
            match history.get_history(&exec, from_event_id) {
                Ok(events) => Response::History { events },
                Err(e) => history_error(e),
            }
        }
        Request::DescribeExecution { exec } => match history.describe(&exec) {
            Ok(state) => Response::Describe { state },
            Err(e) => history_error(e),
        },
        Request::ListExecutions { namespace, status } => {
            let executions = engine
                .store
                .list(&namespace, status)
                .into_iter()
                .map(|row| ExecutionSummary {
                    exec: row.exec,
                    job_id: row.job_id,
                    status: row.status,
                    created_at_ms: row.created_at_ms,
                    finished_at_ms: row.finished_at_ms,
                    last_event_id: row.last_event_id,
                })
                .collect();
            Response::Executions { executions }
        }
        Request::SignalWorkflow { exec, name, payload } => {
            match history.signal_workflow(&exec, &name, payload).await {
                Ok(()) => Response::Ok,
                Err(e) => history_error(e),
            }
        }
        Request::CancelWorkflow { exec, reason } => {
            match history.cancel_workflow(&exec, reason).await {
                Ok(applied) => Response::Applied { applied },
                Err(e) => history_error(e),
            }
        }
        Request::RecordDecisionTaskCompleted { task, commands } => {
            match history.record_decision_task_completed(&task, commands).await {
                Ok(()) => Response::Ok,
                Err(e) => history_error(e),
            }
        }
        Request::RecordActivityTaskCompleted {
            exec,
            scheduled_event_id,
            output,
            metadata,
            attempts,
            fixtures,
        } => {
            match history
                .record_activity_task_completed(
                    &exec,
                    scheduled_event_id,
                    output,
                    metadata,
                    attempts,
                    fixtures,
                )
                .await
            {
                Ok(applied) => Response::Applied { applied },
                Err(e) => history_error(e),
            }
        }
        Request::RecordActivityTaskFailed { exec, scheduled_event_id, error, attempts } => {
            match history
                .record_activity_task_failed(&exec, scheduled_event_id, error, attempts)
                .await
            {
                Ok(applied) => Response::Applied { applied },
                Err(e) => history_error(e),
            }
        }
        Request::PollTask { namespace, task_queue, identity, timeout_ms } => {
            // Cap the long poll so one request cannot pin a connection
            let timeout = Duration::from_millis(timeout_ms.min(60_000));
            match engine.matching.poll_task(&namespace, &task_queue, &identity, timeout).await {
                Ok(task) => Response::Task { task },
                Err(e) => Response::error("INVALID_ARGUMENT", e.to_string()),
            }
        }
        Request::CompleteTask { token } => match engine.matching.complete_task(&token) {
            Ok(applied) => Response::Applied { applied },
            Err(e) => Response::error("INVALID_TOKEN", e.to_string()),
        },
        Request::FailTask { token, error, requeue_delay_ms } => {
            match engine.matching.fail_task(
                &token,
                error,
                requeue_delay_ms.map(Duration::from_millis),
            ) {
                Ok(()) => Response::Ok,
                Err(e) => Response::error("INVALID_TOKEN", e.to_string()),
            }
        }
        Request::AddTask { namespace, task_queue, partition, task } => {
            let key = QueueKey { namespace, task_queue, partition };
            match engine.matching.add_task(key, task) {
                Ok(()) => Response::Ok,
                Err(e) => Response::error("RESOURCE_EXHAUSTED", e.to_string()),
            }
        }
        Request::TimerSchedule { key, fire_at_ms } => {
            match engine.timers.schedule(key, fire_at_ms) {
                Ok(()) => Response::Ok,
                Err(e) => Response::error("UNAVAILABLE", e.to_string()),
            }
        }
        Request::TimerCancel { exec, timer_id } => {
            match engine.timers.cancel(&exec, &timer_id) {
                Ok(applied) => Response::Applied { applied },
                Err(e) => Response::error("UNAVAILABLE", e.to_string()),
            }
        }
        Request::Health => {
            let running = engine
                .store
                .list(&engine.config.namespace, Some(ExecutionStatus::Running))
                .len();
            tracing::debug!(running, "health probe");
            Response::Health {
                health: HealthSummary {
                    healthy: true,
                    shard_count: engine.store.shard_count(),
                    pending_timers: engine.timers.pending(),
                    workflow_queue_depth: engine
                        .matching
                        .depth(&engine.config.namespace, WORKFLOW_TASK_QUEUE),
                    activity_queue_depth: engine
                        .matching
                        .depth(&engine.config.namespace, &engine.config.task_queue),
                    uptime_ms: engine.started_at.elapsed().as_millis() as u64,
                },
            }
        }
    }
}
