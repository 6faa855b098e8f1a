// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP inspection surface: health plus execution lookup.

use crate::error::FrontendError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use lf_core::{Clock, ExecutionId, ExecutionState, HistoryEvent, RunId};
use lf_history::HistoryService;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct HttpState<C: Clock> {
    pub history: Arc<HistoryService<C>>,
    pub started_at: Instant,
}

pub fn router<C: Clock + 'static>(state: Arc<HttpState<C>>) -> Router {
    Router::new()
        .route("/healthz", get(healthz::<C>))
        .route("/api/v1/executions/:namespace/:workflow_id/:run_id", get(describe::<C>))
        .route("/api/v1/executions/:namespace/:workflow_id/:run_id/history", get(get_history::<C>))
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), FrontendError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http surface listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn healthz<C: Clock>(
    State(state): State<Arc<HttpState<C>>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime_ms": state.started_at.elapsed().as_millis() as u64,
    }))
}

fn exec_from_path(namespace: String, workflow_id: String, run_id: String) -> ExecutionId {
    ExecutionId::new(namespace, workflow_id, RunId::from_string(run_id))
}

async fn describe<C: Clock>(
    State(state): State<Arc<HttpState<C>>>,
    Path((namespace, workflow_id, run_id)): Path<(String, String, String)>,
) -> Result<Json<ExecutionState>, StatusCode> {
    let exec = exec_from_path(namespace, workflow_id, run_id);
    state
        .history
        .describe(&exec)
        .map(Json)
        .map_err(|_| StatusCode::NOT_FOUND)
}

async fn get_history<C: Clock>(
    State(state): State<Arc<HttpState<C>>>,
    Path((namespace, workflow_id, run_id)): Path<(String, String, String)>,
) -> Result<Json<Vec<HistoryEvent>>, StatusCode> {
    let exec = exec_from_path(namespace, workflow_id, run_id);
    state
        .history
        .get_history(&exec, 0)
        .map(Json)
        .map_err(|_| StatusCode::NOT_FOUND)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
