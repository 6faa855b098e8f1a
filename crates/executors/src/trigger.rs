// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger executor: entry-point nodes pass their trigger payload through
//! unchanged. `trigger_webhook` aliases onto the same executor.

use crate::executor::{ExecContext, ExecRequest, ExecResponse, NodeExecutor};
use async_trait::async_trait;

pub struct TriggerExecutor;

#[async_trait]
impl NodeExecutor for TriggerExecutor {
    fn node_type(&self) -> &'static str {
        "trigger_manual"
    }

    async fn execute(&self, _ctx: &ExecContext, req: ExecRequest) -> ExecResponse {
        ExecResponse::ok(req.input)
    }
}
