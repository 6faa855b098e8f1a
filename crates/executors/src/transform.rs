// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transform executor: declarative field projection over the node input.
//!
//! Config shape: `{"pick": {"out_name": "in.dotted.path", ...}}`. Missing
//! paths project to null.

use crate::executor::{ExecContext, ExecRequest, ExecResponse, NodeExecutor};
use async_trait::async_trait;
use lf_core::NodeError;
use serde_json::{Map, Value};

pub struct TransformExecutor;

#[async_trait]
impl NodeExecutor for TransformExecutor {
    fn node_type(&self) -> &'static str {
        "transform"
    }

    async fn execute(&self, _ctx: &ExecContext, req: ExecRequest) -> ExecResponse {
        let Some(pick) = req.config.get("pick").and_then(|v| v.as_object()) else {
            return ExecResponse::failed(NodeError::non_retryable(
                "INVALID_CONFIG",
                "transform requires config.pick object",
            ));
        };

        let mut out = Map::new();
        for (out_name, path) in pick {
            let value = match path.as_str() {
                Some(path) => lookup(&req.input, path).cloned().unwrap_or(Value::Null),
                None => Value::Null,
            };
            out.insert(out_name.clone(), value);
        }
        ExecResponse::ok(Value::Object(out))
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
