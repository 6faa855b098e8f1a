// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition executor: evaluates a rule against the node input and emits
//! `{matched, output}`. The `output` field drives conditional edges via
//! `source_handle`.

use crate::executor::{ExecContext, ExecRequest, ExecResponse, NodeExecutor};
use async_trait::async_trait;
use lf_core::NodeError;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ConditionConfig {
    field: String,
    #[serde(default = "default_operator")]
    operator: Operator,
    #[serde(default)]
    value: Value,
    #[serde(default = "default_true_output")]
    true_output: String,
    #[serde(default = "default_false_output")]
    false_output: String,
}

fn default_operator() -> Operator {
    Operator::Equals
}

fn default_true_output() -> String {
    "yes".to_string()
}

fn default_false_output() -> String {
    "no".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    Exists,
}

pub struct ConditionExecutor;

#[async_trait]
impl NodeExecutor for ConditionExecutor {
    fn node_type(&self) -> &'static str {
        "condition"
    }

    async fn execute(&self, _ctx: &ExecContext, req: ExecRequest) -> ExecResponse {
        let config: ConditionConfig = match serde_json::from_value(req.config.clone()) {
            Ok(c) => c,
            Err(e) => {
                return ExecResponse::failed(NodeError::non_retryable(
                    "INVALID_CONFIG",
                    format!("condition config: {e}"),
                ));
            }
        };

        let actual = lookup_path(&req.input, &config.field);
        let matched = evaluate(config.operator, actual, &config.value);
        let output = if matched { config.true_output } else { config.false_output };
        ExecResponse::ok(json!({ "matched": matched, "output": output }))
    }
}

/// Resolve a dotted path (`user.plan.tier`) inside a JSON value.
fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
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

fn evaluate(operator: Operator, actual: Option<&Value>, expected: &Value) -> bool {
    match operator {
        Operator::Exists => actual.is_some(),
        Operator::Equals => actual == Some(expected),
        Operator::NotEquals => actual != Some(expected),
        Operator::GreaterThan => compare(actual, expected).is_some_and(|o| o.is_gt()),
        Operator::LessThan => compare(actual, expected).is_some_and(|o| o.is_lt()),
        Operator::Contains => match (actual, expected) {
            (Some(Value::String(s)), Value::String(needle)) => s.contains(needle),
            (Some(Value::Array(items)), needle) => items.contains(needle),
            _ => false,
        },
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<std::cmp::Ordering> {
    let a = actual?.as_f64()?;
    let b = expected.as_f64()?;
    a.partial_cmp(&b)
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
