// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::DeterministicContext;
use serde_json::json;

async fn run(config: Value, input: Value) -> ExecResponse {
    TransformExecutor
        .execute(
            &ExecContext::test(),
            ExecRequest {
                node_id: "x1".into(),
                node_type: "transform".into(),
                config,
                input,
                attempt: 1,
                deterministic: DeterministicContext::default(),
            },
        )
        .await
}

#[tokio::test]
async fn projects_and_renames_fields() {
    let response = run(
        json!({"pick": {"name": "user.name", "tier": "user.plan.tier"}}),
        json!({"user": {"name": "ada", "plan": {"tier": "pro"}}}),
    )
    .await;
    assert_eq!(response.output, json!({"name": "ada", "tier": "pro"}));
}

#[tokio::test]
async fn missing_paths_project_null() {
    let response = run(json!({"pick": {"gone": "no.such.path"}}), json!({})).await;
    assert_eq!(response.output, json!({"gone": null}));
}

#[tokio::test]
async fn array_index_paths() {
    let response = run(
        json!({"pick": {"first": "items.0.id"}}),
        json!({"items": [{"id": 9}, {"id": 10}]}),
    )
    .await;
    assert_eq!(response.output, json!({"first": 9}));
}

#[tokio::test]
async fn missing_pick_is_config_error() {
    let response = run(json!({}), json!({})).await;
    assert_eq!(response.error.unwrap().code, "INVALID_CONFIG");
}
