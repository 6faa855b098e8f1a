// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::http::HttpConfig;

#[test]
fn builtin_registry_covers_standard_node_types() {
    let registry = builtin_registry(HttpConfig::default()).unwrap();
    for node_type in
        ["trigger_manual", "trigger_webhook", "http_request", "condition", "logic_condition", "delay", "transform"]
    {
        assert!(registry.get(node_type).is_some(), "missing executor for {node_type}");
    }
    assert!(registry.get("nope").is_none());
}

#[test]
fn alias_shares_the_executor_instance() {
    let registry = builtin_registry(HttpConfig::default()).unwrap();
    let canonical = registry.get("condition").unwrap();
    let aliased = registry.get("logic_condition").unwrap();
    assert!(Arc::ptr_eq(&canonical, &aliased));
}

#[test]
fn duplicate_registration_rejected() {
    let mut registry = ExecutorRegistry::new();
    registry.register(Arc::new(TriggerExecutor)).unwrap();
    let err = registry.register(Arc::new(TriggerExecutor)).unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("trigger_manual".into()));
}

#[test]
fn alias_to_unknown_target_rejected() {
    let mut registry = ExecutorRegistry::new();
    let err = registry.alias("x", "missing").unwrap_err();
    assert_eq!(err, RegistryError::UnknownAliasTarget("missing".into()));
}
