// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor registry: `node_type → executor`, populated once at startup.

use crate::condition::ConditionExecutor;
use crate::delay::DelayExecutor;
use crate::executor::NodeExecutor;
use crate::http::{HttpConfig, HttpExecutor};
use crate::transform::TransformExecutor;
use crate::trigger::TriggerExecutor;
use lf_core::SystemClock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("executor already registered for node type: {0}")]
    Duplicate(String),

    #[error("alias target not registered: {0}")]
    UnknownAliasTarget(String),

    #[error("default registry already installed")]
    AlreadyInstalled,

    #[error("http client init failed: {0}")]
    HttpInit(String),
}

/// Map from node type to executor. Registration is single-writer at
/// startup; afterwards the registry is shared read-only.
#[derive(Default)]
pub struct ExecutorRegistry {
    map: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: Arc<dyn NodeExecutor>) -> Result<(), RegistryError> {
        let node_type = executor.node_type().to_string();
        if self.map.contains_key(&node_type) {
            return Err(RegistryError::Duplicate(node_type));
        }
        tracing::debug!(node_type, "executor registered");
        self.map.insert(node_type, executor);
        Ok(())
    }

    /// Register `alias` as another name for an existing node type.
    pub fn alias(&mut self, alias: &str, node_type: &str) -> Result<(), RegistryError> {
        if self.map.contains_key(alias) {
            return Err(RegistryError::Duplicate(alias.to_string()));
        }
        let target = self
            .map
            .get(node_type)
            .ok_or_else(|| RegistryError::UnknownAliasTarget(node_type.to_string()))?
            .clone();
        self.map.insert(alias.to_string(), target);
        Ok(())
    }

    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.map.get(node_type).cloned()
    }

    pub fn node_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.map.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The built-in executor set with the standard aliases.
pub fn builtin_registry(http: HttpConfig) -> Result<ExecutorRegistry, RegistryError> {
    let mut registry = ExecutorRegistry::new();
    registry.register(Arc::new(TriggerExecutor))?;
    registry.register(Arc::new(HttpExecutor::new(http)?))?;
    registry.register(Arc::new(ConditionExecutor))?;
    registry.register(Arc::new(DelayExecutor::new(SystemClock)))?;
    registry.register(Arc::new(TransformExecutor))?;
    registry.alias("logic_condition", "condition")?;
    registry.alias("trigger_webhook", "trigger_manual")?;
    Ok(registry)
}

static DEFAULT_REGISTRY: OnceLock<Arc<ExecutorRegistry>> = OnceLock::new();

/// Install the process-wide registry. Called exactly once at startup,
/// before any worker starts; immutable afterwards.
pub fn install_default_registry(registry: Arc<ExecutorRegistry>) -> Result<(), RegistryError> {
    DEFAULT_REGISTRY.set(registry).map_err(|_| RegistryError::AlreadyInstalled)
}

pub fn default_registry() -> Option<Arc<ExecutorRegistry>> {
    DEFAULT_REGISTRY.get().cloned()
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
