// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow graph: typed nodes and directed edges.
//!
//! The graph lives inside the starting event's input and is never stored
//! separately by the engine.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Per-node reaction to terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Fail the whole workflow (default).
    #[default]
    Stop,
    /// Prune the downstream closure and keep going.
    Continue,
}

crate::display_as_str! {
    OnError {
        Stop => "stop",
        Continue => "continue",
    }
}

/// One node of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Connector-specific configuration, passed through to the executor.
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default, rename = "onError")]
    pub on_error: OnError,
}

/// Directed edge. `source_handle` makes the edge conditional: it is live
/// only when the source node's output field `output` equals the handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default, rename = "sourceHandle", skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),
    #[error("edge references unknown node: {0}")]
    UnknownNode(String),
    #[error("graph contains a cycle involving node: {0}")]
    Cycle(String),
    #[error("graph has no nodes")]
    Empty,
}

/// A directed-acyclic workflow graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowGraph {
    /// Validate structural invariants: non-empty, unique node ids, edges
    /// referencing known nodes, and acyclicity.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut ids = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNodeId(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(GraphError::UnknownNode(endpoint.clone()));
                }
            }
        }

        self.check_acyclic()
    }

    /// Kahn's algorithm; any node left with in-degree > 0 is on a cycle.
    fn check_acyclic(&self) -> Result<(), GraphError> {
        let mut in_degree: HashMap<&str, usize> =
            self.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
        for edge in &self.edges {
            if let Some(d) = in_degree.get_mut(edge.target.as_str()) {
                *d += 1;
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut visited = 0usize;
        while let Some(id) = queue.pop_front() {
            visited += 1;
            for edge in self.edges.iter().filter(|e| e.source == id) {
                if let Some(d) = in_degree.get_mut(edge.target.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(edge.target.as_str());
                    }
                }
            }
        }

        if visited == self.nodes.len() {
            Ok(())
        } else {
            let stuck = in_degree
                .iter()
                .find(|(_, d)| **d > 0)
                .map(|(id, _)| (*id).to_string())
                .unwrap_or_default();
            Err(GraphError::Cycle(stuck))
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges arriving at `id`, in graph order.
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Edges leaving `id`, in graph order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Nodes with no incoming edges, in graph order.
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| self.incoming(&n.id).next().is_none())
    }
}

impl Node {
    /// Trigger nodes are entry points; they run on the trigger payload.
    pub fn is_trigger(&self) -> bool {
        self.node_type.starts_with("trigger")
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
