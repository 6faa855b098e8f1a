// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The decider: replay event history, compute the frontier, emit commands.
//!
//! Pure and deterministic: no wall clock, no randomness, no I/O. The same
//! history bytes always produce the same commands, which is what lets the
//! history service restart a round on a storage conflict.

use lf_core::{
    Command, CompletionStatus, EventAttrs, HistoryEvent, NodeError, OnError, WorkflowGraph,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecideError {
    #[error("history does not begin with execution:started")]
    MissingStart,

    #[error("history references unknown node: {0}")]
    UnknownNode(String),
}

#[derive(Debug, Clone, PartialEq)]
enum NodeState {
    Unscheduled,
    /// Scheduled or started, outcome pending.
    Scheduled,
    /// Finished; for delay nodes this means the durable timer fired too.
    Completed { output: Value },
    /// Completed with `timer_requested`; the workflow resumes on fire.
    WaitingTimer { resume_at_ms: u64, completed_at_ms: u64 },
    Failed { error: NodeError, on_error: OnError },
    Skipped,
}

impl NodeState {
    /// States that count toward "everything is settled".
    fn is_settled(&self) -> bool {
        matches!(
            self,
            NodeState::Completed { .. }
                | NodeState::Skipped
                | NodeState::Failed { on_error: OnError::Continue, .. }
        )
    }
}

/// Timer id for a delay node's durable timer.
fn delay_timer_id(node_id: &str) -> String {
    format!("delay:{node_id}")
}

/// Compute the next batch of commands for one execution.
pub fn decide(history: &[HistoryEvent]) -> Result<Vec<Command>, DecideError> {
    let Some(first) = history.first() else {
        return Err(DecideError::MissingStart);
    };
    let EventAttrs::ExecutionStarted { envelope } = &first.attrs else {
        return Err(DecideError::MissingStart);
    };
    let graph = &envelope.workflow;
    let trigger_data = &envelope.trigger_data;

    let mut states = replay(graph, history)?;
    apply_skips(graph, &mut states);

    // A failure with onError=stop ends the workflow immediately.
    for node in &graph.nodes {
        if let Some(NodeState::Failed { on_error: OnError::Stop, .. }) = states.get(node.id.as_str())
        {
            return Ok(vec![Command::FailWorkflowExecution {
                message: format!("node '{}' failed", node.id),
            }]);
        }
    }

    let mut commands = Vec::new();

    // Delay nodes that asked for a durable timer get it started once.
    let started_timers: HashSet<&str> = history
        .iter()
        .filter_map(|e| match &e.attrs {
            EventAttrs::TimerStarted { timer_id, .. } => Some(timer_id.as_str()),
            _ => None,
        })
        .collect();
    for node in &graph.nodes {
        if let Some(NodeState::WaitingTimer { resume_at_ms, completed_at_ms }) =
            states.get(node.id.as_str())
        {
            let timer_id = delay_timer_id(&node.id);
            if !started_timers.contains(timer_id.as_str()) {
                commands.push(Command::StartTimer {
                    timer_id,
                    delay_ms: resume_at_ms.saturating_sub(*completed_at_ms),
                    node_id: Some(node.id.clone()),
                });
            }
        }
    }

    // Frontier: unscheduled nodes whose incoming edges are all satisfied.
    for node in &graph.nodes {
        if states.get(node.id.as_str()) != Some(&NodeState::Unscheduled) {
            continue;
        }

        let incoming: Vec<_> = graph.incoming(&node.id).collect();
        let input = if incoming.is_empty() {
            trigger_data.clone()
        } else {
            let mut live_outputs: Vec<(&str, &Value)> = Vec::new();
            let mut ready = true;
            for edge in &incoming {
                match states.get(edge.source.as_str()) {
                    Some(NodeState::Completed { output }) => {
                        live_outputs.push((edge.source.as_str(), output));
                    }
                    _ => {
                        ready = false;
                        break;
                    }
                }
            }
            if !ready {
                continue;
            }
            match live_outputs.as_slice() {
                [(_, output)] => (*output).clone(),
                many => {
                    // Deterministic by source node id ordering.
                    let mut sorted: Vec<_> = many.to_vec();
                    sorted.sort_by_key(|(id, _)| *id);
                    let mut map = Map::new();
                    for (id, output) in sorted {
                        map.insert(id.to_string(), output.clone());
                    }
                    Value::Object(map)
                }
            }
        };

        commands.push(Command::ScheduleActivityTask {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            input,
        });
    }

    if commands.is_empty() {
        let all_settled =
            graph.nodes.iter().all(|n| states.get(n.id.as_str()).is_some_and(NodeState::is_settled));
        if all_settled {
            let any_failed = graph
                .nodes
                .iter()
                .any(|n| matches!(states.get(n.id.as_str()), Some(NodeState::Failed { .. })));
            let status = if any_failed {
                CompletionStatus::PartialFailure
            } else {
                CompletionStatus::Completed
            };
            commands.push(Command::CompleteWorkflowExecution { status });
        }
        // Otherwise: progress arrives later via NodeCompleted/TimerFired.
    }

    Ok(commands)
}

/// Replay history into a per-node state map.
fn replay<'a>(
    graph: &'a WorkflowGraph,
    history: &[HistoryEvent],
) -> Result<HashMap<&'a str, NodeState>, DecideError> {
    let mut states: HashMap<&str, NodeState> =
        graph.nodes.iter().map(|n| (n.id.as_str(), NodeState::Unscheduled)).collect();
    // scheduled_event_id → node_id, for outcome backlinks
    let mut scheduled: HashMap<i64, &str> = HashMap::new();
    // timer_id → node_id, for delay resumption
    let mut timers: HashMap<&str, &str> = HashMap::new();

    fn resolve<'g>(
        states: &HashMap<&'g str, NodeState>,
        id: &str,
    ) -> Result<&'g str, DecideError> {
        states
            .get_key_value(id)
            .map(|(k, _)| *k)
            .ok_or_else(|| DecideError::UnknownNode(id.to_string()))
    }

    for event in history {
        match &event.attrs {
            EventAttrs::NodeScheduled { node_id, .. } => {
                let key = resolve(&states, node_id)?;
                scheduled.insert(event.event_id, key);
                states.insert(key, NodeState::Scheduled);
            }
            EventAttrs::NodeCompleted { scheduled_event_id, output, metadata, .. } => {
                let Some(key) = scheduled.get(scheduled_event_id).copied() else { continue };
                if metadata.timer_requested {
                    states.insert(
                        key,
                        NodeState::WaitingTimer {
                            resume_at_ms: metadata.resume_at_ms.unwrap_or(event.event_time_ms),
                            completed_at_ms: event.event_time_ms,
                        },
                    );
                } else {
                    states.insert(key, NodeState::Completed { output: output.clone() });
                }
            }
            EventAttrs::NodeFailed { scheduled_event_id, error, .. } => {
                let Some(key) = scheduled.get(scheduled_event_id).copied() else { continue };
                let on_error = graph.node(key).map(|n| n.on_error).unwrap_or_default();
                states.insert(key, NodeState::Failed { error: error.clone(), on_error });
            }
            EventAttrs::NodeTimedOut { scheduled_event_id, message, .. } => {
                let Some(key) = scheduled.get(scheduled_event_id).copied() else { continue };
                let on_error = graph.node(key).map(|n| n.on_error).unwrap_or_default();
                states.insert(
                    key,
                    NodeState::Failed {
                        error: NodeError::timeout("NODE_TIMEOUT", message.clone()),
                        on_error,
                    },
                );
            }
            EventAttrs::TimerStarted { timer_id, node_id: Some(node_id), .. } => {
                if let Ok(key) = resolve(&states, node_id) {
                    timers.insert(timer_id.as_str(), key);
                }
            }
            EventAttrs::TimerFired { timer_id, .. } => {
                if let Some(key) = timers.get(timer_id.as_str()).copied() {
                    if matches!(states.get(key), Some(NodeState::WaitingTimer { .. })) {
                        states.insert(key, NodeState::Completed { output: Value::Null });
                    }
                }
            }
            // Signals, decision markers, terminal events, and bare timers
            // do not change node state.
            _ => {}
        }
    }

    Ok(states)
}

/// Mark skip closures: dead conditional edges and continue-failures prune
/// their downstream subtrees.
fn apply_skips(graph: &WorkflowGraph, states: &mut HashMap<&str, NodeState>) {
    let mut roots: VecDeque<&str> = VecDeque::new();

    for edge in &graph.edges {
        match states.get(edge.source.as_str()) {
            Some(NodeState::Completed { output }) => {
                if let Some(handle) = &edge.source_handle {
                    let live = output.get("output").and_then(|v| v.as_str()) == Some(handle);
                    if !live {
                        roots.push_back(edge.target.as_str());
                    }
                }
            }
            Some(NodeState::Failed { on_error: OnError::Continue, .. })
            | Some(NodeState::Skipped) => {
                roots.push_back(edge.target.as_str());
            }
            _ => {}
        }
    }

    // Downstream closure of every skip root
    let mut visited: HashSet<&str> = HashSet::new();
    while let Some(id) = roots.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(state) = states.get_mut(id) {
            if *state == NodeState::Unscheduled {
                *state = NodeState::Skipped;
            }
        }
        for edge in graph.outgoing(id) {
            roots.push_back(edge.target.as_str());
        }
    }
}

#[cfg(test)]
#[path = "decider_tests.rs"]
mod tests;
