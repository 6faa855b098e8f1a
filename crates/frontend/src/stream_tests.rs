// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::test_support::{exec_id, execution_started, history, linear_graph, node_scheduled};
use lf_core::FakeClock;
use std::time::Duration;

fn stream(clock: FakeClock) -> LiveStream<FakeClock> {
    LiveStream::new(clock, None, 60_000)
}

#[tokio::test]
async fn subscribers_receive_published_events() {
    let stream = stream(FakeClock::new());
    let mut rx = stream.subscribe("default/wf-test/run-test");

    let events = history(vec![
        execution_started(linear_graph()),
        node_scheduled("t", "trigger_manual"),
    ]);
    for event in &events {
        stream.event_appended(&exec_id("wf-test"), event).await;
    }

    let first = rx.recv().await.unwrap();
    assert_eq!(first.event, "execution:started");
    let second = rx.recv().await.unwrap();
    assert_eq!(second.event, "node:scheduled");
    assert_eq!(second.node_key.as_deref(), Some("t"));
}

#[tokio::test]
async fn quiescent_channels_are_pruned() {
    let clock = FakeClock::new();
    let stream = stream(clock.clone());

    let events = history(vec![execution_started(linear_graph())]);
    stream.event_appended(&exec_id("wf-test"), &events[0]).await;
    assert_eq!(stream.channel_count(), 1);

    // Still fresh
    assert_eq!(stream.prune(), 0);

    clock.advance(Duration::from_secs(61));
    assert_eq!(stream.prune(), 1);
    assert_eq!(stream.channel_count(), 0);
}

#[tokio::test]
async fn channels_with_subscribers_survive_quiescence() {
    let clock = FakeClock::new();
    let stream = stream(clock.clone());
    let _rx = stream.subscribe("default/wf-test/run-test");

    clock.advance(Duration::from_secs(120));
    assert_eq!(stream.prune(), 0);
    assert_eq!(stream.channel_count(), 1);
}
