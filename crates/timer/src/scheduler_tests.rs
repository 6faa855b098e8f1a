// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::test_support::exec_id;

fn timer_key(timer_id: &str) -> TimerKey {
    TimerKey { exec: exec_id("wf-1"), timer_id: timer_id.into(), scheduled_event_id: 5 }
}

#[test]
fn timer_lifecycle() {
    let mut scheduler = Scheduler::new();

    scheduler.schedule(timer_key("d1"), 10_000);
    assert!(scheduler.has_timers());
    assert_eq!(scheduler.next_deadline(), Some(10_000));

    // Timer hasn't fired yet
    assert!(scheduler.due(5_000).is_empty());
    assert!(scheduler.has_timers());

    // Timer fires
    let fired = scheduler.due(10_000);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].timer_id, "d1");
    assert!(!scheduler.has_timers());

    // Fires once
    assert!(scheduler.due(20_000).is_empty());
}

#[test]
fn cancel_prevents_fire() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule(timer_key("d1"), 10_000);
    assert!(scheduler.cancel(&exec_id("wf-1"), "d1"));
    assert!(!scheduler.cancel(&exec_id("wf-1"), "d1"));

    assert!(scheduler.due(20_000).is_empty());
    assert!(!scheduler.has_timers());
}

#[test]
fn reschedule_replaces_earlier_entry() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule(timer_key("d1"), 10_000);
    scheduler.schedule(timer_key("d1"), 30_000);

    // Old deadline is stale
    assert!(scheduler.due(10_000).is_empty());
    assert_eq!(scheduler.len(), 1);

    let fired = scheduler.due(30_000);
    assert_eq!(fired.len(), 1);
}

#[test]
fn due_pops_in_deadline_order() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule(timer_key("late"), 30_000);
    scheduler.schedule(timer_key("early"), 10_000);
    scheduler.schedule(timer_key("mid"), 20_000);

    let fired = scheduler.due(30_000);
    let ids: Vec<&str> = fired.iter().map(|k| k.timer_id.as_str()).collect();
    assert_eq!(ids, vec!["early", "mid", "late"]);
}

#[test]
fn live_entries_skip_stale() {
    let mut scheduler = Scheduler::new();
    scheduler.schedule(timer_key("a"), 10_000);
    scheduler.schedule(timer_key("a"), 15_000);
    scheduler.schedule(timer_key("b"), 20_000);
    scheduler.cancel(&exec_id("wf-1"), "b");

    let live = scheduler.live_entries();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].0.timer_id, "a");
    assert_eq!(live[0].1, 15_000);
}
