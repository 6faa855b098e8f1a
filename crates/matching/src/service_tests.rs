// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lf_core::test_support::exec_id;
use lf_core::{DecisionTask, FakeClock};

fn decision(task: &str) -> TaskPayload {
    TaskPayload::Decision(DecisionTask {
        task_id: TaskId::from_string(task),
        exec: exec_id("wf-1"),
        scheduled_event_id: 2,
        attempt: 1,
    })
}

fn key(partition: u32) -> QueueKey {
    QueueKey { namespace: "default".into(), task_queue: "workflow".into(), partition }
}

fn service(clock: FakeClock) -> MatchingService<FakeClock> {
    MatchingService::new(MatchingConfig::default().partitions(2), clock)
}

async fn must_poll(svc: &MatchingService<FakeClock>) -> DeliveredTask {
    svc.poll_task("default", "workflow", "test-worker", Duration::from_millis(50))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn fifo_within_partition() {
    let svc = service(FakeClock::new());
    svc.add_task(key(0), decision("tsk-a")).unwrap();
    svc.add_task(key(0), decision("tsk-b")).unwrap();

    assert_eq!(must_poll(&svc).await.task.task_id(), TaskId::from_string("tsk-a"));
    assert_eq!(must_poll(&svc).await.task.task_id(), TaskId::from_string("tsk-b"));
}

#[tokio::test]
async fn empty_poll_times_out() {
    let svc = service(FakeClock::new());
    let got = svc
        .poll_task("default", "workflow", "test-worker", Duration::from_millis(10))
        .await
        .unwrap();
    assert!(got.is_none());
}

#[tokio::test]
async fn bounded_queue_rejects_producers() {
    let clock = FakeClock::new();
    let svc = MatchingService::new(
        MatchingConfig::default().partitions(1).queue_capacity(1),
        clock,
    );
    svc.add_task(key(0), decision("tsk-a")).unwrap();
    let err = svc.add_task(key(0), decision("tsk-b")).unwrap_err();
    assert!(matches!(err, MatchingError::ResourceExhausted { .. }));
}

#[tokio::test]
async fn complete_is_idempotent_on_token() {
    let svc = service(FakeClock::new());
    svc.add_task(key(0), decision("tsk-a")).unwrap();
    let delivered = must_poll(&svc).await;

    assert!(svc.complete_task(&delivered.token).unwrap());
    assert!(!svc.complete_task(&delivered.token).unwrap());
}

#[tokio::test]
async fn fail_requeues_then_dead_letters() {
    let clock = FakeClock::new();
    let svc = MatchingService::new(
        MatchingConfig::default().partitions(1).max_redeliveries(2),
        clock,
    );
    svc.add_task(key(0), decision("tsk-a")).unwrap();

    // First delivery fails, requeues immediately
    let first = must_poll(&svc).await;
    assert_eq!(first.delivery, 1);
    svc.fail_task(&first.token, Some("boom".into()), None).unwrap();

    // Second delivery exhausts the budget
    let second = must_poll(&svc).await;
    assert_eq!(second.delivery, 2);
    svc.fail_task(&second.token, Some("boom again".into()), None).unwrap();

    assert_eq!(svc.depth("default", "workflow"), 0);
    let dead = svc.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].deliveries, 2);
    assert_eq!(dead[0].reason.as_deref(), Some("boom again"));
}

#[tokio::test]
async fn delayed_requeue_waits_for_reclaim() {
    let clock = FakeClock::new();
    let svc = service(clock.clone());
    svc.add_task(key(0), decision("tsk-a")).unwrap();

    let delivered = must_poll(&svc).await;
    svc.fail_task(&delivered.token, None, Some(Duration::from_secs(5))).unwrap();

    // Not yet due
    assert_eq!(svc.reclaim(), 0);
    assert_eq!(svc.depth("default", "workflow"), 0);

    clock.advance(Duration::from_secs(6));
    assert_eq!(svc.reclaim(), 1);
    assert_eq!(svc.depth("default", "workflow"), 1);
}

#[tokio::test]
async fn reclaim_redelivers_expired_reservations() {
    let clock = FakeClock::new();
    let svc = service(clock.clone());
    svc.add_task(key(0), decision("tsk-a")).unwrap();

    let first = must_poll(&svc).await;
    assert_eq!(first.delivery, 1);

    // Worker vanished; visibility timeout lapses
    clock.advance(Duration::from_millis(31_000));
    assert_eq!(svc.reclaim(), 1);

    let second = must_poll(&svc).await;
    assert_eq!(second.delivery, 2);
    // Old token was invalidated by the reclaim
    assert!(!svc.complete_task(&first.token).unwrap());
    assert!(svc.complete_task(&second.token).unwrap());
}

#[tokio::test]
async fn long_poll_wakes_on_add() {
    let clock = FakeClock::new();
    let svc = std::sync::Arc::new(service(clock));

    let poller = {
        let svc = svc.clone();
        tokio::spawn(async move {
            svc.poll_task("default", "workflow", "test-worker", Duration::from_secs(5))
                .await
                .unwrap()
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    svc.add_task(key(1), decision("tsk-a")).unwrap();

    let got = poller.await.unwrap();
    assert!(got.is_some());
}
