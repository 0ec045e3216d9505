//! start/stop, drain bound and restart.

use super::harness::{FailureLog, Reply, TestHarness};
use crate::{DrainReport, EngineConfig, EngineState, MqueueError};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn double_start_is_rejected() {
    let h = TestHarness::new();
    assert_eq!(h.queue.state(), EngineState::Stopped);

    h.queue.start().unwrap();
    assert!(matches!(h.queue.start(), Err(MqueueError::AlreadyStarted)));
    assert_eq!(h.queue.state(), EngineState::Running);

    h.queue.stop().await;
    assert_eq!(h.queue.state(), EngineState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn zero_poll_interval_refuses_to_start() {
    let h = TestHarness::with_config(EngineConfig {
        poll_interval: Duration::ZERO,
        ..EngineConfig::default()
    });
    let id = h.enqueue("42", "hi").await;

    assert!(matches!(h.queue.start(), Err(MqueueError::InvalidConfig(_))));
    assert_eq!(h.queue.state(), EngineState::Stopped);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(!h.is_processed(id));
    assert_eq!(h.delivery.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn registration_is_closed_while_running() {
    let mut h = TestHarness::new();
    h.queue.start().unwrap();

    let result = h.queue.register_source("feeds", Arc::new(FailureLog::default()));
    assert!(matches!(result, Err(MqueueError::AlreadyStarted)));

    h.queue.stop().await;
    h.queue
        .register_source("feeds", Arc::new(FailureLog::default()))
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_when_stopped_is_a_no_op() {
    let h = TestHarness::new();
    let expected = DrainReport {
        drained: true,
        remaining: 0,
        waited: Duration::ZERO,
    };
    assert_eq!(h.queue.stop().await, expected);
    assert_eq!(h.queue.stop().await, expected);
    assert_eq!(h.queue.state(), EngineState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn drain_is_bounded_when_a_delivery_hangs() {
    let h = TestHarness::new();
    h.delivery.set_default_reply(Reply::Hang);
    let id = h.enqueue("42", "hi").await;

    h.queue.start().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.queue.in_flight_count(), 1);

    let report = h.queue.stop().await;
    assert_eq!(
        report,
        DrainReport {
            drained: false,
            remaining: 1,
            waited: Duration::from_secs(10),
        }
    );
    assert_eq!(h.queue.state(), EngineState::Stopped);
    assert!(!h.is_processed(id));
}

#[tokio::test(start_paused = true)]
async fn stop_with_timeout_overrides_the_bound() {
    let h = TestHarness::new();
    h.delivery.set_default_reply(Reply::Hang);
    h.enqueue("42", "hi").await;

    h.queue.start().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let report = h.queue.stop_with_timeout(Duration::from_secs(3)).await;
    assert!(!report.drained);
    assert_eq!(report.waited, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn draining_state_is_observable_and_blocks_start() {
    let h = TestHarness::new();
    h.delivery.set_default_reply(Reply::Hang);
    h.enqueue("42", "hi").await;

    h.queue.start().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let (report, (state, restart)) = tokio::join!(h.queue.stop(), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (h.queue.state(), h.queue.start())
    });

    assert_eq!(state, EngineState::Draining);
    assert!(matches!(restart, Err(MqueueError::AlreadyStarted)));
    assert!(!report.drained);
    assert_eq!(h.queue.state(), EngineState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_a_finishing_delivery() {
    let h = TestHarness::new();
    h.delivery.set_default_reply(Reply::Slow(Duration::from_millis(2500)));
    let id = h.enqueue("42", "hi").await;

    h.queue.start().unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let report = h.queue.stop().await;
    assert!(report.drained);
    assert_eq!(report.remaining, 0);
    assert!(report.waited >= Duration::from_secs(2));
    assert!(report.waited <= Duration::from_secs(3));
    assert!(h.is_processed(id));
}

#[tokio::test(start_paused = true)]
async fn stop_abandons_retrying_records_and_restart_redelivers() {
    let h = TestHarness::new();
    h.delivery.set_default_reply(Reply::status(503));
    let id = h.enqueue("42", "hi").await;

    h.queue.start().unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(h.delivery.attempt_count(), 3);

    let report = h.queue.stop().await;
    assert!(report.drained);
    assert!(report.waited <= Duration::from_secs(1));
    assert!(!h.is_processed(id));
    assert_eq!(h.failures.count(), 0);

    h.delivery.set_default_reply(Reply::Ok);
    h.queue.start().unwrap();
    assert!(h.wait_processed(id, Duration::from_secs(5)).await);
    assert_eq!(h.delivery.attempt_count(), 4);
    h.queue.stop().await;
}

#[tokio::test(start_paused = true)]
async fn nothing_is_dispatched_after_stop() {
    let h = TestHarness::new();
    h.queue.start().unwrap();
    h.queue.stop().await;

    let id = h.enqueue("42", "late").await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.delivery.attempt_count(), 0);
    assert!(!h.is_processed(id));
}
