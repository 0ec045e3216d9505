//! Transient failures and the fixed retry interval.

use super::harness::{Reply, SentPayload, TestHarness};
use crate::{ChannelId, DeliveryError, EngineConfig};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn one_server_error_then_success() {
    let h = TestHarness::new();
    h.delivery.queue_reply(Reply::status(503));

    let id = h.enqueue("42", "hi").await;
    let started = Instant::now();
    h.queue.start().unwrap();

    assert!(h.wait_processed(id, Duration::from_secs(10)).await);

    let attempts = h.delivery.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].at - started, Duration::from_secs(1));
    assert_eq!(attempts[1].at - attempts[0].at, Duration::from_secs(1));
    for attempt in &attempts {
        assert_eq!(attempt.channel, ChannelId(123));
        assert_eq!(attempt.payload, SentPayload::Text("hi".to_string()));
    }
    assert_eq!(h.failures.count(), 0);

    // Later ticks leave it alone.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.delivery.attempt_count(), 2);
    h.queue.stop().await;
}

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_without_limit() {
    let h = TestHarness::new();
    for _ in 0..200 {
        h.delivery.queue_reply(Reply::Fail(DeliveryError::Network("connection reset".into())));
    }

    let id = h.enqueue("42", "persistent").await;
    h.queue.start().unwrap();

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert!(!h.is_processed(id));
    assert_eq!(h.queue.in_flight_count(), 1);
    assert_eq!(h.failures.count(), 0);

    assert!(h.wait_processed(id, Duration::from_secs(200)).await);
    assert_eq!(h.delivery.attempts_for("persistent"), 201);
    assert_eq!(h.failures.count(), 0);

    // Fixed interval, no backoff.
    let attempts = h.delivery.attempts();
    for pair in attempts.windows(2) {
        assert_eq!(pair[1].at - pair[0].at, Duration::from_secs(1));
    }
    h.queue.stop().await;
}

#[tokio::test(start_paused = true)]
async fn every_transient_kind_is_retried() {
    let h = TestHarness::new();
    h.delivery.queue_reply(Reply::Fail(DeliveryError::Timeout));
    h.delivery.queue_reply(Reply::Fail(DeliveryError::RateLimited));
    h.delivery.queue_reply(Reply::status(500));
    h.delivery.queue_reply(Reply::status(429));
    h.delivery.queue_reply(Reply::Fail(DeliveryError::InvalidResponse("eof".into())));

    let id = h.enqueue("42", "bumpy").await;
    h.queue.start().unwrap();

    assert!(h.wait_processed(id, Duration::from_secs(30)).await);
    assert_eq!(h.delivery.attempt_count(), 6);
    assert_eq!(h.failures.count(), 0);
    h.queue.stop().await;
}

#[tokio::test(start_paused = true)]
async fn retry_interval_is_configurable() {
    let h = TestHarness::with_config(EngineConfig {
        retry_interval: Duration::from_millis(250),
        ..EngineConfig::default()
    });
    h.delivery.queue_reply(Reply::status(502));
    h.delivery.queue_reply(Reply::status(502));

    let id = h.enqueue("42", "quick").await;
    h.queue.start().unwrap();
    assert!(h.wait_processed(id, Duration::from_secs(5)).await);

    let attempts = h.delivery.attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[1].at - attempts[0].at, Duration::from_millis(250));
    assert_eq!(attempts[2].at - attempts[1].at, Duration::from_millis(250));
    h.queue.stop().await;
}

#[tokio::test(start_paused = true)]
async fn one_failing_record_does_not_block_others() {
    let h = TestHarness::new();
    for _ in 0..30 {
        h.delivery.queue_reply_for("stuck", Reply::status(503));
    }
    let stuck = h.enqueue("1", "stuck").await;
    let ok = h.enqueue("2", "fine").await;
    h.queue.start().unwrap();

    tokio::time::sleep(Duration::from_millis(5500)).await;
    assert!(h.is_processed(ok));
    assert_eq!(h.delivery.attempts_for("fine"), 1);
    assert!(!h.is_processed(stuck));
    assert_eq!(h.delivery.attempts_for("stuck"), 5);
    h.queue.stop().await;
}
