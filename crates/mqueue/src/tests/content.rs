//! Enqueue paths and payload shapes.

use super::harness::{SentPayload, TestHarness, CHANNEL, SOURCE};
use crate::{ChannelId, Embed, MqueueError, QueueStore};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn text_enqueue_stores_only_text() {
    let h = TestHarness::new();
    let id = h.queue.try_enqueue_text(SOURCE, "42", CHANNEL, "hi").await.unwrap();

    let record = h.store.get(id).unwrap();
    assert_eq!(record.message_str, "hi");
    assert!(record.message_embed.is_empty());
    assert_eq!(record.source, SOURCE);
    assert_eq!(record.source_id, "42");
    assert_eq!(record.channel, CHANNEL);
    assert!(!record.processed);
}

#[tokio::test(start_paused = true)]
async fn embed_enqueue_stores_only_embed_and_sends_it() {
    let h = TestHarness::new();
    let embed = Embed {
        color: Some(0x00FF00),
        ..Embed::new("Build finished", "All green")
    }
    .with_field("Duration", "42s", true);

    let id = h
        .queue
        .try_enqueue_embed(SOURCE, "9", "555", &embed)
        .await
        .unwrap();

    let record = h.store.get(id).unwrap();
    assert!(record.message_str.is_empty());
    let stored: Embed = serde_json::from_str(&record.message_embed).unwrap();
    assert_eq!(stored, embed);

    h.queue.start().unwrap();
    assert!(h.wait_processed(id, Duration::from_secs(5)).await);

    let attempts = h.delivery.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].channel, ChannelId(555));
    assert_eq!(attempts[0].payload, SentPayload::Embed(embed));
    h.queue.stop().await;
}

#[tokio::test(start_paused = true)]
async fn fire_and_forget_enqueue_swallows_store_errors() {
    let h = TestHarness::new();
    h.store.set_unavailable(true);

    h.queue.enqueue_text(SOURCE, "1", CHANNEL, "lost").await;
    h.queue
        .enqueue_embed(SOURCE, "2", CHANNEL, &Embed::new("lost", "too"))
        .await;

    let err = h
        .queue
        .try_enqueue_text(SOURCE, "3", CHANNEL, "lost")
        .await
        .unwrap_err();
    assert!(matches!(err, MqueueError::StoreUnavailable(_)));

    h.store.set_unavailable(false);
    assert!(h.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn ids_increase_with_each_insert() {
    let h = TestHarness::new();
    let mut last = 0;
    for i in 0..5 {
        let id = h.enqueue(&i.to_string(), "x").await;
        assert!(id > last);
        last = id;
    }
    assert_eq!(h.store.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn fire_and_forget_enqueue_is_delivered() {
    let h = TestHarness::new();
    h.queue.enqueue_text(SOURCE, "42", CHANNEL, "hello").await;
    h.queue.start().unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.delivery.attempts_for("hello"), 1);
    assert_eq!(h.store.stats().await.unwrap().processed, 1);
    h.queue.stop().await;
}
