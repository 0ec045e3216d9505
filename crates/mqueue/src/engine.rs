//! The message queue engine and its lifecycle.

use crate::poller::Dispatcher;
use crate::worker::WorkerContext;
use crate::{
    janitor, DeliveryApi, Embed, EngineConfig, FailureHandler, InFlightTracker, MqueueError,
    MqueueResult, QueueStore, SourceRegistry,
};
use mqueue_database::{NewQueuedRecord, QueueStats};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Stopped,
    Running,
    Draining,
}

/// Result of [`MessageQueue::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Whether every in-flight delivery finished before the bound.
    pub drained: bool,
    /// In-flight deliveries still running when `stop` returned.
    pub remaining: usize,
    pub waited: Duration,
}

struct RunHandles {
    shutdown: CancellationToken,
    poller: JoinHandle<()>,
    janitor: JoinHandle<()>,
}

enum Lifecycle {
    Stopped,
    Running(RunHandles),
    Draining,
}

/// Durable outbound message queue.
///
/// Producers call [`enqueue_text`](Self::enqueue_text) /
/// [`enqueue_embed`](Self::enqueue_embed); once [`start`](Self::start)ed, a
/// poller dispatches every unprocessed record to its own delivery worker,
/// which retries transient failures at a fixed interval and hands permanent
/// failures to the source's registered [`FailureHandler`]. A janitor deletes
/// processed records periodically.
///
/// ```ignore
/// let mut queue = MessageQueue::new(store, Arc::new(sender), EngineConfig::default());
/// queue.register_source("reminders", Arc::new(|record: &QueuedRecord, err: &DeliveryError| {
///     warn!(source_id = %record.source_id, error = %err, "reminder undeliverable");
/// }))?;
/// queue.start()?;
/// queue.enqueue_text("reminders", "42", "123", "hi").await;
/// let report = queue.stop().await;
/// ```
pub struct MessageQueue {
    store: Arc<dyn QueueStore>,
    delivery: Arc<dyn DeliveryApi>,
    config: EngineConfig,
    registry: SourceRegistry,
    tracker: Arc<InFlightTracker>,
    lifecycle: Mutex<Lifecycle>,
}

impl MessageQueue {
    pub fn new(
        store: Arc<dyn QueueStore>,
        delivery: Arc<dyn DeliveryApi>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            delivery,
            config,
            registry: SourceRegistry::new(),
            tracker: InFlightTracker::new(),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    /// Register the permanent-failure handler for a producer.
    ///
    /// Rejected with [`MqueueError::AlreadyStarted`] unless the engine is
    /// stopped.
    pub fn register_source(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn FailureHandler>,
    ) -> MqueueResult<()> {
        if !matches!(*self.lifecycle.get_mut(), Lifecycle::Stopped) {
            return Err(MqueueError::AlreadyStarted);
        }
        let name = name.into();
        debug!(source = %name, "Registered queue source");
        self.registry.register(name, handler);
        Ok(())
    }

    /// Queue a plain-text message. Failures are logged, never returned.
    pub async fn enqueue_text(&self, source: &str, source_id: &str, channel: &str, text: &str) {
        if let Err(e) = self.try_enqueue_text(source, source_id, channel, text).await {
            error!(source, source_id, error = %e, "Failed adding queued message");
        }
    }

    /// Queue an embed. Failures are logged, never returned.
    pub async fn enqueue_embed(&self, source: &str, source_id: &str, channel: &str, embed: &Embed) {
        if let Err(e) = self.try_enqueue_embed(source, source_id, channel, embed).await {
            error!(source, source_id, error = %e, "Failed adding queued embed");
        }
    }

    /// Queue a plain-text message and return its id.
    pub async fn try_enqueue_text(
        &self,
        source: &str,
        source_id: &str,
        channel: &str,
        text: &str,
    ) -> MqueueResult<i64> {
        let id = self
            .store
            .insert(NewQueuedRecord::text(source, source_id, channel, text))
            .await?;
        debug!(mq_id = id, source, channel, "Queued message");
        Ok(id)
    }

    /// Queue an embed and return its id. The embed is serialized here.
    pub async fn try_enqueue_embed(
        &self,
        source: &str,
        source_id: &str,
        channel: &str,
        embed: &Embed,
    ) -> MqueueResult<i64> {
        let encoded = serde_json::to_string(embed)?;
        let id = self
            .store
            .insert(NewQueuedRecord::embed(source, source_id, channel, encoded))
            .await?;
        debug!(mq_id = id, source, channel, "Queued embed");
        Ok(id)
    }

    /// Start the poller and janitor on the current tokio runtime.
    ///
    /// Fails with [`MqueueError::AlreadyStarted`] while running or draining,
    /// and with [`MqueueError::InvalidConfig`] when an interval is zero.
    /// A stopped engine may be started again.
    pub fn start(&self) -> MqueueResult<()> {
        self.config.validate()?;
        let mut lifecycle = self.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Stopped) {
            return Err(MqueueError::AlreadyStarted);
        }

        let shutdown = CancellationToken::new();
        let ctx = Arc::new(WorkerContext {
            store: Arc::clone(&self.store),
            delivery: Arc::clone(&self.delivery),
            registry: Arc::new(self.registry.clone()),
            retry_interval: self.config.retry_interval,
            shutdown: shutdown.clone(),
        });
        let dispatcher = Arc::new(Dispatcher::new(
            ctx,
            Arc::clone(&self.tracker),
            self.config.max_concurrent_deliveries,
        ));

        let poller = tokio::spawn(dispatcher.run(self.config.poll_interval));
        let janitor = tokio::spawn(janitor::run(
            Arc::clone(&self.store),
            self.config.janitor_interval,
            shutdown.clone(),
        ));

        *lifecycle = Lifecycle::Running(RunHandles {
            shutdown,
            poller,
            janitor,
        });
        info!(
            sources = self.registry.sources().count(),
            max_concurrent = ?self.config.max_concurrent_deliveries,
            "Message queue started"
        );
        Ok(())
    }

    /// Stop polling and wait up to `drain_timeout` for in-flight deliveries.
    pub async fn stop(&self) -> DrainReport {
        self.stop_with_timeout(self.config.drain_timeout).await
    }

    /// [`stop`](Self::stop) with an explicit drain bound.
    ///
    /// Workers in transient retry give up at their next retry pause and leave
    /// the record unprocessed for the next run. A no-op when not running.
    pub async fn stop_with_timeout(&self, drain_timeout: Duration) -> DrainReport {
        let handles = {
            let mut lifecycle = self.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Draining) {
                Lifecycle::Running(handles) => handles,
                previous => {
                    *lifecycle = previous;
                    return DrainReport {
                        drained: self.tracker.is_empty(),
                        remaining: self.tracker.len(),
                        waited: Duration::ZERO,
                    };
                }
            }
        };

        info!("Stopping message queue");
        handles.shutdown.cancel();
        for (task, handle) in [("poller", handles.poller), ("janitor", handles.janitor)] {
            if let Err(e) = handle.await {
                error!(task, error = %e, "Queue task ended abnormally");
            }
        }

        let started = Instant::now();
        let check_interval = self.config.drain_check_interval;
        loop {
            let remaining = self.tracker.len();
            let waited = started.elapsed();
            if remaining == 0 || waited >= drain_timeout {
                break;
            }
            info!(remaining, "Waiting for in-flight deliveries");
            tokio::time::sleep(check_interval.min(drain_timeout - waited)).await;
        }

        let remaining = self.tracker.len();
        let report = DrainReport {
            drained: remaining == 0,
            remaining,
            waited: started.elapsed(),
        };
        if report.drained {
            info!(waited_ms = report.waited.as_millis() as u64, "Message queue stopped");
        } else {
            warn!(remaining, "Message queue stopped with deliveries still in flight");
        }

        *self.lifecycle.lock() = Lifecycle::Stopped;
        report
    }

    pub fn state(&self) -> EngineState {
        match *self.lifecycle.lock() {
            Lifecycle::Stopped => EngineState::Stopped,
            Lifecycle::Running(_) => EngineState::Running,
            Lifecycle::Draining => EngineState::Draining,
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.tracker.len()
    }

    /// Run one janitor pass now.
    pub async fn sweep_processed(&self) -> MqueueResult<usize> {
        let deleted = self.store.delete_processed().await?;
        info!(deleted, "Swept processed queue records");
        Ok(deleted)
    }

    pub async fn stats(&self) -> MqueueResult<QueueStats> {
        self.store.stats().await
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        if let Lifecycle::Running(handles) = self.lifecycle.get_mut() {
            handles.shutdown.cancel();
        }
    }
}
