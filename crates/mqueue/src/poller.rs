//! Timer-driven dispatch of unprocessed records.
//!
//! ## Double-dispatch guard
//!
//! Each tick snapshots the in-flight set *before* querying the store and
//! claims only records absent from both the snapshot and the live set. A
//! worker that finishes between the query and the claim has already marked
//! its record processed, but the query result may still list it as pending;
//! the snapshot still contains its id, so it is skipped. Ticks are serialized
//! so one tick's snapshot can never predate another tick's release.

use crate::worker::{self, WorkerContext};
use crate::InFlightTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, Instrument};

pub(crate) struct Dispatcher {
    ctx: Arc<WorkerContext>,
    tracker: Arc<InFlightTracker>,
    limiter: Option<Arc<Semaphore>>,
    poll_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        ctx: Arc<WorkerContext>,
        tracker: Arc<InFlightTracker>,
        max_concurrent: Option<usize>,
    ) -> Self {
        Self {
            ctx,
            tracker,
            limiter: max_concurrent.map(|n| Arc::new(Semaphore::new(n))),
            poll_lock: Mutex::new(()),
        }
    }

    /// Run one tick. Returns the number of workers launched.
    pub async fn poll_once(&self) -> usize {
        let _tick = self.poll_lock.lock().await;

        let snapshot = self.tracker.snapshot();
        let records = match self.ctx.store.find_unprocessed().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed polling queue store");
                return 0;
            }
        };

        let mut launches = Vec::new();
        {
            let mut claims = self.tracker.claims();
            for record in records {
                if snapshot.contains(&record.id) || claims.contains(record.id) {
                    continue;
                }

                let permit = match &self.limiter {
                    Some(limiter) => match Arc::clone(limiter).try_acquire_owned() {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            debug!("Delivery concurrency limit reached, deferring remaining records");
                            break;
                        }
                    },
                    None => None,
                };

                if let Some(guard) = claims.claim(record.id) {
                    launches.push((record, guard, permit));
                }
            }
        }

        let launched = launches.len();
        for (record, guard, permit) in launches {
            let span = info_span!(
                "mqueue_delivery",
                mq_id = record.id,
                source = %record.source,
                channel = %record.channel,
            );
            tokio::spawn(worker::deliver(Arc::clone(&self.ctx), record, guard, permit).instrument(span));
        }

        if launched > 0 {
            debug!(launched, "Dispatched queued records");
        }
        launched
    }

    /// Tick every `poll_interval` until the run is cancelled. The first tick
    /// fires one interval after start.
    pub async fn run(self: Arc<Self>, poll_interval: Duration) {
        let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = self.ctx.shutdown.clone();

        info!(interval_ms = poll_interval.as_millis() as u64, "Queue poller started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
        info!("Queue poller stopped");
    }
}
