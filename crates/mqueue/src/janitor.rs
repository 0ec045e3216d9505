//! Periodic removal of processed records.

use crate::QueueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Delete processed records once. Errors are logged and reported as zero.
pub(crate) async fn sweep(store: &dyn QueueStore) -> usize {
    match store.delete_processed().await {
        Ok(deleted) => {
            info!(deleted, "Swept processed queue records");
            deleted
        }
        Err(e) => {
            error!(error = %e, "Failed sweeping processed queue records");
            0
        }
    }
}

pub(crate) async fn run(
    store: Arc<dyn QueueStore>,
    janitor_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + janitor_interval, janitor_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                sweep(store.as_ref()).await;
            }
        }
    }
}
