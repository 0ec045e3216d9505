//! Per-record delivery state machine.

use crate::{
    ChannelId, DataError, DeliveryApi, DeliveryError, Embed, InFlightGuard, QueueStore,
    SourceRegistry,
};
use mqueue_database::QueuedRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything a worker needs, shared by all workers of one run.
pub(crate) struct WorkerContext {
    pub store: Arc<dyn QueueStore>,
    pub delivery: Arc<dyn DeliveryApi>,
    pub registry: Arc<SourceRegistry>,
    pub retry_interval: Duration,
    pub shutdown: CancellationToken,
}

/// How a single record's delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Delivered { attempts: u32 },
    Rejected { attempts: u32, error: DeliveryError },
    Malformed(DataError),
    /// Shutdown arrived during transient retry; the record stays unprocessed.
    Abandoned { attempts: u32 },
}

impl Outcome {
    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Abandoned { .. })
    }
}

enum Payload {
    Text(String),
    Embed(Embed),
}

fn prepare(record: &QueuedRecord) -> Result<(ChannelId, Payload), DataError> {
    // Embed first: a stored embed that fails to decode is malformed even
    // when text is present too.
    let embed = if record.has_embed() {
        let embed: Embed = serde_json::from_str(&record.message_embed)
            .map_err(|e| DataError::EmbedDecode(e.to_string()))?;
        Some(embed)
    } else {
        None
    };

    let channel = record
        .channel
        .parse::<ChannelId>()
        .map_err(|_| DataError::InvalidChannel(record.channel.clone()))?;

    let payload = if record.has_text() {
        Payload::Text(record.message_str.clone())
    } else if let Some(embed) = embed {
        Payload::Embed(embed)
    } else {
        return Err(DataError::EmptyContent);
    };

    Ok((channel, payload))
}

async fn send(ctx: &WorkerContext, channel: ChannelId, payload: &Payload) -> Result<(), DeliveryError> {
    match payload {
        Payload::Text(text) => ctx.delivery.send_text(channel, text).await,
        Payload::Embed(embed) => ctx.delivery.send_embed(channel, embed).await,
    }
}

/// Run the send/retry/escalate loop for one record.
pub(crate) async fn run(ctx: &WorkerContext, record: &QueuedRecord) -> Outcome {
    let (channel, payload) = match prepare(record) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!(error = %e, "Dropping malformed queued record");
            return Outcome::Malformed(e);
        }
    };

    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let err = match send(ctx, channel, &payload).await {
            Ok(()) => return Outcome::Delivered { attempts },
            Err(e) => e,
        };

        if err.is_permanent() {
            warn!(attempt = attempts, error = %err, "Delivery permanently rejected");
            ctx.registry.report(record, &err);
            return Outcome::Rejected { attempts, error: err };
        }

        warn!(attempt = attempts, error = %err, "Delivery failed, retrying");
        tokio::select! {
            biased;
            _ = ctx.shutdown.cancelled() => return Outcome::Abandoned { attempts },
            _ = tokio::time::sleep(ctx.retry_interval) => {}
        }
    }
}

/// Deliver one claimed record, persist a terminal outcome, release the claim.
///
/// The tracker slot and the concurrency permit are released when this
/// future completes or is dropped.
pub(crate) async fn deliver(
    ctx: Arc<WorkerContext>,
    record: QueuedRecord,
    guard: InFlightGuard,
    permit: Option<OwnedSemaphorePermit>,
) -> Outcome {
    let outcome = run(&ctx, &record).await;

    match &outcome {
        Outcome::Delivered { attempts } => {
            info!(attempts, "Delivered queued message");
        }
        Outcome::Abandoned { attempts } => {
            info!(attempts, "Shutting down, leaving record for the next run");
        }
        Outcome::Rejected { .. } | Outcome::Malformed(_) => {}
    }

    if outcome.is_terminal() {
        if let Err(e) = ctx.store.mark_processed(&record).await {
            error!(error = %e, "Failed marking queued record processed");
        }
    }

    debug!(mq_id = guard.id(), "Releasing in-flight slot");
    drop(guard);
    drop(permit);
    outcome
}
