//! Subcommand implementations.

use crate::config::RunConfig;
use crate::error::{CliError, CliResult};
use mqueue::{
    ChannelId, DeliveryApi, DeliveryError, DiscordSender, DrainReport, Embed, EngineConfig,
    MessageQueue, NewQueuedRecord, QueueStats, QueueStore, QueuedRecord, SqliteQueueStore,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Source name for messages queued from the command line.
pub const CLI_SOURCE: &str = "cli";

pub async fn open_store(path: &Path) -> CliResult<SqliteQueueStore> {
    let store = SqliteQueueStore::open(path).await?;
    info!(path = %path.display(), "Opened queue database");
    Ok(store)
}

fn validate_channel(channel: &str) -> CliResult<()> {
    channel
        .parse::<ChannelId>()
        .map(|_| ())
        .map_err(|_| CliError::InvalidInput(format!("channel must be a numeric id, got {channel:?}")))
}

pub async fn enqueue_text(
    store: &dyn QueueStore,
    source: &str,
    source_id: &str,
    channel: &str,
    text: &str,
) -> CliResult<i64> {
    validate_channel(channel)?;
    if text.is_empty() {
        return Err(CliError::InvalidInput("message text is empty".to_string()));
    }

    let id = store
        .insert(NewQueuedRecord::text(source, source_id, channel, text))
        .await?;
    Ok(id)
}

/// Queue an embed given as JSON. The document is decoded first so only
/// well-formed embeds reach the queue.
pub async fn enqueue_embed(
    store: &dyn QueueStore,
    source: &str,
    source_id: &str,
    channel: &str,
    json: &str,
) -> CliResult<i64> {
    validate_channel(channel)?;
    let embed: Embed = serde_json::from_str(json)?;
    let encoded = serde_json::to_string(&embed)?;

    let id = store
        .insert(NewQueuedRecord::embed(source, source_id, channel, encoded))
        .await?;
    Ok(id)
}

pub async fn sweep(store: &dyn QueueStore) -> CliResult<usize> {
    Ok(store.delete_processed().await?)
}

pub async fn stats(store: &dyn QueueStore) -> CliResult<QueueStats> {
    Ok(store.stats().await?)
}

fn log_rejection(record: &QueuedRecord, error: &DeliveryError) {
    warn!(
        mq_id = record.id,
        source_id = %record.source_id,
        channel = %record.channel,
        error = %error,
        "Message permanently rejected by Discord"
    );
}

/// Run the engine until `shutdown` resolves, then drain.
pub async fn run_until(
    store: Arc<dyn QueueStore>,
    delivery: Arc<dyn DeliveryApi>,
    engine: EngineConfig,
    shutdown: impl Future<Output = ()>,
) -> CliResult<DrainReport> {
    let mut queue = MessageQueue::new(store, delivery, engine);
    queue.register_source(CLI_SOURCE, Arc::new(log_rejection))?;
    queue.start()?;

    shutdown.await;
    info!("Received shutdown signal, draining...");
    Ok(queue.stop().await)
}

/// `mqueue run`: deliver to Discord until Ctrl-C or SIGTERM.
pub async fn run(config: RunConfig) -> CliResult<DrainReport> {
    let store = open_store(&config.db_path).await?;
    let sender = DiscordSender::new(config.discord)?;

    info!(
        poll_ms = config.engine.poll_interval.as_millis() as u64,
        retry_ms = config.engine.retry_interval.as_millis() as u64,
        "Configuration loaded"
    );

    run_until(Arc::new(store), Arc::new(sender), config.engine, shutdown_signal()).await
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
