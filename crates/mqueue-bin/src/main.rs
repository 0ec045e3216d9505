//! mqueue binary entry point.

use anyhow::Context;
use clap::Parser;
use mqueue_bin::config::resolve_db_path;
use mqueue_bin::{commands, Cli, Command, RunConfig};
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    observability::init_with_config(observability::LogConfig {
        service_name: "mqueue".into(),
        default_level: cli.log_level.clone(),
        log_path: cli.log_file.clone(),
        also_stderr: true,
    })
    .context("failed to initialize logging")?;

    let db_path = resolve_db_path(cli.db)?;

    match cli.command {
        Command::Run {
            token,
            api_base,
            http_timeout_secs,
        } => {
            let config = RunConfig::new(
                db_path,
                token,
                api_base,
                Duration::from_secs(http_timeout_secs),
            )?;
            info!(db = %config.db_path.display(), api_base = %config.discord.api_base, "mqueue starting...");

            let report = commands::run(config).await?;
            if report.drained {
                info!(waited_ms = report.waited.as_millis() as u64, "mqueue stopped cleanly");
            } else {
                warn!(remaining = report.remaining, "mqueue stopped with deliveries in flight");
            }
        }
        Command::EnqueueText { target, text } => {
            let store = commands::open_store(&db_path).await?;
            let id = commands::enqueue_text(
                &store,
                &target.source,
                &target.source_id,
                &target.channel,
                &text,
            )
            .await?;
            println!("{id}");
        }
        Command::EnqueueEmbed { target, json } => {
            let store = commands::open_store(&db_path).await?;
            let id = commands::enqueue_embed(
                &store,
                &target.source,
                &target.source_id,
                &target.channel,
                &json,
            )
            .await?;
            println!("{id}");
        }
        Command::Sweep => {
            let store = commands::open_store(&db_path).await?;
            let deleted = commands::sweep(&store).await?;
            println!("deleted {deleted} processed records");
        }
        Command::Stats { json } => {
            let store = commands::open_store(&db_path).await?;
            let stats = commands::stats(&store).await?;
            if json {
                println!("{}", serde_json::to_string(&stats)?);
            } else {
                println!("pending:   {}", stats.pending);
                println!("processed: {}", stats.processed);
            }
        }
    }

    Ok(())
}
