//! Reliable outbound message delivery queue.
//!
//! This crate provides:
//! - MessageQueue: engine owning the store, delivery client, source registry
//!   and in-flight tracker, with start/stop lifecycle and bounded drain
//! - QueueStore: persistence contract, with SQLite and in-memory backends
//! - DeliveryApi: delivery seam, with a reqwest-based DiscordSender
//!
//! ## Delivery semantics
//!
//! Records are persisted before anything is sent. Each unprocessed record is
//! dispatched to exactly one worker at a time. Transient failures (network,
//! timeouts, 5xx, rate limiting) are retried indefinitely at a fixed interval;
//! permanent rejections are reported once to the owning source and the record
//! is marked processed. Delivery is at-least-once: a crash between a
//! successful send and the processed mark re-sends after restart.

mod config;
mod delivery;
mod discord;
mod embed;
mod engine;
mod error;
mod janitor;
mod poller;
mod registry;
mod store;
mod tracker;
mod worker;

#[cfg(test)]
mod tests;

pub use config::EngineConfig;
pub use delivery::{ChannelId, DeliveryApi, DeliveryError, FailureKind};
pub use discord::{DiscordConfig, DiscordSender};
pub use embed::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedMedia};
pub use engine::{DrainReport, EngineState, MessageQueue};
pub use error::{DataError, MqueueError, MqueueResult};
pub use registry::{FailureHandler, SourceRegistry};
pub use store::{MemoryQueueStore, QueueStore, SqliteQueueStore};
pub use tracker::{ClaimScope, InFlightGuard, InFlightTracker};

pub use mqueue_database::{NewQueuedRecord, QueueStats, QueuedRecord};
