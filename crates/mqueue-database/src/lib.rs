//! SQLite persistence layer for the mqueue delivery queue.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Versioned schema migrations
//! - The queued record model
//! - Query helpers for the queue lifecycle (insert, scan, mark, sweep)
//!
//! # Architecture
//!
//! The `AsyncDatabase` uses a single dedicated thread for all SQLite
//! operations. Queries are sent through a channel and executed in FIFO order,
//! which gives the queue its internal consistency: every insert, mark and
//! sweep is applied atomically and in arrival order.
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let pending = db.call(|conn| queries::list_unprocessed(conn)).await?;
//! ```
//!
//! **Important**: Only SQL operations should run inside `db.call()`.
//! JSON encoding and network calls must happen outside.

mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::*;
