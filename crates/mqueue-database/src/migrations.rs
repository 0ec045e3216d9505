//! Database migrations.
//!
//! Migrations are run in order and tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        debug!(current_version, "Schema up to date");
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_mqueue(conn)?;
    }
    if current_version < 2 {
        migrate_v2_created_at(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: the queue table. An absent content variant is stored as ''.
fn migrate_v1_mqueue(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: mqueue table");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS mqueue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            source_id TEXT NOT NULL,
            message_str TEXT NOT NULL,
            message_embed TEXT NOT NULL,
            channel TEXT NOT NULL,
            processed INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_mqueue_processed
            ON mqueue(processed);
        ",
    )?;

    record_migration(conn, 1, "mqueue")?;
    Ok(())
}

/// V2: insertion timestamp for operators inspecting the backlog.
fn migrate_v2_created_at(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v2: created_at");

    conn.execute_batch(
        "
        ALTER TABLE mqueue ADD COLUMN created_at TEXT NOT NULL DEFAULT '';
        ",
    )?;

    record_migration(conn, 2, "created_at")?;
    Ok(())
}
