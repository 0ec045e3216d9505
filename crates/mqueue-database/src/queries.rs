//! Standalone query functions for the `mqueue` table.
//!
//! Each function takes a `&Connection` as its first parameter so it can run
//! inside [`AsyncDatabase::call`](crate::AsyncDatabase::call) or directly on a
//! connection in tests.

use crate::{DatabaseResult, NewQueuedRecord, QueueStats, QueuedRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::debug;

const RECORD_COLUMNS: &str =
    "id, source, source_id, channel, message_str, message_embed, processed, created_at";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<QueuedRecord> {
    Ok(QueuedRecord {
        id: row.get(0)?,
        source: row.get(1)?,
        source_id: row.get(2)?,
        channel: row.get(3)?,
        message_str: row.get(4)?,
        message_embed: row.get(5)?,
        processed: row.get(6)?,
        created_at: parse_datetime(row.get::<_, String>(7)?),
    })
}

/// Insert a new unprocessed record, returning its id.
pub fn insert_record(conn: &Connection, record: &NewQueuedRecord) -> DatabaseResult<i64> {
    conn.execute(
        "INSERT INTO mqueue (source, source_id, message_str, message_embed, channel, processed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![
            record.source(),
            record.source_id(),
            record.message_str(),
            record.message_embed(),
            record.channel(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, source = record.source(), "Inserted queued record");
    Ok(id)
}

/// Get a record by id.
pub fn get_record(conn: &Connection, id: i64) -> DatabaseResult<Option<QueuedRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM mqueue WHERE id = ?1"))?;

    match stmt.query_row(params![id], record_from_row) {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All unprocessed records, oldest first.
pub fn list_unprocessed(conn: &Connection) -> DatabaseResult<Vec<QueuedRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM mqueue WHERE processed = 0 ORDER BY id ASC"
    ))?;

    let records = stmt
        .query_map([], record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Mark a record processed. Idempotent; returns whether a row matched.
pub fn mark_processed(conn: &Connection, id: i64) -> DatabaseResult<bool> {
    let rows = conn.execute("UPDATE mqueue SET processed = 1 WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Delete every processed record, returning how many were removed.
pub fn delete_processed(conn: &Connection) -> DatabaseResult<usize> {
    let rows = conn.execute("DELETE FROM mqueue WHERE processed = 1", [])?;
    Ok(rows)
}

/// Count records by processing state.
pub fn queue_stats(conn: &Connection) -> DatabaseResult<QueueStats> {
    let (pending, processed): (i64, i64) = conn.query_row(
        "SELECT
             COALESCE(SUM(CASE WHEN processed = 0 THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN processed = 1 THEN 1 ELSE 0 END), 0)
         FROM mqueue",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(QueueStats {
        pending: pending as u64,
        processed: processed as u64,
    })
}

/// Parse an RFC3339 datetime string, falling back to current time on error.
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let conn = setup();

        let first = insert_record(&conn, &NewQueuedRecord::text("reminders", "1", "123", "a")).unwrap();
        let second = insert_record(&conn, &NewQueuedRecord::text("reminders", "2", "123", "b")).unwrap();

        assert!(second > first);
    }

    #[test]
    fn inserted_record_round_trips_fields() {
        let conn = setup();
        let id = insert_record(
            &conn,
            &NewQueuedRecord::embed("feeds", "entry-9", "555", "{\"title\":\"t\"}".to_string()),
        )
        .unwrap();

        let record = get_record(&conn, id).unwrap().unwrap();
        assert_eq!(record.source, "feeds");
        assert_eq!(record.source_id, "entry-9");
        assert_eq!(record.channel, "555");
        assert_eq!(record.message_str, "");
        assert_eq!(record.message_embed, "{\"title\":\"t\"}");
        assert!(!record.processed);
    }

    #[test]
    fn get_missing_record_returns_none() {
        let conn = setup();
        assert!(get_record(&conn, 404).unwrap().is_none());
    }

    #[test]
    fn list_unprocessed_skips_processed_rows() {
        let conn = setup();
        let a = insert_record(&conn, &NewQueuedRecord::text("s", "a", "1", "a")).unwrap();
        let b = insert_record(&conn, &NewQueuedRecord::text("s", "b", "1", "b")).unwrap();
        let c = insert_record(&conn, &NewQueuedRecord::text("s", "c", "1", "c")).unwrap();

        mark_processed(&conn, b).unwrap();

        let ids: Vec<i64> = list_unprocessed(&conn).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn mark_processed_is_idempotent() {
        let conn = setup();
        let id = insert_record(&conn, &NewQueuedRecord::text("s", "a", "1", "a")).unwrap();

        assert!(mark_processed(&conn, id).unwrap());
        assert!(mark_processed(&conn, id).unwrap());
        assert!(get_record(&conn, id).unwrap().unwrap().processed);
    }

    #[test]
    fn mark_processed_unknown_id_matches_nothing() {
        let conn = setup();
        assert!(!mark_processed(&conn, 77).unwrap());
    }

    #[test]
    fn delete_processed_leaves_pending_rows() {
        let conn = setup();
        let keep = insert_record(&conn, &NewQueuedRecord::text("s", "keep", "1", "a")).unwrap();
        let gone1 = insert_record(&conn, &NewQueuedRecord::text("s", "gone1", "1", "b")).unwrap();
        let gone2 = insert_record(&conn, &NewQueuedRecord::text("s", "gone2", "1", "c")).unwrap();
        mark_processed(&conn, gone1).unwrap();
        mark_processed(&conn, gone2).unwrap();

        assert_eq!(delete_processed(&conn).unwrap(), 2);
        assert!(get_record(&conn, keep).unwrap().is_some());
        assert!(get_record(&conn, gone1).unwrap().is_none());
        assert!(get_record(&conn, gone2).unwrap().is_none());
        assert_eq!(delete_processed(&conn).unwrap(), 0);
    }

    #[test]
    fn queue_stats_counts_both_states() {
        let conn = setup();
        assert_eq!(queue_stats(&conn).unwrap(), QueueStats::default());

        let a = insert_record(&conn, &NewQueuedRecord::text("s", "a", "1", "a")).unwrap();
        insert_record(&conn, &NewQueuedRecord::text("s", "b", "1", "b")).unwrap();
        mark_processed(&conn, a).unwrap();

        assert_eq!(
            queue_stats(&conn).unwrap(),
            QueueStats {
                pending: 1,
                processed: 1
            }
        );
    }

    #[test]
    fn created_at_is_recorded() {
        let conn = setup();
        let before = Utc::now();
        let id = insert_record(&conn, &NewQueuedRecord::text("s", "a", "1", "a")).unwrap();

        let record = get_record(&conn, id).unwrap().unwrap();
        assert!(record.created_at >= before - chrono::Duration::seconds(1));
    }
}
