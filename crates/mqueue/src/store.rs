//! Durable persistence for queued records.
//!
//! The store knows nothing about delivery. The engine only needs the four
//! lifecycle operations plus counts for the operational surface.

use crate::{MqueueError, MqueueResult};
use async_trait::async_trait;
use chrono::Utc;
use mqueue_database::{queries, AsyncDatabase, NewQueuedRecord, QueueStats, QueuedRecord};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Persistence contract for the queue.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist an unprocessed record and return its assigned id.
    async fn insert(&self, record: NewQueuedRecord) -> MqueueResult<i64>;

    /// Every record not yet processed, in id order.
    async fn find_unprocessed(&self) -> MqueueResult<Vec<QueuedRecord>>;

    /// Flag a record processed. Idempotent.
    async fn mark_processed(&self, record: &QueuedRecord) -> MqueueResult<()>;

    /// Remove all processed records, returning how many were removed.
    async fn delete_processed(&self) -> MqueueResult<usize>;

    async fn stats(&self) -> MqueueResult<QueueStats>;
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteQueueStore {
    db: AsyncDatabase,
}

impl SqliteQueueStore {
    /// Open (creating if needed) the database file and apply migrations.
    pub async fn open(path: &Path) -> MqueueResult<Self> {
        let db = AsyncDatabase::open(path).await?;
        Ok(Self { db })
    }

    pub async fn open_in_memory() -> MqueueResult<Self> {
        let db = AsyncDatabase::open_in_memory().await?;
        Ok(Self { db })
    }

    pub fn from_database(db: AsyncDatabase) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &AsyncDatabase {
        &self.db
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn insert(&self, record: NewQueuedRecord) -> MqueueResult<i64> {
        let id = self
            .db
            .call(move |conn| queries::insert_record(conn, &record))
            .await?;
        Ok(id)
    }

    async fn find_unprocessed(&self) -> MqueueResult<Vec<QueuedRecord>> {
        Ok(self.db.call(queries::list_unprocessed).await?)
    }

    async fn mark_processed(&self, record: &QueuedRecord) -> MqueueResult<()> {
        let id = record.id;
        let matched = self
            .db
            .call(move |conn| queries::mark_processed(conn, id))
            .await?;
        if !matched {
            debug!(mq_id = id, "mark_processed matched no row");
        }
        Ok(())
    }

    async fn delete_processed(&self) -> MqueueResult<usize> {
        Ok(self.db.call(queries::delete_processed).await?)
    }

    async fn stats(&self) -> MqueueResult<QueueStats> {
        Ok(self.db.call(queries::queue_stats).await?)
    }
}

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<i64, QueuedRecord>,
    next_id: i64,
    unavailable: bool,
}

/// In-process store for tests and embedding.
///
/// [`set_unavailable`](Self::set_unavailable) makes every operation fail with
/// [`MqueueError::StoreUnavailable`] until switched back.
#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<MemoryState>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Current copy of a record, processed or not.
    pub fn get(&self, id: i64) -> Option<QueuedRecord> {
        self.state.lock().records.get(&id).cloned()
    }

    /// Copies of all stored records in id order.
    pub fn records(&self) -> Vec<QueuedRecord> {
        self.state.lock().records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn available(state: &MemoryState) -> MqueueResult<()> {
        if state.unavailable {
            Err(MqueueError::StoreUnavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn insert(&self, record: NewQueuedRecord) -> MqueueResult<i64> {
        let mut state = self.state.lock();
        Self::available(&state)?;

        state.next_id += 1;
        let id = state.next_id;
        state.records.insert(id, record.into_record(id, Utc::now()));
        Ok(id)
    }

    async fn find_unprocessed(&self) -> MqueueResult<Vec<QueuedRecord>> {
        let state = self.state.lock();
        Self::available(&state)?;

        Ok(state
            .records
            .values()
            .filter(|r| !r.processed)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, record: &QueuedRecord) -> MqueueResult<()> {
        let mut state = self.state.lock();
        Self::available(&state)?;

        if let Some(stored) = state.records.get_mut(&record.id) {
            stored.processed = true;
        }
        Ok(())
    }

    async fn delete_processed(&self) -> MqueueResult<usize> {
        let mut state = self.state.lock();
        Self::available(&state)?;

        let before = state.records.len();
        state.records.retain(|_, r| !r.processed);
        Ok(before - state.records.len())
    }

    async fn stats(&self) -> MqueueResult<QueueStats> {
        let state = self.state.lock();
        Self::available(&state)?;

        let processed = state.records.values().filter(|r| r.processed).count() as u64;
        Ok(QueueStats {
            pending: state.records.len() as u64 - processed,
            processed,
        })
    }
}
