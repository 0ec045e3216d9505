//! Producer name to permanent-failure callback.

use crate::DeliveryError;
use mqueue_database::QueuedRecord;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Receives records the delivery API permanently rejected.
pub trait FailureHandler: Send + Sync {
    fn handle_delivery_failure(&self, record: &QueuedRecord, error: &DeliveryError);
}

impl<F> FailureHandler for F
where
    F: Fn(&QueuedRecord, &DeliveryError) + Send + Sync,
{
    fn handle_delivery_failure(&self, record: &QueuedRecord, error: &DeliveryError) {
        self(record, error)
    }
}

#[derive(Clone, Default)]
pub struct SourceRegistry {
    handlers: HashMap<String, Arc<dyn FailureHandler>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the handler for `source`.
    pub fn register(&mut self, source: impl Into<String>, handler: Arc<dyn FailureHandler>) {
        self.handlers.insert(source.into(), handler);
    }

    pub fn contains(&self, source: &str) -> bool {
        self.handlers.contains_key(source)
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Hand a permanent failure to the owning source. Returns whether a
    /// handler was found.
    pub fn report(&self, record: &QueuedRecord, error: &DeliveryError) -> bool {
        match self.handlers.get(&record.source) {
            Some(handler) => {
                handler.handle_delivery_failure(record, error);
                true
            }
            None => {
                debug!(mq_id = record.id, source = %record.source, "No failure handler registered");
                false
            }
        }
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<_> = self.sources().collect();
        sources.sort_unstable();
        f.debug_struct("SourceRegistry").field("sources", &sources).finish()
    }
}
