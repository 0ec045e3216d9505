//! Set of record ids currently being delivered.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// In-flight record ids.
///
/// An id is inserted only through [`InFlightTracker::claim`] and removed only
/// when the returned [`InFlightGuard`] drops, so an id is present at most once
/// and a panicking worker still frees its slot.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    ids: RwLock<HashSet<i64>>,
}

impl InFlightTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Copy of the current id set.
    pub fn snapshot(&self) -> HashSet<i64> {
        self.ids.read().clone()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.read().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }

    /// Open a claim scope holding the write lock.
    ///
    /// Guards produced by the scope must not be dropped while it is alive.
    pub fn claims(self: &Arc<Self>) -> ClaimScope<'_> {
        ClaimScope {
            tracker: self,
            ids: self.ids.write(),
        }
    }

    /// Claim a single id. `None` when already in flight.
    pub fn claim(self: &Arc<Self>, id: i64) -> Option<InFlightGuard> {
        self.claims().claim(id)
    }
}

/// Write-locked view used by the poller to claim a batch atomically.
pub struct ClaimScope<'a> {
    tracker: &'a Arc<InFlightTracker>,
    ids: parking_lot::RwLockWriteGuard<'a, HashSet<i64>>,
}

impl ClaimScope<'_> {
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn claim(&mut self, id: i64) -> Option<InFlightGuard> {
        if !self.ids.insert(id) {
            return None;
        }
        Some(InFlightGuard {
            tracker: Arc::clone(self.tracker),
            id,
        })
    }
}

/// Releases its id on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
    id: i64,
}

impl InFlightGuard {
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.ids.write().remove(&self.id);
    }
}
