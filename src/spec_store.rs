//! A thread-safe in-memory holder of the current [`Snapshot`]. [`SpecStore`] provides concurrent
//! access for readers (evaluation) and writers (the background sync).
use std::sync::{Arc, RwLock};

use crate::snapshot::Snapshot;

/// `SpecStore` provides a thread-safe (`Sync`) storage for the current snapshot.
///
/// `Snapshot` itself is immutable and can only be replaced completely. Readers receive an `Arc`
/// to the snapshot that was current when they asked and keep using it for the rest of their
/// evaluation, unaffected by concurrent replacements.
pub struct SpecStore {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl SpecStore {
    /// Create a store holding an empty snapshot.
    pub fn new() -> SpecStore {
        SpecStore::with_snapshot(Snapshot::empty())
    }

    /// Create a store holding `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> SpecStore {
        SpecStore {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Get the currently installed snapshot.
    ///
    /// The read lock is only held for the duration of an `Arc` clone, so this never waits on a
    /// network request.
    pub fn get_snapshot(&self) -> Arc<Snapshot> {
        // A poisoned lock means a writer panicked between taking the lock and assigning an
        // already-built `Arc`, which cannot leave the slot half-updated. Keep serving it.
        let snapshot = self
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&snapshot)
    }

    /// Install a new snapshot, returning the previous one.
    pub fn set_snapshot(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        // Constructing new value before requesting the lock to minimize lock span.
        let new_value = Arc::new(snapshot);

        let mut slot = self
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut slot, new_value)
    }
}

impl Default for SpecStore {
    fn default() -> SpecStore {
        SpecStore::new()
    }
}
