//! Snapshot cache.
//!
//! Owns a monitor's current snapshot. `replace` swaps in the next
//! snapshot and returns the diff from the previous one; it never
//! notifies anyone, that is the monitor's job.

use crate::diff::ListDiff;
use crate::engine;
use crate::snapshot::Snapshot;

/// Holds the current materialized snapshot of one monitor.
#[derive(Clone, Debug, Default)]
pub struct SnapshotCache {
    current: Snapshot,
}

impl SnapshotCache {
    /// Creates a cache holding an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding an initial snapshot.
    pub fn with_initial(snapshot: Snapshot) -> Self {
        Self { current: snapshot }
    }

    /// Returns the current snapshot. O(1).
    #[inline]
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// Replaces the current snapshot and returns the diff from the
    /// previous one.
    pub fn replace(&mut self, next: Snapshot) -> ListDiff {
        let diff = engine::diff(&self.current, &next);
        self.current = next;
        diff
    }

    /// Discards the current snapshot without producing a diff. Used on
    /// monitor invalidation.
    pub fn reset(&mut self) {
        self.current = Snapshot::empty();
    }
}
