//! Change batches emitted by the store.
//!
//! One `ChangeBatch` is emitted per committed transaction, in commit
//! order, never interleaved. Batches are transient: subscribers consume
//! them immediately and the store keeps no history.

use alloc::string::String;
use alloc::vec::Vec;
use vista_core::RecordId;

/// An updated record together with the indices of the fields whose
/// values actually changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatedRecord {
    pub id: RecordId,
    pub changed_fields: Vec<usize>,
}

/// The changes one transaction made to one collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionDelta {
    pub collection: String,
    pub inserted: Vec<RecordId>,
    pub updated: Vec<UpdatedRecord>,
    pub deleted: Vec<RecordId>,
}

impl CollectionDelta {
    /// Returns true if the delta carries no changes.
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Returns the total number of changed records.
    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }
}

/// Everything one committed transaction changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    /// Commit sequence number; strictly increasing per store.
    pub sequence: u64,
    /// Per-collection deltas, in collection name order.
    pub collections: Vec<CollectionDelta>,
}

impl ChangeBatch {
    /// Returns the delta for one collection, if the transaction touched
    /// it.
    pub fn delta_for(&self, collection: &str) -> Option<&CollectionDelta> {
        self.collections.iter().find(|d| d.collection == collection)
    }

    /// Returns true if the batch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.collections.iter().all(|d| d.is_empty())
    }
}

/// An event on the store's subscription feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// A transaction committed.
    Committed(ChangeBatch),
    /// A collection's configuration changed incompatibly; monitors on
    /// it must tear down.
    Invalidated { collection: String },
}
