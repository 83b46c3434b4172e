//! Buffered transactions.
//!
//! A transaction stages writes locally and applies nothing until
//! `commit`. Observers therefore never see in-progress state: the
//! store publishes exactly one change batch per committed transaction.
//!
//! Staged writes consolidate: updating a staged insert rewrites it,
//! deleting a staged insert cancels it, and re-updating a record keeps
//! only the last values.

use crate::store::Store;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use vista_core::{next_record_id, Error, Record, RecordId, Result, Value};

/// Transaction state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting staged writes.
    Active,
    /// Applied to the store.
    Committed,
    /// Discarded.
    RolledBack,
}

/// Writes staged against one collection.
#[derive(Debug, Default)]
pub(crate) struct StagedDelta {
    pub(crate) added: BTreeMap<RecordId, Record>,
    pub(crate) modified: BTreeMap<RecordId, Vec<Value>>,
    pub(crate) deleted: BTreeSet<RecordId>,
}

impl StagedDelta {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// A buffered store transaction.
pub struct Transaction {
    state: TransactionState,
    staged: BTreeMap<String, StagedDelta>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::begin()
    }
}

impl Transaction {
    /// Starts an empty transaction.
    pub fn begin() -> Self {
        Self {
            state: TransactionState::Active,
            staged: BTreeMap::new(),
        }
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns true if the transaction is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::invalid_spec("transaction is not active"));
        }
        Ok(())
    }

    /// Stages an insert. Returns the identity the record will have once
    /// committed.
    pub fn insert(
        &mut self,
        store: &Store,
        collection: &str,
        values: Vec<Value>,
    ) -> Result<RecordId> {
        self.check_active()?;
        store.check_values(collection, &values)?;

        let id = next_record_id();
        self.delta(collection).added.insert(id, Record::new(id, values));
        Ok(id)
    }

    /// Stages a full-record update.
    pub fn update(
        &mut self,
        store: &Store,
        collection: &str,
        id: RecordId,
        values: Vec<Value>,
    ) -> Result<()> {
        self.check_active()?;
        store.check_values(collection, &values)?;

        let delta = self.delta(collection);
        if delta.deleted.contains(&id) {
            return Err(Error::record_not_found(collection, id));
        }
        if let Some(staged) = delta.added.get_mut(&id) {
            *staged = Record::new(id, values);
            return Ok(());
        }
        if !store.contains(collection, id)? {
            return Err(Error::record_not_found(collection, id));
        }
        self.delta(collection).modified.insert(id, values);
        Ok(())
    }

    /// Stages a delete.
    pub fn delete(&mut self, store: &Store, collection: &str, id: RecordId) -> Result<()> {
        self.check_active()?;

        let delta = self.delta(collection);
        if delta.added.remove(&id).is_some() {
            // Insert staged in this transaction: the delete cancels it.
            return Ok(());
        }
        if delta.deleted.contains(&id) || !store.contains(collection, id)? {
            return Err(Error::record_not_found(collection, id));
        }
        let delta = self.delta(collection);
        delta.modified.remove(&id);
        delta.deleted.insert(id);
        Ok(())
    }

    /// Applies the staged writes to the store and publishes the change
    /// batch. Returns the commit sequence number.
    pub fn commit(mut self, store: &Store) -> Result<u64> {
        self.check_active()?;
        self.staged.retain(|_, delta| !delta.is_empty());
        let staged = core::mem::take(&mut self.staged);
        self.state = TransactionState::Committed;
        store.apply(staged)
    }

    /// Discards the staged writes.
    pub fn rollback(mut self) {
        self.state = TransactionState::RolledBack;
        self.staged.clear();
    }

    fn delta(&mut self, collection: &str) -> &mut StagedDelta {
        self.staged.entry(String::from(collection)).or_default()
    }
}
