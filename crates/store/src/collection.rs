//! Per-collection record storage.
//!
//! Records are kept in a `BTreeMap` keyed by identity. Identities are
//! allocated monotonically, so map order doubles as insertion order for
//! unordered scans.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use vista_core::schema::Schema;
use vista_core::{Error, Record, RecordId, Result, Value};

/// The records of one collection plus its schema.
#[derive(Clone, Debug)]
pub struct CollectionStore {
    schema: Schema,
    records: BTreeMap<RecordId, Rc<Record>>,
}

impl CollectionStore {
    /// Creates an empty collection for the schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: BTreeMap::new(),
        }
    }

    /// Returns the collection schema.
    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the collection has no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record with the given identity.
    pub fn get(&self, id: RecordId) -> Option<&Rc<Record>> {
        self.records.get(&id)
    }

    /// Returns true if a record with the identity exists.
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    /// Iterates records in identity (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<Record>> {
        self.records.values()
    }

    /// Checks that values fit the schema: arity and field types, with
    /// Null allowed everywhere.
    pub fn check_values(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.schema.len() {
            return Err(Error::schema_mismatch(
                self.schema.collection(),
                "wrong number of fields",
            ));
        }
        for (field, value) in self.schema.fields().iter().zip(values) {
            if let Some(data_type) = value.data_type() {
                if data_type != field.data_type() {
                    return Err(Error::schema_mismatch(
                        self.schema.collection(),
                        field.name(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Inserts a record. The identity must be fresh.
    pub(crate) fn insert(&mut self, record: Record) {
        self.records.insert(record.id(), Rc::new(record));
    }

    /// Replaces a record in place.
    pub(crate) fn replace(&mut self, record: Record) {
        self.records.insert(record.id(), Rc::new(record));
    }

    /// Removes a record by identity.
    pub(crate) fn remove(&mut self, id: RecordId) -> Option<Rc<Record>> {
        self.records.remove(&id)
    }
}
